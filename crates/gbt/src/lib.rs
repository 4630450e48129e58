use {
    bitcoin::{
        VarInt, consensus,
        hashes::{Hash, sha256d},
    },
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    serde_json::{Map, Value, json},
    snafu::{ResultExt, Snafu},
};

pub use {
    block::serialize_block,
    coinbase::{Coinbase, NONCE2_SIZE},
    endian::{flip32, flip80, flip128, flip168, flip180, swab256, swap256},
    error::{DecodeError, Result},
    getwork::{GetworkJob, decode_getwork},
    hex_field::{bin_to_hex, hex_to_bin},
    merkle::merkle_root,
    request::{
        GBT_CAPABILITIES, gbt_request, getwork_request, getwork_submit_request,
        submitblock_request,
    },
    template::Template,
};

mod block;
mod coinbase;
mod endian;
mod error;
mod getwork;
mod hex_field;
mod merkle;
mod request;
mod template;

/// Double SHA-256, the hash primitive used by the default algorithm.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// Rounds `len` up to the next multiple of four.
pub fn align_len(len: usize) -> usize {
    len.div_ceil(4) * 4
}
