use {
    anyhow::{Error, anyhow, bail, ensure},
    arguments::Arguments,
    bitcoin::hashes::Hash,
    blocks::BlockChange,
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    clap::Parser,
    derive_more::Display,
    error::fetch_error,
    gbt::{Coinbase, DecodeError, Template},
    lru::LruCache,
    options::Options,
    parking_lot::{Condvar, Mutex, RwLock, RwLockWriteGuard},
    rand::RngCore,
    reqwest::blocking::{Client, Response},
    serde::Serialize,
    serde_json::Value,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    settings::Settings,
    snafu::Snafu,
    std::{
        collections::{BTreeMap, VecDeque},
        env,
        fmt::{self, Debug, Display, Formatter},
        io, mem,
        num::NonZeroUsize,
        ops::RangeInclusive,
        process,
        str::FromStr,
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        },
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
    tokio::runtime::{Handle, Runtime},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt},
};

pub use {
    algorithm::{Algorithm, AlgorithmKind, MidstateCompute},
    blocks::BlockTracker,
    config::Config,
    connections::{Connection, Connections, spawn_reaper},
    context::{ClientContext, Totals, TotalsSnapshot},
    error::{FetchError, TransportError},
    intensity::IntensityMode,
    longpoll::{LongpollExit, run_longpoll, select_longpoll_pool, spawn_longpoll},
    pool::{Pool, PoolId, PoolStatus, Pools},
    pool_url::{PoolUrl, Proxy, ProxyKind},
    stage::Stage,
    stats::PoolStats,
    submit::{SubmitOutcome, spawn_submit, submit_body, submit_upstream_work, submit_work},
    transport::{HeaderInfo, NetTime, RpcCall, RpcResponse, json_rpc_call},
    upstream::{
        convert_to_work, gen_gbt_work, get_upstream_work, pool_active, update_gbt, work_decode,
    },
    work::{GetworkMode, Work},
};

pub mod algorithm;
mod arguments;
mod blocks;
mod config;
mod connections;
mod context;
mod error;
mod intensity;
mod logs;
mod longpoll;
mod options;
mod pool;
mod pool_url;
pub mod settings;
mod signal;
mod stage;
mod stats;
pub mod submit;
mod subcommand;
mod transport;
pub mod upstream;
mod work;

pub const USER_AGENT: &str = concat!("poolwork/", env!("CARGO_PKG_VERSION"));

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let guard = logs::init();

    let args = Arguments::parse();

    let runtime = Runtime::new().expect("Failed to create tokio runtime");

    let cancel = signal::setup_signal_handler(runtime.handle());

    let code = match args.run(cancel) {
        Err(err) => {
            eprintln!("error: {err}");

            for (i, cause) in err.chain().skip(1).enumerate() {
                if i == 0 {
                    eprintln!();
                    eprintln!("because:");
                }
                eprintln!("- {cause}");
            }

            if env::var_os("RUST_BACKTRACE")
                .map(|val| val == "1")
                .unwrap_or_default()
            {
                eprintln!();
                eprintln!("{}", err.backtrace());
            }

            1
        }
        Ok(()) => 0,
    };

    drop(guard);

    process::exit(code);
}
