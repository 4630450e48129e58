use {
    super::*,
    bitcoin::hashes::{HashEngine, sha256},
};

/// Header layouts the engine knows how to fetch and submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, DeserializeFromStr, SerializeDisplay)]
pub enum AlgorithmKind {
    #[display("sha256d")]
    Sha256d,
    #[display("scrypt")]
    Scrypt,
    #[display("neoscrypt")]
    Neoscrypt,
    #[display("credits")]
    Credits,
    #[display("decred")]
    Decred,
}

impl FromStr for AlgorithmKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256d" => Ok(Self::Sha256d),
            "scrypt" => Ok(Self::Scrypt),
            "neoscrypt" => Ok(Self::Neoscrypt),
            "credits" => Ok(Self::Credits),
            "decred" => Ok(Self::Decred),
            _ => bail!("unknown algorithm `{s}`"),
        }
    }
}

impl AlgorithmKind {
    /// Bytes of getwork `data` this algorithm hashes.
    pub fn work_len(self) -> usize {
        match self {
            Self::Credits => 168,
            Self::Decred => 192,
            _ => 128,
        }
    }

    /// Bytes of header sent back on a getwork submission.
    pub fn submit_len(self) -> usize {
        match self {
            Self::Neoscrypt => 80,
            other => other.work_len(),
        }
    }

    pub fn wants_midstate(self) -> bool {
        matches!(self, Self::Scrypt | Self::Credits)
    }
}

pub trait MidstateCompute: Send + Sync {
    fn midstate(&self, data: &[u8]) -> [u8; 32];
}

/// The hashing capability consumed by the work engine. Kernels live
/// elsewhere; the engine only needs the block hash primitive for
/// transactions and the Merkle tree, and optionally a midstate.
pub trait Algorithm: Debug + Send + Sync {
    fn kind(&self) -> AlgorithmKind;

    fn hash(&self, data: &[u8]) -> [u8; 32] {
        gbt::sha256d(data)
    }

    fn midstate(&self) -> Option<&dyn MidstateCompute> {
        None
    }
}

#[derive(Debug)]
pub struct Standard(pub AlgorithmKind);

impl Algorithm for Standard {
    fn kind(&self) -> AlgorithmKind {
        self.0
    }
}

/// SHA-256 state after the first 64 bytes of the header.
#[derive(Debug)]
pub struct Sha256Midstate(pub AlgorithmKind);

impl MidstateCompute for Sha256Midstate {
    fn midstate(&self, data: &[u8]) -> [u8; 32] {
        let block = flip64(data);
        let mut engine = sha256::Hash::engine();
        engine.input(&block);
        engine.midstate().to_byte_array()
    }
}

impl Algorithm for Sha256Midstate {
    fn kind(&self) -> AlgorithmKind {
        self.0
    }

    fn midstate(&self) -> Option<&dyn MidstateCompute> {
        Some(self)
    }
}

fn flip64(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    for (dst, src) in out.chunks_exact_mut(4).zip(data[..64].chunks_exact(4)) {
        LittleEndian::write_u32(dst, BigEndian::read_u32(src));
    }
    out
}

pub fn from_kind(kind: AlgorithmKind) -> Box<dyn Algorithm> {
    if kind.wants_midstate() {
        Box::new(Sha256Midstate(kind))
    } else {
        Box::new(Standard(kind))
    }
}
