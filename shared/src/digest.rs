use std::{
    fmt::{Display, Formatter},
    io::Write,
    str::FromStr,
};

pub use md5::Md5;
use serde::{Deserialize, Serialize};
pub use sha2::{Digest, Sha256};

/// Standard digest functions a search can run with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Md5,
    Sha256,
}

impl Algorithm {
    pub fn digest(self, input: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Md5 => Md5::digest(input).to_vec(),
            Algorithm::Sha256 => Sha256::digest(input).to_vec(),
        }
    }

    pub fn output_size(self) -> usize {
        match self {
            Algorithm::Md5 => <Md5 as Digest>::output_size(),
            Algorithm::Sha256 => <Sha256 as Digest>::output_size(),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Md5 => write!(f, "md5"),
            Algorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            other => Err(format!("unknown digest algorithm `{other}`")),
        }
    }
}

/// `base ++ decimal(nonce)`, e.g. `Hello World!` and `10` give `Hello World!10`.
pub fn candidate(base: &[u8], nonce: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(base.len() + 20);
    buf.extend_from_slice(base);
    // writing into a Vec cannot fail
    let _ = write!(buf, "{nonce}");
    buf
}

/// Reusable candidate buffer for the hashing loop. Holds the base input once
/// and rewrites only the nonce digits per call.
pub struct CandidateBuf {
    buf: Vec<u8>,
    base_len: usize,
}

impl CandidateBuf {
    pub fn new(base: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(base.len() + 20);
        buf.extend_from_slice(base);
        Self { buf, base_len: base.len() }
    }

    pub fn with_nonce(&mut self, nonce: u64) -> &[u8] {
        self.buf.truncate(self.base_len);
        let _ = write!(self.buf, "{nonce}");
        &self.buf
    }
}
