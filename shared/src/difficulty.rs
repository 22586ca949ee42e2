use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::errors::{MineError, MineResult};

pub const MIN_LEADING_ZEROS: u32 = 1;
pub const MAX_LEADING_ZEROS: u32 = 32;

/// Bound on the first 32 bits of a digest.
///
/// A prefix satisfies the mask when it has no bit set outside of it, so a
/// mask of `0…01…1` with N leading zeros accepts every digest that starts
/// with at least N zero bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulty {
    mask: u32,
}

impl Difficulty {
    /// Accepts every digest.
    pub const ANY: Difficulty = Difficulty { mask: u32::MAX };

    pub fn from_leading_zeros(bits: u32) -> MineResult<Self> {
        if !(MIN_LEADING_ZEROS..=MAX_LEADING_ZEROS).contains(&bits) {
            return Err(MineError::InvalidDifficulty(bits));
        }
        Ok(Self {
            mask: u32::MAX.checked_shr(bits).unwrap_or(0),
        })
    }

    pub fn from_mask(mask: u32) -> Self {
        Self { mask }
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn satisfied_by(&self, prefix: u32) -> bool {
        prefix & self.mask == prefix
    }

    pub fn accepts(&self, digest: &[u8]) -> bool {
        self.satisfied_by(prefix(digest))
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032b}", self.mask)
    }
}

/// First four digest bytes as a big-endian integer. Shorter digests are zero padded.
pub fn prefix(digest: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    let n = digest.len().min(4);
    word[..n].copy_from_slice(&digest[..n]);
    u32::from_be_bytes(word)
}
