use crate::{
    difficulty::Difficulty,
    digest::{candidate, Algorithm},
    errors::{MineError, MineResult},
    partition::DOMAIN_MAX,
    types::{SearchRange, Solution},
};

/// What every rank searches for: a nonce in `[0, domain)` whose candidate
/// digest satisfies `difficulty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub block: Vec<u8>,
    pub difficulty: Difficulty,
    pub algorithm: Algorithm,
    pub domain: u64,
}

impl Puzzle {
    pub fn new(block: impl Into<Vec<u8>>, difficulty: Difficulty, algorithm: Algorithm) -> Self {
        Self {
            block: block.into(),
            difficulty,
            algorithm,
            domain: DOMAIN_MAX,
        }
    }

    pub fn with_domain(mut self, domain: u64) -> Self {
        self.domain = domain;
        self
    }

    /// Every nonce the group may try.
    pub fn range(&self) -> SearchRange {
        SearchRange { start: 0, end: self.domain }
    }

    pub fn digest(&self, nonce: u64) -> Vec<u8> {
        self.algorithm.digest(&candidate(&self.block, nonce))
    }

    /// Recompute the digest of a claimed solution instead of trusting the sender.
    pub fn verify(&self, solution: &Solution) -> MineResult<()> {
        let mismatch = || {
            MineError::DigestMismatch {
                nonce: solution.nonce,
                found_by: solution.found_by,
            }
        };

        if !self.range().contains(solution.nonce)
            || solution.digest.len() != self.algorithm.output_size()
        {
            return Err(mismatch());
        }
        let digest = self.digest(solution.nonce);
        if digest != solution.digest || !self.difficulty.accepts(&digest) {
            return Err(mismatch());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rank;

    #[test]
    fn verifies_honest_solution() {
        let puzzle = Puzzle::new("Hello CS 220!!!", Difficulty::ANY, Algorithm::Md5);
        let solution = Solution { nonce: 17, digest: puzzle.digest(17), found_by: Rank(1) };
        assert!(puzzle.verify(&solution).is_ok());
    }

    #[test]
    fn rejects_forged_digest() {
        let puzzle = Puzzle::new("Hello CS 220!!!", Difficulty::ANY, Algorithm::Md5);
        let solution = Solution { nonce: 17, digest: puzzle.digest(18), found_by: Rank(2) };
        assert!(matches!(
            puzzle.verify(&solution),
            Err(MineError::DigestMismatch { nonce: 17, found_by: Rank(2) })
        ));
    }

    #[test]
    fn rejects_digest_above_target() {
        let puzzle = Puzzle::new("Hello CS 220!!!", Difficulty::from_mask(0), Algorithm::Md5);
        // a real digest, but one that does not start with 32 zero bits
        let nonce = (0..).find(|n| crate::difficulty::prefix(&puzzle.digest(*n)) != 0).unwrap();
        let solution = Solution { nonce, digest: puzzle.digest(nonce), found_by: Rank(0) };
        assert!(puzzle.verify(&solution).is_err());
    }

    #[test]
    fn rejects_nonce_outside_domain() {
        let puzzle = Puzzle::new("x", Difficulty::ANY, Algorithm::Sha256).with_domain(10);
        let solution = Solution { nonce: 10, digest: puzzle.digest(10), found_by: Rank(0) };
        assert!(puzzle.verify(&solution).is_err());
    }

    #[test]
    fn rejects_digest_of_the_wrong_algorithm() {
        let md5 = Puzzle::new("x", Difficulty::ANY, Algorithm::Md5);
        let sha = Puzzle::new("x", Difficulty::ANY, Algorithm::Sha256);
        let solution = Solution { nonce: 3, digest: md5.digest(3), found_by: Rank(1) };
        assert!(md5.verify(&solution).is_ok());
        assert!(sha.verify(&solution).is_err());
        assert_eq!(sha.range().len(), DOMAIN_MAX);
    }
}
