//! Proof-of-work nonce search.
//!
//! The search is a pure function of the block content that precedes the
//! nonce: the SHA-256 state over that prefix is computed once and cloned for
//! every candidate nonce.

use crate::constants::LIMIT_CHECK_INTERVAL;
use crate::error::MineError;
use crate::hash::{finalize, meets_difficulty, Hash};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub hash: Hash,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningStrategy {
    #[default]
    Sequential,
    Parallel,
}

/// Shared flag that asks a running search to give up.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Once set the token stays cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Optional bounds on a nonce search. The default is unbounded.
#[derive(Clone, Debug, Default)]
pub struct MiningLimits {
    cancel: Option<CancelToken>,
    deadline: Option<Instant>,
}

impl MiningLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_unbounded(&self) -> bool {
        self.cancel.is_none() && self.deadline.is_none()
    }

    pub fn check(&self) -> Result<(), MineError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(MineError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(MineError::DeadlineExceeded);
        }
        Ok(())
    }
}

fn hash_at(base: &Sha256, nonce: u64) -> Hash {
    finalize(base.clone().chain_update(nonce.to_le_bytes()))
}

/// Searches nonces 0, 1, 2, ... until `prefix || nonce` hashes to a digest
/// with at least `difficulty` leading zero hex characters.
///
/// Unbounded: for a difficulty no digest can meet this never returns.
pub fn search_nonce(prefix: &[u8], difficulty: u32) -> Solution {
    let base = Sha256::new_with_prefix(prefix);
    let mut nonce = 0u64;
    loop {
        let hash = hash_at(&base, nonce);
        if meets_difficulty(&hash, difficulty) {
            return Solution { nonce, hash };
        }
        nonce = nonce.wrapping_add(1);
    }
}

/// Sequential search that stops when `limits` trip.
pub fn search_nonce_with(
    prefix: &[u8],
    difficulty: u32,
    limits: &MiningLimits,
) -> Result<Solution, MineError> {
    let base = Sha256::new_with_prefix(prefix);
    for nonce in 0..=u64::MAX {
        if nonce % LIMIT_CHECK_INTERVAL == 0 {
            limits.check()?;
        }
        let hash = hash_at(&base, nonce);
        if meets_difficulty(&hash, difficulty) {
            return Ok(Solution { nonce, hash });
        }
    }
    Err(MineError::NonceSpaceExhausted)
}

/// Searches the nonce space across the rayon pool.
///
/// Any winning nonce may be returned, not necessarily the smallest.
pub fn search_nonce_parallel(
    prefix: &[u8],
    difficulty: u32,
    limits: &MiningLimits,
) -> Result<Solution, MineError> {
    let base = Sha256::new_with_prefix(prefix);
    let found = (0u64..u64::MAX).into_par_iter().find_any(|nonce| {
        if nonce % LIMIT_CHECK_INTERVAL == 0 && limits.check().is_err() {
            return true;
        }
        meets_difficulty(&hash_at(&base, *nonce), difficulty)
    });

    let Some(nonce) = found else {
        return Err(MineError::NonceSpaceExhausted);
    };
    let hash = hash_at(&base, nonce);
    if meets_difficulty(&hash, difficulty) {
        return Ok(Solution { nonce, hash });
    }
    // The search stopped on a limit; limits never reset, so this reports it.
    limits.check().and(Err(MineError::Cancelled))
}

pub fn search(
    prefix: &[u8],
    difficulty: u32,
    limits: &MiningLimits,
    strategy: MiningStrategy,
) -> Result<Solution, MineError> {
    match strategy {
        MiningStrategy::Sequential => search_nonce_with(prefix, difficulty, limits),
        MiningStrategy::Parallel => search_nonce_parallel(prefix, difficulty, limits),
    }
}
