use crate::error::MineError;
use crate::hash::{digest, meets_difficulty, serde_hex, to_hex, Hash};
use crate::pow::{self, MiningLimits, MiningStrategy};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: u64,
    /// Free-form payload; only the genesis block carries one.
    pub data: Option<String>,
    pub transactions: Vec<Transaction>,
    #[serde(with = "serde_hex")]
    pub previous_hash: Hash,
    #[serde(with = "serde_hex")]
    pub hash: Hash,
    pub nonce: u64,
}

impl Block {
    /// Builds an unmined block: nonce 0 and the hash of that content.
    pub fn new(timestamp: u64, transactions: Vec<Transaction>, previous_hash: Hash) -> Self {
        Self::with_data(timestamp, None, transactions, previous_hash)
    }

    pub fn with_data(
        timestamp: u64,
        data: Option<String>,
        transactions: Vec<Transaction>,
        previous_hash: Hash,
    ) -> Self {
        let mut block = Self {
            timestamp,
            data,
            transactions,
            previous_hash,
            hash: [0u8; 32],
            nonce: 0,
        };
        block.hash = block.compute_digest();
        block
    }

    /// Canonical encoding of everything hashed except the nonce.
    pub fn content_prefix(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 9 + 32 + 8 + 64 * self.transactions.len());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        match &self.data {
            Some(data) => {
                bytes.push(1);
                bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
                bytes.extend_from_slice(data.as_bytes());
            }
            None => bytes.push(0),
        }
        bytes.extend_from_slice(&self.previous_hash);
        bytes.extend_from_slice(&(self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            tx.encode_into(&mut bytes);
        }
        bytes
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = self.content_prefix();
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn compute_digest(&self) -> Hash {
        digest(&self.hash_bytes())
    }

    pub fn satisfies_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Searches for a nonce whose digest has `difficulty` leading zero hex
    /// characters, then stores the nonce and hash. Runs until it succeeds.
    pub fn mine(&mut self, difficulty: u32) -> Hash {
        let solution = pow::search_nonce(&self.content_prefix(), difficulty);
        self.nonce = solution.nonce;
        self.hash = solution.hash;
        info!("Block mined: {}", to_hex(&self.hash));
        self.hash
    }

    /// Bounded [`Block::mine`]. On error the block is left untouched.
    pub fn mine_with(
        &mut self,
        difficulty: u32,
        limits: &MiningLimits,
        strategy: MiningStrategy,
    ) -> Result<Hash, MineError> {
        let solution = pow::search(&self.content_prefix(), difficulty, limits, strategy)?;
        self.nonce = solution.nonce;
        self.hash = solution.hash;
        info!(
            nonce = solution.nonce,
            "Block mined: {}",
            to_hex(&self.hash)
        );
        Ok(self.hash)
    }
}
