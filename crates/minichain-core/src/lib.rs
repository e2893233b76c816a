//! Proof-of-work ledger engine: a linear chain of blocks of value transfers,
//! each block linked to its predecessor by hash and admitted only after a
//! nonce search.
//!
//! ```
//! use minichain_core::{Chain, ChainConfig, Transaction};
//!
//! let mut chain = Chain::with_config(ChainConfig::default().with_difficulty(2)).unwrap();
//! chain.create_transaction(Transaction::new("alice", "bob", 50));
//! chain.mine_pending_transactions("miner");
//! assert!(chain.is_chain_valid());
//! assert_eq!(chain.balance_of_address("bob"), 50);
//! ```

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod pow;
pub mod shared;
pub mod transaction;

pub use block::Block;
pub use chain::{genesis_block, Chain, MiningRound};
pub use config::ChainConfig;
pub use error::{ChainError, ConfigError, HashParseError, MineError, ValidationError};
pub use hash::Hash;
pub use pow::{CancelToken, MiningLimits, MiningStrategy, Solution};
pub use shared::SharedChain;
pub use transaction::{Address, Transaction};
