pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const DEFAULT_MINING_REWARD: u64 = 100;
pub const GENESIS_TIMESTAMP: u64 = 0;
pub const GENESIS_DATA: &str = "Genesis Block";
/// Nonces tried between two looks at the cancel flag and the deadline.
pub const LIMIT_CHECK_INTERVAL: u64 = 4096;
