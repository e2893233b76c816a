//! The ledger: an append-only list of mined blocks plus the pool of
//! transactions waiting for the next one.

use crate::block::{now_millis, Block};
use crate::config::ChainConfig;
use crate::constants::{GENESIS_DATA, GENESIS_TIMESTAMP};
use crate::error::{ChainError, ConfigError, MineError, ValidationError};
use crate::hash::{to_hex, Hash};
use crate::pow::{MiningLimits, MiningStrategy};
use crate::transaction::{Address, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The fixed first block: zero timestamp, placeholder payload, zeroed
/// previous hash. Not mined.
pub fn genesis_block() -> Block {
    Block::with_data(
        GENESIS_TIMESTAMP,
        Some(GENESIS_DATA.to_string()),
        vec![],
        [0u8; 32],
    )
}

/// A block being mined outside the chain's borrow.
///
/// Produced by [`Chain::begin_round`]; hand it back with
/// [`Chain::commit_round`] once solved, or [`Chain::abort_round`].
#[derive(Clone, Debug)]
pub struct MiningRound {
    block: Block,
    difficulty: u32,
    strategy: MiningStrategy,
}

impl MiningRound {
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Unbounded search. A parallel search that somehow comes back empty
    /// falls back to the sequential one.
    pub fn mine(&mut self) -> Hash {
        match self.strategy {
            MiningStrategy::Sequential => self.block.mine(self.difficulty),
            MiningStrategy::Parallel => self
                .block
                .mine_with(self.difficulty, &MiningLimits::unbounded(), self.strategy)
                .unwrap_or_else(|_| self.block.mine(self.difficulty)),
        }
    }

    pub fn mine_with(&mut self, limits: &MiningLimits) -> Result<Hash, MineError> {
        self.block.mine_with(self.difficulty, limits, self.strategy)
    }
}

#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    config: ChainConfig,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// A chain holding only the genesis block, with the default configuration.
    pub fn new() -> Self {
        Self {
            blocks: vec![genesis_block()],
            pending: Vec::new(),
            config: ChainConfig::default(),
        }
    }

    pub fn with_config(config: ChainConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn mining_reward(&self) -> u64 {
        self.config.mining_reward
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the genesis block is present from construction.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    /// Queues `tx` for the next block. Balances are not checked.
    pub fn create_transaction(&mut self, tx: Transaction) {
        debug!(from = ?tx.from, to = %tx.to, amount = tx.amount, "transaction queued");
        self.pending.push(tx);
    }

    /// Takes the whole pending pool and builds an unmined block on top of
    /// the current tip. The pool is empty afterwards.
    pub fn begin_round(&mut self) -> MiningRound {
        let transactions = std::mem::take(&mut self.pending);
        debug!(
            height = self.blocks.len(),
            txs = transactions.len(),
            "mining round started"
        );
        MiningRound {
            block: Block::new(now_millis(), transactions, self.latest_block().hash),
            difficulty: self.config.difficulty,
            strategy: self.config.strategy,
        }
    }

    /// Returns the round's transactions to the front of the pool.
    pub fn abort_round(&mut self, round: MiningRound) {
        warn!(
            txs = round.block.transactions.len(),
            "mining round aborted"
        );
        let mut restored = round.block.transactions;
        restored.append(&mut self.pending);
        self.pending = restored;
    }

    /// Appends a solved round. The pool becomes the reward for
    /// `reward_address` followed by anything submitted while the round ran.
    ///
    /// A round that no longer extends the tip, or whose block is not solved,
    /// is rejected and its transactions go back to the pool.
    pub fn commit_round(
        &mut self,
        round: MiningRound,
        reward_address: impl Into<Address>,
    ) -> Result<&Block, ChainError> {
        let tip = self.latest_block().hash;
        let block = round.block();
        let rejection = if block.previous_hash != tip {
            Some(ChainError::StaleTip {
                expected: to_hex(&tip),
                found: to_hex(&block.previous_hash),
            })
        } else if block.hash != block.compute_digest() {
            Some(ChainError::HashMismatch)
        } else if !block.satisfies_difficulty(round.difficulty) {
            Some(ChainError::Unsolved {
                difficulty: round.difficulty,
            })
        } else {
            None
        };

        if let Some(err) = rejection {
            self.abort_round(round);
            return Err(err);
        }
        Ok(self.append_round(round, reward_address.into()))
    }

    pub(crate) fn append_round(&mut self, round: MiningRound, reward_address: Address) -> &Block {
        self.blocks.push(round.block);
        let mut next = vec![Transaction::reward(reward_address, self.config.mining_reward)];
        next.append(&mut self.pending);
        self.pending = next;
        info!(height = self.blocks.len() - 1, "block appended");
        self.latest_block()
    }

    /// Mines the pending pool into a new block, appends it, and queues the
    /// reward for `reward_address`. Blocks until the search succeeds.
    pub fn mine_pending_transactions(&mut self, reward_address: impl Into<Address>) -> &Block {
        let mut round = self.begin_round();
        round.mine();
        self.append_round(round, reward_address.into())
    }

    /// Bounded [`Chain::mine_pending_transactions`]. When the limits trip the
    /// chain is unchanged and the pending pool is restored.
    pub fn mine_pending_transactions_with(
        &mut self,
        reward_address: impl Into<Address>,
        limits: &MiningLimits,
    ) -> Result<&Block, MineError> {
        let mut round = self.begin_round();
        if let Err(err) = round.mine_with(limits) {
            self.abort_round(round);
            return Err(err);
        }
        Ok(self.append_round(round, reward_address.into()))
    }

    /// Net amount received by `address` across every block, in chain order.
    /// Linear in the number of transactions in the chain.
    pub fn balance_of_address(&self, address: &str) -> i128 {
        let mut balance = 0i128;
        for tx in self.blocks.iter().flat_map(|b| &b.transactions) {
            if tx.from.as_deref() == Some(address) {
                balance -= i128::from(tx.amount);
            }
            if tx.to == address {
                balance += i128::from(tx.amount);
            }
        }
        balance
    }

    /// Balance of every address that appears in the chain.
    pub fn balances(&self) -> BTreeMap<Address, i128> {
        let mut balances = BTreeMap::new();
        for tx in self.blocks.iter().flat_map(|b| &b.transactions) {
            if let Some(from) = &tx.from {
                *balances.entry(from.clone()).or_insert(0) -= i128::from(tx.amount);
            }
            *balances.entry(tx.to.clone()).or_insert(0) += i128::from(tx.amount);
        }
        balances
    }

    /// Checks every block after genesis: its stored hash matches its content
    /// and its previous hash matches its predecessor's hash. Proof-of-work and
    /// the genesis block are not checked; see [`Chain::validate_strict`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, pair) in self.blocks.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let index = index + 1;
            if current.hash != current.compute_digest() {
                warn!(index, "block hash does not match its content");
                return Err(ValidationError::HashMismatch { index });
            }
            if current.previous_hash != previous.hash {
                warn!(index, "block does not link to its predecessor");
                return Err(ValidationError::BrokenLink { index });
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// [`Chain::validate`] plus: the genesis block is the canonical one and
    /// every later block meets the chain's difficulty.
    pub fn validate_strict(&self) -> Result<(), ValidationError> {
        if self.blocks[0] != genesis_block() {
            warn!("genesis block has been altered");
            return Err(ValidationError::GenesisMismatch);
        }
        self.validate()?;
        let difficulty = self.config.difficulty;
        for (index, block) in self.blocks.iter().enumerate().skip(1) {
            if !block.satisfies_difficulty(difficulty) {
                warn!(index, difficulty, "block does not meet difficulty");
                return Err(ValidationError::InsufficientWork { index, difficulty });
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::meets_difficulty;
    use crate::pow::CancelToken;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn test_chain() -> Chain {
        Chain::with_config(ChainConfig::default().with_difficulty(2)).unwrap()
    }

    fn mined_chain(rounds: usize) -> Chain {
        let mut chain = test_chain();
        for i in 0..rounds {
            chain.create_transaction(Transaction::new("Alice", "Bob", i as u64 + 1));
            chain.mine_pending_transactions("miner");
        }
        chain
    }

    #[test]
    fn genesis_block_example() {
        let genesis = genesis_block();
        assert_eq!(genesis.timestamp, 0);
        assert_eq!(genesis.previous_hash, [0u8; 32]);
        assert_eq!(genesis.data.as_deref(), Some("Genesis Block"));
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.hash, genesis.compute_digest());
    }

    #[test]
    fn genesis_identical_across_chains() {
        let a = Chain::new();
        let b = test_chain();
        assert_eq!(a.blocks()[0], b.blocks()[0]);
        assert_eq!(a.len(), 1);
        assert!(!a.is_empty());
        assert_eq!(a.latest_block(), &a.blocks()[0]);
    }

    #[test]
    fn too_high_difficulty_rejected() {
        let err = Chain::with_config(ChainConfig::default().with_difficulty(65)).unwrap_err();
        assert_eq!(err, ConfigError::DifficultyTooHigh(65));
    }

    #[test]
    fn mining_scenario() {
        let mut chain = test_chain();
        chain.create_transaction(Transaction::new("A", "B", 50));
        chain.create_transaction(Transaction::new("B", "C", 250));
        chain.mine_pending_transactions("M");

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.balance_of_address("M"), 0);
        assert_eq!(chain.balance_of_address("A"), -50);
        assert_eq!(chain.balance_of_address("B"), -200);
        assert_eq!(chain.balance_of_address("C"), 250);
        assert_eq!(
            chain.pending_transactions(),
            &[Transaction::reward("M", 100)]
        );

        chain.mine_pending_transactions("M");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.balance_of_address("M"), 100);
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn mined_block_links_and_meets_difficulty() {
        let mut chain = test_chain();
        let tip = chain.latest_block().hash;
        chain.create_transaction(Transaction::new("A", "B", 1));
        let block = chain.mine_pending_transactions("M").clone();
        assert_eq!(block.previous_hash, tip);
        assert_eq!(block.hash, block.compute_digest());
        assert!(meets_difficulty(&block.hash, 2));
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 1)]);
    }

    #[test]
    fn difficulty_zero_chain() {
        let mut chain =
            Chain::with_config(ChainConfig::default().with_difficulty(0)).unwrap();
        chain.mine_pending_transactions("M");
        assert_eq!(chain.latest_block().nonce, 0);
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn parallel_strategy_chain() {
        let config = ChainConfig::default()
            .with_difficulty(2)
            .with_strategy(MiningStrategy::Parallel);
        let mut chain = Chain::with_config(config).unwrap();
        chain.create_transaction(Transaction::new("A", "B", 3));
        chain.mine_pending_transactions("M");
        chain.mine_pending_transactions("M");
        assert_eq!(chain.len(), 3);
        assert!(chain.validate_strict().is_ok());
    }

    #[test]
    fn mined_chain_is_valid_and_idempotent() {
        let chain = mined_chain(4);
        let before = chain.blocks().to_vec();
        for _ in 0..3 {
            assert!(chain.is_chain_valid());
            assert_eq!(chain.validate_strict(), Ok(()));
        }
        assert_eq!(chain.blocks(), &before[..]);
    }

    #[test]
    fn tampered_amount_detected() {
        let mut chain = mined_chain(3);
        chain.blocks_mut()[1].transactions[0].amount = 1_000;
        assert!(!chain.is_chain_valid());
        assert_eq!(
            chain.validate(),
            Err(ValidationError::HashMismatch { index: 1 })
        );
    }

    #[test]
    fn swapped_blocks_detected() {
        let mut chain = mined_chain(3);
        chain.blocks_mut().swap(1, 2);
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn removed_block_detected() {
        let mut chain = mined_chain(3);
        chain.blocks_mut().remove(1);
        assert_eq!(
            chain.validate(),
            Err(ValidationError::BrokenLink { index: 1 })
        );
    }

    #[test]
    fn rehashed_tail_passes_narrow_check_only() {
        let mut chain = mined_chain(2);
        let tail = chain.blocks_mut().last_mut().unwrap();
        tail.transactions[0].amount = 9_999;
        // Recompute the hash without redoing the work.
        tail.nonce = 0;
        while meets_difficulty(&tail.compute_digest(), 2) {
            tail.nonce += 1;
        }
        tail.hash = tail.compute_digest();

        assert!(chain.is_chain_valid());
        assert_eq!(
            chain.validate_strict(),
            Err(ValidationError::InsufficientWork {
                index: 2,
                difficulty: 2
            })
        );
    }

    #[test]
    fn altered_genesis_passes_narrow_check_only() {
        let mut chain = test_chain();
        chain.blocks_mut()[0].data = Some("forged".to_string());
        assert!(chain.is_chain_valid());
        assert_eq!(
            chain.validate_strict(),
            Err(ValidationError::GenesisMismatch)
        );
    }

    #[test]
    fn transfers_conserve_value() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut chain =
            Chain::with_config(ChainConfig::default().with_difficulty(1)).unwrap();
        let users: Vec<String> = (0..6).map(|i| format!("user-{i}")).collect();
        for _ in 0..4 {
            for _ in 0..10 {
                let from = &users[rng.gen_range(0..users.len())];
                let to = &users[rng.gen_range(0..users.len())];
                chain.create_transaction(Transaction::new(from.clone(), to.clone(), rng.gen_range(0..1_000)));
            }
            let mut round = chain.begin_round();
            round.mine();
            // Commit, then drop the reward so no value is issued.
            chain.commit_round(round, "nobody").unwrap();
            chain.pending.clear();
        }
        let total: i128 = users.iter().map(|u| chain.balance_of_address(u)).sum();
        assert_eq!(total, 0);
        let map_total: i128 = chain.balances().values().sum();
        assert_eq!(map_total, 0);
    }

    #[test]
    fn balances_match_per_address_query() {
        let mut chain = test_chain();
        chain.create_transaction(Transaction::new("A", "B", 50));
        chain.mine_pending_transactions("M");
        chain.mine_pending_transactions("M");
        let balances = chain.balances();
        for (address, balance) in &balances {
            assert_eq!(chain.balance_of_address(address), *balance);
        }
        assert_eq!(balances.get("M"), Some(&100));
        assert_eq!(chain.balance_of_address("nobody"), 0);
    }

    #[test]
    fn round_defers_late_transactions() {
        let mut chain = test_chain();
        chain.create_transaction(Transaction::new("A", "B", 1));
        let mut round = chain.begin_round();
        assert!(chain.pending_transactions().is_empty());

        chain.create_transaction(Transaction::new("C", "D", 2));
        round.mine();
        let block = chain.commit_round(round, "M").unwrap();
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 1)]);
        assert_eq!(
            chain.pending_transactions(),
            &[Transaction::reward("M", 100), Transaction::new("C", "D", 2)]
        );
    }

    #[test]
    fn aborted_round_restores_pool_order() {
        let mut chain = test_chain();
        chain.create_transaction(Transaction::new("A", "B", 1));
        let round = chain.begin_round();
        chain.create_transaction(Transaction::new("C", "D", 2));
        chain.abort_round(round);
        assert_eq!(
            chain.pending_transactions(),
            &[Transaction::new("A", "B", 1), Transaction::new("C", "D", 2)]
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn stale_round_rejected() {
        let mut chain = test_chain();
        chain.create_transaction(Transaction::new("A", "B", 1));
        let mut first = chain.begin_round();
        chain.create_transaction(Transaction::new("C", "D", 2));
        let mut second = chain.begin_round();
        first.mine();
        second.mine();
        chain.commit_round(first, "M").unwrap();

        let err = chain.commit_round(second, "M").unwrap_err();
        assert!(matches!(err, ChainError::StaleTip { .. }));
        assert_eq!(chain.len(), 2);
        assert_eq!(
            chain.pending_transactions(),
            &[Transaction::new("C", "D", 2), Transaction::reward("M", 100)]
        );
    }

    #[test]
    fn unsolved_round_rejected() {
        let mut chain =
            Chain::with_config(ChainConfig::default().with_difficulty(8)).unwrap();
        let mut round = chain.begin_round();
        while round.block.satisfies_difficulty(8) {
            round.block.nonce += 1;
            round.block.hash = round.block.compute_digest();
        }
        let err = chain.commit_round(round, "M").unwrap_err();
        assert_eq!(err, ChainError::Unsolved { difficulty: 8 });
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn cancelled_mining_leaves_chain_unchanged() {
        let mut chain =
            Chain::with_config(ChainConfig::default().with_difficulty(64)).unwrap();
        chain.create_transaction(Transaction::new("A", "B", 5));
        let token = CancelToken::new();
        token.cancel();
        let limits = MiningLimits::unbounded().with_cancel(token);
        let err = chain
            .mine_pending_transactions_with("M", &limits)
            .unwrap_err();
        assert_eq!(err, MineError::Cancelled);
        assert_eq!(chain.len(), 1);
        assert_eq!(
            chain.pending_transactions(),
            &[Transaction::new("A", "B", 5)]
        );
    }

    #[test]
    fn bounded_mining_succeeds_within_limits() {
        let mut chain = test_chain();
        let limits = MiningLimits::unbounded().with_timeout(std::time::Duration::from_secs(30));
        let block = chain.mine_pending_transactions_with("M", &limits).unwrap();
        assert!(block.satisfies_difficulty(2));
        assert_eq!(chain.len(), 2);
    }
}
