//! A [`Chain`] that several threads can use at once.
//!
//! Rounds are serialised by an append lock held for the whole search, while
//! the chain state itself is only locked to begin and commit a round. Callers
//! can keep submitting transactions and querying balances while a block is
//! being mined; those transactions land in the following round.

use crate::block::Block;
use crate::chain::{Chain, MiningRound};
use crate::config::ChainConfig;
use crate::error::{ConfigError, MineError, ValidationError};
use crate::pow::MiningLimits;
use crate::transaction::{Address, Transaction};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Clone, Default)]
pub struct SharedChain {
    state: Arc<RwLock<Chain>>,
    append: Arc<Mutex<()>>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        Self {
            state: Arc::new(RwLock::new(chain)),
            append: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_config(config: ChainConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Chain::with_config(config)?))
    }

    fn read(&self) -> RwLockReadGuard<'_, Chain> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Chain> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_lock(&self) -> MutexGuard<'_, ()> {
        self.append.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against a consistent view of the chain.
    pub fn with_chain<R>(&self, f: impl FnOnce(&Chain) -> R) -> R {
        f(&self.read())
    }

    pub fn create_transaction(&self, tx: Transaction) -> usize {
        let mut chain = self.write();
        chain.create_transaction(tx);
        chain.pending_transactions().len()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.read().pending_transactions().to_vec()
    }

    pub fn latest_block(&self) -> Block {
        self.read().latest_block().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.read().blocks().to_vec()
    }

    pub fn balance_of_address(&self, address: &str) -> i128 {
        self.read().balance_of_address(address)
    }

    pub fn balances(&self) -> BTreeMap<Address, i128> {
        self.read().balances()
    }

    pub fn is_chain_valid(&self) -> bool {
        self.read().is_chain_valid()
    }

    pub fn validate_strict(&self) -> Result<(), ValidationError> {
        self.read().validate_strict()
    }

    pub fn mine_pending_transactions(&self, reward_address: impl Into<Address>) -> Block {
        let _round = self.append_lock();
        let mut round = self.write().begin_round();
        round.mine();
        self.commit(round, reward_address.into())
    }

    /// Bounded mining. When the limits trip the captured transactions are
    /// returned to the front of the pool.
    pub fn mine_pending_transactions_with(
        &self,
        reward_address: impl Into<Address>,
        limits: &MiningLimits,
    ) -> Result<Block, MineError> {
        let _round = self.append_lock();
        let mut round = self.write().begin_round();
        if let Err(err) = round.mine_with(limits) {
            self.write().abort_round(round);
            return Err(err);
        }
        Ok(self.commit(round, reward_address.into()))
    }

    fn commit(&self, round: MiningRound, reward_address: Address) -> Block {
        // The append lock has kept the tip fixed since the round began.
        self.write().append_round(round, reward_address).clone()
    }
}
