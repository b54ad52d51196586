//! In-memory account state, keyed by block hash.

use crate::domain::errors::EventsError;
use crate::ports::outbound::{AccountStateReader, StateProvider};
use parking_lot::RwLock;
use shared_types::{Address, Hash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
struct AccountEntry {
    nonce: u64,
    code: Option<Vec<u8>>,
}

/// In-memory account state for one block.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAccountState {
    accounts: HashMap<Address, AccountEntry>,
}

impl InMemoryAccountState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to add or replace an account.
    pub fn with_account(mut self, address: Address, nonce: u64, code: Option<Vec<u8>>) -> Self {
        self.accounts.insert(address, AccountEntry { nonce, code });
        self
    }
}

impl AccountStateReader for InMemoryAccountState {
    fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.nonce)
    }

    fn code(&self, address: &Address) -> Option<Vec<u8>> {
        self.accounts.get(address).and_then(|a| a.code.clone())
    }
}

/// In-memory implementation of StateProvider for testing and local tooling.
///
/// Counts every snapshot request, successful or not.
#[derive(Default)]
pub struct InMemoryStateProvider {
    states: RwLock<HashMap<Hash, Arc<InMemoryAccountState>>>,
    snapshot_requests: AtomicUsize,
}

impl InMemoryStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the state as of `block_hash`.
    pub fn insert(&self, block_hash: Hash, state: InMemoryAccountState) {
        self.states.write().insert(block_hash, Arc::new(state));
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_state(self, block_hash: Hash, state: InMemoryAccountState) -> Self {
        self.insert(block_hash, state);
        self
    }

    /// Number of `state_at` calls so far.
    pub fn snapshot_requests(&self) -> usize {
        self.snapshot_requests.load(Ordering::Relaxed)
    }
}

impl StateProvider for InMemoryStateProvider {
    fn state_at(&self, block_hash: &Hash) -> Result<Arc<dyn AccountStateReader>, EventsError> {
        self.snapshot_requests.fetch_add(1, Ordering::Relaxed);

        let states = self.states.read();
        let state = states
            .get(block_hash)
            .cloned()
            .ok_or_else(|| EventsError::StateLookupFailure {
                block_hash: *block_hash,
                reason: "no state recorded for block".to_string(),
            })?;

        Ok(state)
    }
}
