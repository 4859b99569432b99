//! In-memory store, used by tests and as a reference implementation of
//! the `Store` contract's semantics.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::types::{Bankroll, Wager, WagerResult};

#[derive(Default)]
pub struct MemoryStore {
    bankrolls: RwLock<HashMap<String, Bankroll>>,
    wagers: RwLock<HashMap<String, Wager>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_bankroll(&self, agent_id: &str) -> Result<Option<Bankroll>, StoreError> {
        Ok(self.bankrolls.read().await.get(agent_id).cloned())
    }

    async fn put_bankroll(&self, bankroll: &Bankroll) -> Result<(), StoreError> {
        self.bankrolls
            .write()
            .await
            .insert(bankroll.agent_id.clone(), bankroll.clone());
        Ok(())
    }

    async fn all_bankrolls(&self) -> Result<Vec<Bankroll>, StoreError> {
        Ok(self.bankrolls.read().await.values().cloned().collect())
    }

    async fn insert_wager(&self, wager: &Wager) -> Result<(), StoreError> {
        let mut wagers = self.wagers.write().await;
        if wagers.contains_key(&wager.id) {
            return Err(StoreError::Conflict(wager.id.clone()));
        }
        wagers.insert(wager.id.clone(), wager.clone());
        Ok(())
    }

    async fn update_wager(&self, wager: &Wager) -> Result<(), StoreError> {
        let mut wagers = self.wagers.write().await;
        match wagers.get_mut(&wager.id) {
            Some(slot) => {
                *slot = wager.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(wager.id.clone())),
        }
    }

    async fn get_wager(&self, wager_id: &str) -> Result<Option<Wager>, StoreError> {
        Ok(self.wagers.read().await.get(wager_id).cloned())
    }

    async fn wagers_for_agent(&self, agent_id: &str) -> Result<Vec<Wager>, StoreError> {
        let mut out: Vec<Wager> = self
            .wagers
            .read()
            .await
            .values()
            .filter(|w| w.agent_id == agent_id)
            .cloned()
            .collect();
        out.sort_by_key(|w| w.placed_at);
        Ok(out)
    }

    async fn pending_for_game(&self, game_id: &str) -> Result<Vec<Wager>, StoreError> {
        let mut out: Vec<Wager> = self
            .wagers
            .read()
            .await
            .values()
            .filter(|w| w.game_id == game_id && w.result == WagerResult::Pending)
            .cloned()
            .collect();
        out.sort_by_key(|w| w.placed_at);
        Ok(out)
    }
}
