//! In-Memory Store
//!
//! Single-process store behind one mutex. Every trait method is one
//! critical section with no await points, which is what serializes
//! concurrent actions from the same user and keeps ledger movements in
//! the same unit as the game mutation they accompany.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::game::{GameRecord, PlayOutcome};
use super::{Store, StoreError, UserRecord, STARTING_BALANCE};

#[derive(Default)]
struct Inner {
    users: BTreeMap<Uuid, UserRecord>,
    users_by_name: BTreeMap<String, Uuid>,
    games: BTreeMap<Uuid, GameRecord>,
}

/// In-memory implementation of [`Store`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-write;
        // the data itself is still consistent enough to keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store for MemoryStore {
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut inner = self.lock();

        if inner.users_by_name.contains_key(username) {
            return Err(StoreError::DuplicateUsername);
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            balance: STARTING_BALANCE,
            created_at: Utc::now(),
        };

        inner.users_by_name.insert(user.username.clone(), user.id);
        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    fn user_by_name(&self, username: &str) -> Option<UserRecord> {
        let inner = self.lock();
        let id = inner.users_by_name.get(username)?;
        inner.users.get(id).cloned()
    }

    fn user_by_id(&self, id: Uuid) -> Option<UserRecord> {
        self.lock().users.get(&id).cloned()
    }

    fn balance(&self, user_id: Uuid) -> Result<i64, StoreError> {
        self.lock()
            .users
            .get(&user_id)
            .map(|u| u.balance)
            .ok_or(StoreError::UnknownUser)
    }

    fn debit(&self, user_id: Uuid, amount: i64) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::UnknownUser)?;

        if user.balance < amount {
            return Err(StoreError::InsufficientFunds);
        }
        user.balance -= amount;
        Ok(user.balance)
    }

    fn credit(&self, user_id: Uuid, amount: i64) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        let user = inner.users.get_mut(&user_id).ok_or(StoreError::UnknownUser)?;

        user.balance += amount;
        Ok(user.balance)
    }

    fn create_game(&self, record: GameRecord) -> Result<GameRecord, StoreError> {
        let mut inner = self.lock();

        let has_open = inner
            .games
            .values()
            .any(|g| g.user_id == record.user_id && g.kind == record.kind && !g.game_over);
        if has_open {
            return Err(StoreError::ActiveGameExists);
        }

        // Debit and insert under the same lock: both succeed or neither.
        let user = inner
            .users
            .get_mut(&record.user_id)
            .ok_or(StoreError::UnknownUser)?;
        if user.balance < record.bet {
            return Err(StoreError::InsufficientFunds);
        }
        user.balance -= record.bet;

        inner.games.insert(record.id, record.clone());
        Ok(record)
    }

    fn open_game(&self, user_id: Uuid, kind: &str) -> Option<GameRecord> {
        self.lock()
            .games
            .values()
            .find(|g| g.user_id == user_id && g.kind == kind && !g.game_over)
            .cloned()
    }

    fn transact_open_game(
        &self,
        user_id: Uuid,
        kind: &str,
        play: &mut dyn FnMut(&mut GameRecord) -> PlayOutcome,
    ) -> Result<(GameRecord, PlayOutcome), StoreError> {
        let mut inner = self.lock();

        let game_id = inner
            .games
            .values()
            .find(|g| g.user_id == user_id && g.kind == kind && !g.game_over)
            .map(|g| g.id)
            .ok_or(StoreError::GameNotFound)?;

        let (record, outcome, payout) = {
            let record = inner
                .games
                .get_mut(&game_id)
                .ok_or(StoreError::GameNotFound)?;
            let outcome = play(record);
            let payout = match outcome {
                PlayOutcome::Resolved { win: true } => 2 * record.bet,
                _ => 0,
            };
            (record.clone(), outcome, payout)
        };

        if payout > 0 {
            let user = inner.users.get_mut(&user_id).ok_or(StoreError::UnknownUser)?;
            user.balance += payout;
        }

        Ok((record, outcome))
    }

    fn resolved_games(&self, user_id: Uuid, kind: &str) -> Vec<GameRecord> {
        let inner = self.lock();
        let mut games: Vec<GameRecord> = inner
            .games
            .values()
            .filter(|g| g.user_id == user_id && g.kind == kind && g.game_over)
            .cloned()
            .collect();
        games.sort_by_key(|g| g.created_at);
        games
    }
}

// =============================================================================
// TESTS
// =============================================================================
