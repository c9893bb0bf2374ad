use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::domain::models::UserId;

/// Allows at most one avatar run per user at a time.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    active: Arc<Mutex<HashSet<UserId>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another run for `user_id` holds its guard.
    pub fn try_acquire(&self, user_id: &UserId) -> Option<FlightGuard> {
        let mut active = lock(&self.active);
        if !active.insert(user_id.clone()) {
            return None;
        }

        Some(FlightGuard {
            active: Arc::clone(&self.active),
            user_id: user_id.clone(),
        })
    }

    pub fn is_active(&self, user_id: &UserId) -> bool {
        lock(&self.active).contains(user_id)
    }
}

/// Releases the user's slot when dropped.
#[derive(Debug)]
pub struct FlightGuard {
    active: Arc<Mutex<HashSet<UserId>>>,
    user_id: UserId,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.user_id);
    }
}

fn lock(active: &Mutex<HashSet<UserId>>) -> MutexGuard<'_, HashSet<UserId>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
