use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::SubscriberId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),
}

/// Validate a `0x` + 40 hex digit address and return its lower-cased form.
pub fn normalize_address(raw: &str) -> Result<String, TrackError> {
    let trimmed = raw.trim();
    let valid = trimmed.len() == 42
        && trimmed.starts_with("0x")
        && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        return Err(TrackError::InvalidAddress(raw.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Many-to-many subscriber ↔ wallet mapping. Wallets are stored normalised.
#[derive(Debug, Default)]
pub struct TrackingRegistry {
    by_subscriber: HashMap<SubscriberId, HashSet<String>>,
}

impl TrackingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the pair was newly added.
    pub fn track(&mut self, subscriber: SubscriberId, wallet: &str) -> bool {
        self.by_subscriber
            .entry(subscriber)
            .or_default()
            .insert(wallet.to_string())
    }

    /// Returns whether the pair existed. Subscribers left without wallets are pruned.
    pub fn untrack(&mut self, subscriber: SubscriberId, wallet: &str) -> bool {
        let Some(wallets) = self.by_subscriber.get_mut(&subscriber) else {
            return false;
        };
        let removed = wallets.remove(wallet);
        if wallets.is_empty() {
            self.by_subscriber.remove(&subscriber);
        }
        removed
    }

    pub fn list_wallets(&self, subscriber: SubscriberId) -> HashSet<String> {
        self.by_subscriber
            .get(&subscriber)
            .cloned()
            .unwrap_or_default()
    }

    pub fn list_subscribers(&self, wallet: &str) -> HashSet<SubscriberId> {
        self.by_subscriber
            .iter()
            .filter(|(_, wallets)| wallets.contains(wallet))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_tracked(&self, wallet: &str) -> bool {
        self.by_subscriber.values().any(|w| w.contains(wallet))
    }

    /// De-duplicated union of every tracked wallet: one tick's poll universe.
    pub fn all_tracked_wallets(&self) -> HashSet<String> {
        self.by_subscriber.values().flatten().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.by_subscriber.len()
    }

    pub fn wallet_count(&self) -> usize {
        self.all_tracked_wallets().len()
    }
}
