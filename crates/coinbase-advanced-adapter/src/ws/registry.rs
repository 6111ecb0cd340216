/*
[INPUT]:  Channel and product ids from subscribe/unsubscribe calls
[OUTPUT]: Desired subscription set, replayed after every reconnect
[POS]:    WebSocket layer - subscription bookkeeping
[UPDATE]: When subscription keys or replay semantics change
*/

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::types::ChannelType;

/// One active channel and the products requested on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionEntry {
    pub channel: ChannelType,
    pub symbols: Vec<String>,
}

/// At most one entry per channel; a later subscribe replaces the product list
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<BTreeMap<ChannelType, Vec<String>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the entry, returning the replaced product list
    pub fn insert(&self, channel: ChannelType, symbols: Vec<String>) -> Option<Vec<String>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, symbols)
    }

    pub fn remove(&self, channel: ChannelType) -> Option<Vec<String>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel)
    }

    pub fn get(&self, channel: ChannelType) -> Option<Vec<String>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .cloned()
    }

    /// Point-in-time copy, ordered by channel
    pub fn snapshot(&self) -> Vec<SubscriptionEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(channel, symbols)| SubscriptionEntry {
                channel: *channel,
                symbols: symbols.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
