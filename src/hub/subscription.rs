//! Subscription registry
//!
//! Maps a `Topic` to the set of `user@resource` identities subscribed to it.
//! A topic key exists only while its subscriber set is non-empty. The
//! registry knows nothing about connections; resolving a subscriber to a live
//! connection (and pruning the ones that no longer resolve) is the hub's job.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::client::CompleteIdentity;
use crate::hub::topic::Topic;

pub type SubscriberId = CompleteIdentity;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: RwLock<HashMap<Topic, HashSet<SubscriberId>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscriber` to `topic`, creating the topic on first use.
    /// Returns `false` if it was already subscribed.
    pub fn subscribe(&self, topic: Topic, subscriber: SubscriberId) -> bool {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        topics.entry(topic).or_default().insert(subscriber)
    }

    /// Removes `subscriber` from `topic` and drops the topic once empty.
    /// Unknown topics and subscribers are ignored.
    pub fn unsubscribe(&self, topic: &Topic, subscriber: &SubscriberId) -> bool {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };

        let removed = subscribers.remove(subscriber);
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Snapshot of the current subscribers; empty for unknown topics.
    pub fn subscribers(&self, topic: &Topic) -> Vec<SubscriberId> {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics
            .get(topic)
            .map(|subscribers| subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_topic(&self, topic: &Topic) -> bool {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics.contains_key(topic)
    }

    pub fn is_subscribed(&self, topic: &Topic, subscriber: &SubscriberId) -> bool {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics
            .get(topic)
            .is_some_and(|subscribers| subscribers.contains(subscriber))
    }

    pub fn topic_count(&self) -> usize {
        let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
        topics.len()
    }
}
