//! Presence and topic subscriptions
//!
//! A user is online while at least one of their resources is registered.
//! Watching a user means subscribing to `Topic::Presence(user)`; content
//! topics (polls) use the same registry through `Topic::Content`.

use std::sync::Arc;

use tracing::{debug, error};

use crate::client::{CompleteIdentity, Connection};
use crate::hub::engine::Hub;
use crate::hub::message::PresenceInfo;
use crate::hub::topic::Topic;

impl Hub {
    /// Adds `subscriber` to `topic` and records the topic on the
    /// subscriber's connection for cleanup. A presence subscription is
    /// answered immediately with the watched user's current state.
    pub fn subscribe(&self, topic: Topic, subscriber: &CompleteIdentity) {
        let mut stale = Vec::new();
        {
            let _transition = self.transitions_guard();
            self.subscriptions().subscribe(topic.clone(), subscriber.clone());
            debug!(%topic, %subscriber, "subscribed");

            if topic.is_presence() {
                self.send_presence_snapshot(&topic, subscriber, &mut stale);
            }

            if let Some(connection) = self.connections().get_one(subscriber) {
                connection.add_subscription(topic);
            }
        }
        self.reap(stale);
    }

    /// Removes `subscriber` from `topic`. Safe to repeat.
    pub fn unsubscribe(&self, topic: &Topic, subscriber: &CompleteIdentity) {
        let _transition = self.transitions_guard();
        self.subscriptions().unsubscribe(topic, subscriber);
        if let Some(connection) = self.connections().get_one(subscriber) {
            connection.remove_subscription(topic);
        }
        debug!(%topic, %subscriber, "unsubscribed");
    }

    /// Tells every presence subscriber of `user` about a transition,
    /// pruning subscribers whose own connection is gone. Callers hold the
    /// transitions lock.
    pub(crate) fn broadcast_presence(
        &self,
        user: &str,
        online: bool,
        stale: &mut Vec<Arc<Connection>>,
    ) {
        let frame = match PresenceInfo::new(user, online).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(user, "failed to encode presence: {e}");
                return;
            }
        };

        let notified = self.fan_out_topic(&Topic::presence(user), &frame, None, stale);
        debug!(user, online, notified, "presence broadcast");
    }

    fn send_presence_snapshot(
        &self,
        topic: &Topic,
        subscriber: &CompleteIdentity,
        stale: &mut Vec<Arc<Connection>>,
    ) {
        let Some(connection) = self.connections().get_one(subscriber) else {
            debug!(%topic, %subscriber, "subscriber not connected, dropping subscription");
            self.subscriptions().unsubscribe(topic, subscriber);
            return;
        };

        let user = topic.id();
        let online = self.connections().is_online(user);
        match PresenceInfo::new(user, online).to_frame() {
            Ok(frame) => {
                self.push(&connection, &frame, stale);
            }
            Err(e) => error!(user, "failed to encode presence: {e}"),
        }
    }
}
