//! Hub engine
//!
//! The `Hub` owns the connection registry, the subscription registry and the
//! payload decoder table. It is created once at startup and shared as
//! `Arc<Hub>` by every connection pump; there is no global state.
//!
//! Locking:
//! - each registry has its own `RwLock`, held only for the duration of a
//!   single map operation and never across a frame push;
//! - `transitions` serializes everything that must look atomic to presence
//!   subscribers: registration, teardown, and subscribe/unsubscribe. An
//!   online and an offline transition for the same user can therefore never
//!   be observed out of order.
//!
//! Frame pushes never block (see `Connection::deliver`). A push that finds a
//! closed queue marks that connection stale; stale connections are torn down
//! once the current operation has released every lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{CompleteIdentity, Connection, DeliveryError};
use crate::hub::registry::{ConnectionRegistry, Removal};
use crate::hub::subscription::SubscriptionRegistry;
use crate::hub::topic::Topic;
use crate::payload::PayloadDecoders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub users: usize,
    pub connections: usize,
    pub topics: usize,
}

#[derive(Debug)]
pub struct Hub {
    connections: ConnectionRegistry,
    subscriptions: SubscriptionRegistry,
    decoders: PayloadDecoders,
    transitions: Mutex<()>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            subscriptions: SubscriptionRegistry::new(),
            decoders: PayloadDecoders::new(),
            transitions: Mutex::new(()),
        }
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn decoders(&self) -> &PayloadDecoders {
        &self.decoders
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            users: self.connections.user_count(),
            connections: self.connections.connection_count(),
            topics: self.subscriptions.topic_count(),
        }
    }

    /// Makes the connection reachable. The user's first resource flips them
    /// online for every presence subscriber. A connection that previously
    /// held the same `user@resource` hands its topics over and is shut down.
    pub fn register(&self, connection: Arc<Connection>) {
        let mut stale = Vec::new();
        {
            let _transition = self.transitions_guard();
            let registration = self.connections.add(connection.clone());

            if let Some(displaced) = registration.displaced {
                info!(
                    identity = %connection.identity(),
                    displaced = %displaced.id(),
                    "resource taken over by a new connection"
                );
                connection.adopt_subscriptions(displaced.take_subscriptions());
                displaced.shutdown();
            }

            if registration.first_for_user {
                self.broadcast_presence(connection.user(), true, &mut stale);
            }
        }

        info!(
            identity = %connection.identity(),
            connection = %connection.id(),
            "connection registered"
        );
        self.reap(stale);
    }

    /// Idempotent teardown shared by both pump loops and by failed pushes.
    ///
    /// Removes the connection (only if it still owns its slot), broadcasts
    /// offline when it was the user's last resource, drops every topic it
    /// subscribed to and signals the pump to stop.
    pub fn teardown(&self, connection: &Arc<Connection>) {
        if !connection.begin_teardown() {
            return;
        }

        let mut stale = Vec::new();
        let removal = {
            let _transition = self.transitions_guard();
            let removal = self.connections.remove(connection);

            if let Removal::Removed {
                last_for_user: true,
            } = removal
            {
                self.broadcast_presence(connection.user(), false, &mut stale);
            }

            for topic in connection.take_subscriptions() {
                self.subscriptions.unsubscribe(&topic, connection.identity());
            }
            removal
        };

        connection.shutdown();
        info!(
            identity = %connection.identity(),
            connection = %connection.id(),
            ?removal,
            "connection torn down"
        );
        self.reap(stale);
    }

    /// Pushes `frame` to every connected resource of `user`, optionally
    /// skipping one resource. Returns how many queues accepted the frame.
    pub fn deliver_to_user(
        &self,
        user: &str,
        frame: &WsMessage,
        except_resource: Option<&str>,
    ) -> usize {
        let mut stale = Vec::new();
        let mut delivered = 0;

        for (resource, connection) in self.connections.get_all(user) {
            if except_resource == Some(resource.as_str()) {
                continue;
            }
            if self.push(&connection, frame, &mut stale) {
                delivered += 1;
            }
        }

        self.reap(stale);
        delivered
    }

    /// Pushes `frame` to one specific device. Returns `false` if the device
    /// is not connected or its queue rejected the frame.
    pub fn deliver_to_identity(&self, identity: &CompleteIdentity, frame: &WsMessage) -> bool {
        let Some(connection) = self.connections.get_one(identity) else {
            return false;
        };

        let mut stale = Vec::new();
        let delivered = self.push(&connection, frame, &mut stale);
        self.reap(stale);
        delivered
    }

    /// Pushes `frame` to every subscriber of a content topic except `skip`.
    /// Subscribers that no longer resolve to a connection are unsubscribed
    /// on the way.
    pub fn publish_to_topic(
        &self,
        topic: &Topic,
        frame: &WsMessage,
        skip: Option<&CompleteIdentity>,
    ) -> usize {
        let mut stale = Vec::new();
        let delivered = self.fan_out_topic(topic, frame, skip, &mut stale);
        self.reap(stale);
        delivered
    }

    pub(crate) fn fan_out_topic(
        &self,
        topic: &Topic,
        frame: &WsMessage,
        skip: Option<&CompleteIdentity>,
        stale: &mut Vec<Arc<Connection>>,
    ) -> usize {
        let mut delivered = 0;

        for subscriber in self.subscriptions.subscribers(topic) {
            let Some(connection) = self.connections.get_one(&subscriber) else {
                debug!(%topic, %subscriber, "pruning unreachable subscriber");
                self.subscriptions.unsubscribe(topic, &subscriber);
                continue;
            };

            if skip == Some(&subscriber) {
                continue;
            }
            if self.push(&connection, frame, stale) {
                delivered += 1;
            }
        }

        delivered
    }

    pub(crate) fn push(
        &self,
        connection: &Arc<Connection>,
        frame: &WsMessage,
        stale: &mut Vec<Arc<Connection>>,
    ) -> bool {
        match connection.deliver(frame.clone()) {
            Ok(()) => true,
            Err(err @ DeliveryError::Full(_)) => {
                warn!(connection = %connection.id(), "{err}");
                false
            }
            Err(err @ DeliveryError::Closed(_)) => {
                debug!(connection = %connection.id(), "{err}");
                stale.push(connection.clone());
                false
            }
        }
    }

    pub(crate) fn reap(&self, stale: Vec<Arc<Connection>>) {
        for connection in stale {
            self.teardown(&connection);
        }
    }

    pub(crate) fn transitions_guard(&self) -> MutexGuard<'_, ()> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
