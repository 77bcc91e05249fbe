//! Connection handle
//!
//! `Connection` is the shared half of one live websocket: the registry, the
//! dispatcher and the presence service hold `Arc<Connection>` and push frames
//! into its bounded outbound queue, while the pump owns the receiving half
//! and the socket itself.
//!
//! Delivery never awaits. A full queue drops the frame for this recipient so
//! a slow consumer cannot stall anyone else's dispatch path; a closed queue
//! means the write loop is gone and the caller should run removal again.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::sync::watch;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::client::identity::CompleteIdentity;
use crate::hub::Topic;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue of {0} is full, frame dropped")]
    Full(CompleteIdentity),
    #[error("outbound queue of {0} is closed")]
    Closed(CompleteIdentity),
}

#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    identity: CompleteIdentity,
    sender: Sender<WsMessage>,
    subscriptions: Mutex<HashSet<Topic>>,
    torn_down: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl Connection {
    pub fn new(identity: CompleteIdentity, sender: Sender<WsMessage>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            identity,
            sender,
            subscriptions: Mutex::new(HashSet::new()),
            torn_down: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Creates a shared handle together with the receiving end of its
    /// outbound queue.
    pub fn channel(identity: CompleteIdentity, capacity: usize) -> (Arc<Self>, Receiver<WsMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self::new(identity, tx)), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &CompleteIdentity {
        &self.identity
    }

    pub fn user(&self) -> &str {
        self.identity.user()
    }

    pub fn resource(&self) -> &str {
        self.identity.resource()
    }

    pub fn deliver(&self, frame: WsMessage) -> Result<(), DeliveryError> {
        match self.sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::Full(self.identity.clone())),
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed(self.identity.clone())),
        }
    }

    pub fn add_subscription(&self, topic: Topic) {
        self.subscriptions_guard().insert(topic);
    }

    pub fn remove_subscription(&self, topic: &Topic) {
        self.subscriptions_guard().remove(topic);
    }

    pub fn subscriptions(&self) -> Vec<Topic> {
        self.subscriptions_guard().iter().cloned().collect()
    }

    pub fn take_subscriptions(&self) -> HashSet<Topic> {
        std::mem::take(&mut *self.subscriptions_guard())
    }

    pub fn adopt_subscriptions(&self, topics: HashSet<Topic>) {
        self.subscriptions_guard().extend(topics);
    }

    /// Returns `true` exactly once: for the first caller that starts
    /// tearing this connection down.
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Tells both pump loops to stop. The write loop answers with a close
    /// frame.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    fn subscriptions_guard(&self) -> std::sync::MutexGuard<'_, HashSet<Topic>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
