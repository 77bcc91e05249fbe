//! Connection registry
//!
//! `user -> resource -> Arc<Connection>`, the single authority on who is
//! online where. A user key exists only while it maps to at least one
//! resource.
//!
//! Lookups return the latest observed state. A connection handed out here
//! may already be closing by the time the caller pushes to it; delivery
//! failures are handled by the hub, not treated as fatal.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{CompleteIdentity, Connection};

pub type ResourceList = HashMap<String, Arc<Connection>>;

/// Outcome of `ConnectionRegistry::add`.
#[derive(Debug)]
pub struct Registration {
    /// The user had no other resource connected before this one.
    pub first_for_user: bool,
    /// A different connection previously held the same `user@resource`.
    pub displaced: Option<Arc<Connection>>,
}

/// Outcome of `ConnectionRegistry::remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The slot is empty or held by another connection; nothing changed.
    NotRegistered,
    Removed { last_for_user: bool },
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<String, ResourceList>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the connection under its own identity, overwriting whatever
    /// held that slot.
    pub fn add(&self, connection: Arc<Connection>) -> Registration {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        let user = connection.user().to_string();
        let resource = connection.resource().to_string();

        let first_for_user = !clients.contains_key(&user);
        let displaced = clients
            .entry(user)
            .or_default()
            .insert(resource, connection.clone())
            .filter(|previous| !Arc::ptr_eq(previous, &connection));

        Registration {
            first_for_user,
            displaced,
        }
    }

    /// Removes the connection only if it is the one currently registered for
    /// its identity. A stale connection cleaning up late must not evict a
    /// newer connection that took over the same resource.
    pub fn remove(&self, connection: &Arc<Connection>) -> Removal {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        let user = connection.user();

        let Some(resources) = clients.get_mut(user) else {
            return Removal::NotRegistered;
        };

        match resources.get(connection.resource()) {
            Some(current) if Arc::ptr_eq(current, connection) => {}
            _ => return Removal::NotRegistered,
        }

        resources.remove(connection.resource());
        let last_for_user = resources.is_empty();
        if last_for_user {
            clients.remove(user);
        }

        Removal::Removed { last_for_user }
    }

    pub fn get_one(&self, identity: &CompleteIdentity) -> Option<Arc<Connection>> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients
            .get(identity.user())
            .and_then(|resources| resources.get(identity.resource()))
            .cloned()
    }

    /// Snapshot of every connected resource of `user`; empty when offline.
    pub fn get_all(&self, user: &str) -> ResourceList {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.get(user).cloned().unwrap_or_default()
    }

    pub fn is_online(&self, user: &str) -> bool {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.contains_key(user)
    }

    pub fn user_count(&self) -> usize {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.len()
    }

    pub fn connection_count(&self) -> usize {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.values().map(HashMap::len).sum()
    }
}
