//! `user@resource` identities.
//!
//! A user may hold several simultaneous connections, one per device. Each
//! device picks (or is assigned) a resource string; the pair is the unit the
//! connection registry and the subscription registry key on.

use std::fmt;

use uuid::Uuid;

const SEPARATOR: char = '@';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompleteIdentity {
    user: String,
    resource: String,
}

impl CompleteIdentity {
    /// Builds an identity, rejecting empty parts and parts that contain the
    /// separator (they would not parse back).
    pub fn new(user: impl Into<String>, resource: impl Into<String>) -> Option<Self> {
        let user = user.into();
        let resource = resource.into();
        if !is_valid_part(&user) || !is_valid_part(&resource) {
            return None;
        }
        Some(Self { user, resource })
    }

    /// Parses `user@resource`. Anything other than exactly two non-empty
    /// parts is malformed.
    pub fn parse(complete: &str) -> Option<Self> {
        let mut parts = complete.split(SEPARATOR);
        let user = parts.next()?;
        let resource = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(user, resource)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for CompleteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.user, SEPARATOR, self.resource)
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty() && !part.contains(SEPARATOR)
}

/// Opaque device identifier handed out when a client does not bring its own.
pub fn random_resource() -> String {
    Uuid::new_v4().simple().to_string()
}
