//! Topic keys
//!
//! Presence topics are keyed by the watched username, content topics by an
//! externally supplied id (a poll id today). Both live in the same
//! subscription registry; the variant keeps a poll id that happens to equal a
//! username from colliding with that user's presence topic.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Presence(String),
    Content(String),
}

impl Topic {
    pub fn presence(user: impl Into<String>) -> Self {
        Topic::Presence(user.into())
    }

    pub fn content(id: impl Into<String>) -> Self {
        Topic::Content(id.into())
    }

    pub fn is_presence(&self) -> bool {
        matches!(self, Topic::Presence(_))
    }

    /// The username or content id this topic is about.
    pub fn id(&self) -> &str {
        match self {
            Topic::Presence(id) | Topic::Content(id) => id,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Presence(user) => write!(f, "presence:{user}"),
            Topic::Content(id) => write!(f, "content:{id}"),
        }
    }
}
