//! Lifecycle event values delivered to subscribers.

use serde::{Deserialize, Serialize};

use crate::{CommentSnapshot, PostSnapshot, Topic};

/// What happened to an entity, from an observer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The entity became observable.
    Created,
    /// An observable entity changed.
    Updated,
    /// The entity stopped being observable.
    Deleted,
}

impl EventKind {
    /// Returns the canonical string label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity state carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntitySnapshot {
    Post(PostSnapshot),
    Comment(CommentSnapshot),
}

impl From<PostSnapshot> for EntitySnapshot {
    fn from(post: PostSnapshot) -> Self {
        Self::Post(post)
    }
}

impl From<CommentSnapshot> for EntitySnapshot {
    fn from(comment: CommentSnapshot) -> Self {
        Self::Comment(comment)
    }
}

/// An externally visible creation, update, or deletion.
///
/// Fields are private: once built, an event is never mutated. The bus shares
/// one instance read-only with every subscriber of its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    topic: Topic,
    #[serde(rename = "mutation")]
    kind: EventKind,
    #[serde(rename = "data")]
    snapshot: EntitySnapshot,
}

impl LifecycleEvent {
    pub fn new(topic: Topic, kind: EventKind, snapshot: impl Into<EntitySnapshot>) -> Self {
        Self {
            topic,
            kind,
            snapshot: snapshot.into(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn snapshot(&self) -> &EntitySnapshot {
        &self.snapshot
    }
}
