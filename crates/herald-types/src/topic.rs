//! Topic keys partitioning the live event stream.

use serde::{Deserialize, Serialize};

const POSTS_KEY: &str = "post";
const COMMENTS_PREFIX: &str = "comment ";

/// A partition key for lifecycle events.
///
/// There is one unscoped topic carrying every post event, and one scoped
/// topic per post carrying that post's comment events. Topics are never
/// declared up front; they exist only while somebody is subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    /// All post events.
    Posts,
    /// Comment events for a single parent post.
    Comments(i64),
}

impl Topic {
    /// Returns the parent post ID for scoped topics.
    pub fn parent_id(self) -> Option<i64> {
        match self {
            Self::Posts => None,
            Self::Comments(post_id) => Some(post_id),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Posts => f.write_str(POSTS_KEY),
            Self::Comments(post_id) => write!(f, "{COMMENTS_PREFIX}{post_id}"),
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = ParseTopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == POSTS_KEY {
            return Ok(Self::Posts);
        }
        s.strip_prefix(COMMENTS_PREFIX)
            .and_then(|id| id.parse().ok())
            .map(Self::Comments)
            .ok_or_else(|| ParseTopicError(s.to_string()))
    }
}

impl TryFrom<String> for Topic {
    type Error = ParseTopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

/// Error returned when parsing an unknown topic key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0}")]
pub struct ParseTopicError(pub String);
