//! Subscription admission.

use herald_types::{AuthContext, Topic, Visible};

use crate::bus::{Bus, Subscription};

/// Resolves the parent entity a scoped topic hangs off.
pub trait ParentLookup {
    type Parent: Visible;
    type Error;

    /// Returns the parent's current state, or `None` if it does not exist.
    fn resolve(&self, parent_id: i64) -> Result<Option<Self::Parent>, Self::Error>;
}

/// Reasons a subscription is refused.
#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    /// The parent is missing or not visible. The two cases are deliberately
    /// indistinguishable.
    #[error("subscription target not found")]
    NotFound,

    /// The parent lookup itself failed.
    #[error("parent lookup failed: {0}")]
    Lookup(E),
}

/// Validates a subscription request and, if admitted, registers a channel.
///
/// Scoped topics require the parent to exist and be visible right now; on
/// refusal no channel is allocated. The unscoped topic is always admitted.
/// `auth` is carried for per-item restrictions; whether anonymous callers may
/// subscribe at all is decided by the serving layer before this runs.
///
/// # Errors
///
/// Returns `GateError::NotFound` for a missing or hidden parent and
/// `GateError::Lookup` if the lookup fails.
pub fn open_subscription<L: ParentLookup>(
    bus: &Bus,
    lookup: &L,
    topic: Topic,
    auth: AuthContext,
) -> Result<Subscription, GateError<L::Error>> {
    if let Some(parent_id) = topic.parent_id() {
        let visible = lookup
            .resolve(parent_id)
            .map_err(GateError::Lookup)?
            .is_some_and(|parent| parent.is_visible());

        if !visible {
            tracing::debug!(%topic, user = ?auth.user_id(), "subscription refused");
            return Err(GateError::NotFound);
        }
    }

    Ok(bus.subscribe(topic))
}
