//! Lifecycle event derivation.
//!
//! The externally visible lifecycle is a strict subset of the storage history:
//! only transitions that cross the visibility boundary, or that touch an
//! already visible entity, are announced.

use herald_types::{
    Change, CommentSnapshot, EntitySnapshot, EventKind, LifecycleEvent, PostSnapshot, Topic,
    Visible,
};

/// Derives the event for an entity that carries its own visibility flag.
///
/// | before | after | event |
/// |--------|-------|-------|
/// | absent | hidden | none |
/// | absent | visible | `CREATED(after)` |
/// | hidden | hidden | none |
/// | hidden | visible | `CREATED(after)` |
/// | visible | visible | `UPDATED(after)` |
/// | visible | hidden | `DELETED(before)` |
/// | hidden | absent | none |
/// | visible | absent | `DELETED(before)` |
///
/// A hide is reported with the pre-hiding snapshot: observers never saw the
/// entity hidden, so the last state they saw is the one being removed.
pub fn derive_visible<S>(topic: Topic, change: Change<S>) -> Option<LifecycleEvent>
where
    S: Visible + Into<EntitySnapshot>,
{
    let (kind, snapshot) = match (change.before, change.after) {
        (None, None) => {
            tracing::debug!(%topic, "empty change, nothing to derive");
            return None;
        }
        (None, Some(after)) => (EventKind::Created, after),
        (Some(before), None) => (EventKind::Deleted, before),
        (Some(before), Some(after)) => match (before.is_visible(), after.is_visible()) {
            (false, _) => (EventKind::Created, after),
            (true, true) => (EventKind::Updated, after),
            (true, false) => (EventKind::Deleted, before),
        },
    };

    // Every arm above picked the snapshot whose visibility decides the outcome.
    snapshot
        .is_visible()
        .then(|| LifecycleEvent::new(topic, kind, snapshot))
}

/// Derives the event for an entity observable only through its parent.
///
/// Creations, updates, and deletions are announced one-for-one while the
/// parent is visible, and suppressed entirely otherwise.
pub fn derive_scoped<S>(
    topic: Topic,
    change: Change<S>,
    parent_visible: bool,
) -> Option<LifecycleEvent>
where
    S: Into<EntitySnapshot>,
{
    if !parent_visible {
        tracing::debug!(%topic, "parent hidden, change not announced");
        return None;
    }

    let (kind, snapshot) = match (change.before, change.after) {
        (None, None) => return None,
        (None, Some(after)) => (EventKind::Created, after),
        (Some(_), Some(after)) => (EventKind::Updated, after),
        (Some(before), None) => (EventKind::Deleted, before),
    };

    Some(LifecycleEvent::new(topic, kind, snapshot))
}

/// Derives the `post` topic event for a post mutation.
pub fn derive_post(change: Change<PostSnapshot>) -> Option<LifecycleEvent> {
    derive_visible(Topic::Posts, change)
}

/// Derives the parent-scoped event for a comment mutation.
///
/// `parent_visible` must reflect the parent post at the moment of the
/// mutation.
pub fn derive_comment(
    change: Change<CommentSnapshot>,
    parent_visible: bool,
) -> Option<LifecycleEvent> {
    let post_id = change.after.as_ref().or(change.before.as_ref())?.post_id;
    derive_scoped(Topic::Comments(post_id), change, parent_visible)
}
