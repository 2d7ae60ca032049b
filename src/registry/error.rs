use crate::registry::code::CodeSpaceExhausted;
use crate::registry::session::LifecycleState;
use crate::stores::StoreUnavailable;

/// Failure taxonomy of the active-session registry.
///
/// Every variant leaves no partial mutation visible: an operation either
/// commits fully (durable write-through first, where required) or the
/// in-memory state is exactly what it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Unknown session id or code. Also used where the session exists but
    /// the caller may not learn that.
    #[error("session not found")]
    NotFound,
    /// Join rejected: the session is no longer accepting players.
    #[error("session has already started")]
    AlreadyStarted,
    /// A player with the same principal id is already on the roster. A
    /// distinct signal (not a silent no-op) so callers can decide between
    /// reconnect and reject.
    #[error("player is already in the session")]
    DuplicatePlayer,
    /// Illegal lifecycle edge; state is unchanged.
    #[error("illegal transition from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// Eviction requested for a session that has not finished.
    #[error("session has not finished")]
    NotFinished,
    /// The bounded allocation retry budget ran out; retryable.
    #[error(transparent)]
    CodeSpaceExhausted(#[from] CodeSpaceExhausted),
    /// Answer payload rejected (unknown player, bad slide index, or the
    /// session is not in play).
    #[error("{0}")]
    InvalidAnswer(String),
    /// Durable store unreachable; the triggering operation fails closed and
    /// may be retried.
    #[error("durable store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl From<StoreUnavailable> for RegistryError {
    fn from(err: StoreUnavailable) -> Self {
        Self::Unavailable(err.0)
    }
}
