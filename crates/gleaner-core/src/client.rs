//! Remote-call surface consumed by the scheduling engine.
//!
//! Wire encoding, the call transport, and session management are
//! external collaborators; the engine only sees the [`FarmClient`]
//! trait. Every call is fallible and must be treated as unsafe to
//! blindly retry -- the batch executor isolates retries to a single
//! per-item fallback attempt.
//!
//! Implementations must surface the server's quota tuples on every
//! reply that carries them, so the tracker can stay close to the
//! authoritative counters.

use async_trait::async_trait;

use gleaner_types::{ActionKind, FarmView, LandId, PrecheckVerdict, QuotaReport, Target, UserId};

/// Errors surfaced by the remote-call layer.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The call never produced a usable reply (network or protocol
    /// failure).
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered but rejected the request outright.
    #[error("server rejected call (code {code}): {message}")]
    Rejected {
        /// Server-side rejection code.
        code: u32,
        /// Server-provided rejection message.
        message: String,
    },
}

/// A reply to an action execution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReply {
    /// Whether the server accepted and applied the action.
    pub ok: bool,
    /// Server-provided message, used for diagnostics only.
    pub message: String,
    /// Authoritative quota tuples piggybacked on the reply, if any.
    pub quota_reports: Vec<QuotaReport>,
}

impl CallReply {
    /// A bare success reply with no quota payload.
    pub const fn ok() -> Self {
        Self {
            ok: true,
            message: String::new(),
            quota_reports: Vec::new(),
        }
    }
}

/// The abstracted game-server call surface.
///
/// All methods suspend the single cooperative flow until a reply
/// arrives or fails; the engine never fans out calls in parallel.
#[async_trait]
pub trait FarmClient: Send + Sync {
    /// Fetch the current friend list with preview-signal summaries.
    async fn fetch_targets(&self) -> Result<Vec<Target>, RpcError>;

    /// Enter a friend's farm, yielding the land snapshots and any
    /// quota reports carried by the reply.
    async fn enter_farm(&self, target: UserId) -> Result<FarmView, RpcError>;

    /// Leave a previously entered farm. Callers treat this as
    /// best-effort cleanup and swallow failures.
    async fn leave_farm(&self, target: UserId) -> Result<(), RpcError>;

    /// Ask the server whether an action is currently permitted, before
    /// committing to a batch call.
    async fn precheck(&self, kind: ActionKind, target: UserId)
    -> Result<PrecheckVerdict, RpcError>;

    /// Apply an action to the given land plots on a target's farm.
    ///
    /// One method covers both forms: the batch call passes the full id
    /// list, the per-item fallback passes a single id.
    async fn execute(
        &self,
        kind: ActionKind,
        target: UserId,
        lands: &[LandId],
    ) -> Result<CallReply, RpcError>;
}
