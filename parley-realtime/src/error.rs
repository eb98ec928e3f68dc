//! Realtime error types and rejection mapping

use parley_api_types::{ApiError, ErrorCode, RejectionReason};
use parley_tenancy::TenancyError;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Result type for hub operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors surfaced by the realtime hub
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Handshake failed; the reason string goes to the client verbatim and
    /// the transport is dropped
    #[error("handshake rejected: {0}")]
    Rejected(RejectionReason),

    /// An inbound frame violated the tenant boundary
    #[error(transparent)]
    Denied(#[from] ApiError),

    /// Operation referenced a connection the hub no longer tracks
    #[error("connection not found")]
    UnknownConnection,

    /// Lifecycle violation
    #[error("illegal connection state transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// Map a tenancy failure onto the closed set of handshake rejection reasons
pub fn rejection_for(err: &TenancyError) -> RejectionReason {
    match err.api_error() {
        Some(api) => match api.code {
            ErrorCode::NoToken => RejectionReason::AuthenticationRequired,
            ErrorCode::InvalidToken | ErrorCode::TokenExpired => RejectionReason::InvalidToken,
            ErrorCode::UserNotFound | ErrorCode::AccountDisabled => RejectionReason::UserNotFound,
            ErrorCode::TenantRequired | ErrorCode::TenantNotFound => {
                RejectionReason::TenantNotIdentified
            }
            ErrorCode::TenantSuspended
            | ErrorCode::SubscriptionSuspended
            | ErrorCode::SubscriptionExpired => RejectionReason::TenantSuspended,
            ErrorCode::CrossTenantDenied | ErrorCode::InsufficientRole => {
                RejectionReason::AccessDeniedCrossTenant
            }
            // Admission-type failures do not occur during a handshake;
            // treat any stray code as a tenant-identification failure
            _ => RejectionReason::TenantNotIdentified,
        },
        None => RejectionReason::TenantNotIdentified,
    }
}
