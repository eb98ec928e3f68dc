//! Connection identity and lifecycle state

use parley_api_types::{Role, SubjectId, TenantId};
use uuid::Uuid;

/// Opaque connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the hub knows about an authenticated connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub tenant: Option<TenantId>,
    pub subject: SubjectId,
    pub role: Role,
}

/// Connection lifecycle.
///
/// `Connecting → (Authenticated | Rejected) → (Active ⇄ Paused) → Closed`.
/// `Authenticated → Active` happens once group membership is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Rejected,
    Active,
    Paused,
    Closed,
}

impl ConnectionState {
    /// Whether the transition is legal
    pub fn can_transition(self, to: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, to),
            (Connecting, Authenticated)
                | (Connecting, Rejected)
                | (Authenticated, Active)
                | (Active, Paused)
                | (Paused, Active)
                | (Authenticated, Closed)
                | (Active, Closed)
                | (Paused, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Rejected | ConnectionState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn test_legal_lifecycle() {
        assert!(Connecting.can_transition(Authenticated));
        assert!(Connecting.can_transition(Rejected));
        assert!(Authenticated.can_transition(Active));
        assert!(Active.can_transition(Paused));
        assert!(Paused.can_transition(Active));
        assert!(Active.can_transition(Closed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Connecting.can_transition(Active));
        assert!(!Rejected.can_transition(Authenticated));
        assert!(!Closed.can_transition(Active));
        assert!(!Paused.can_transition(Authenticated));
    }

    #[test]
    fn test_terminal_states() {
        assert!(Rejected.is_terminal());
        assert!(Closed.is_terminal());
        assert!(!Active.is_terminal());
    }
}
