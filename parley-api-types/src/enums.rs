use serde::{Deserialize, Serialize};

/// Unified enums shared by the HTTP and realtime surfaces

/// Subject role.
///
/// `Master` is an administrative identity not bound to any tenant; every
/// other role carries a tenant binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Admin,
    Agent,
    Client,
}

impl Role {
    /// Whether this role operates unscoped across tenants
    pub fn is_master(&self) -> bool {
        matches!(self, Role::Master)
    }

    /// Whether this role lands in the agent-side realtime bucket
    pub fn is_agent_side(&self) -> bool {
        matches!(self, Role::Admin | Role::Agent)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Master => "master",
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Client => "client",
        };
        write!(f, "{}", s)
    }
}

/// Billing-driven subscription state of a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Suspended,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    /// Whether the subscription permits normal operation
    pub fn is_operational(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

/// Realtime handshake rejection reasons.
///
/// The wire strings are stable and returned verbatim to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    #[serde(rename = "authentication-required")]
    AuthenticationRequired,
    #[serde(rename = "invalid-token")]
    InvalidToken,
    #[serde(rename = "user-not-found")]
    UserNotFound,
    #[serde(rename = "tenant-not-identified")]
    TenantNotIdentified,
    #[serde(rename = "tenant-suspended")]
    TenantSuspended,
    #[serde(rename = "access-denied-cross-tenant")]
    AccessDeniedCrossTenant,
}

impl RejectionReason {
    /// The verbatim wire string for this reason
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::AuthenticationRequired => "authentication-required",
            RejectionReason::InvalidToken => "invalid-token",
            RejectionReason::UserNotFound => "user-not-found",
            RejectionReason::TenantNotIdentified => "tenant-not-identified",
            RejectionReason::TenantSuspended => "tenant-suspended",
            RejectionReason::AccessDeniedCrossTenant => "access-denied-cross-tenant",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
