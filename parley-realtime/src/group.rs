//! Tenant-scoped fan-out groups

use parley_api_types::{Role, SubjectId, TenantId};

/// Role bucket within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleBucket {
    /// Agents and admins
    Agents,
    /// End clients
    Clients,
}

impl RoleBucket {
    /// The bucket for a role; master has none
    pub fn for_role(role: Role) -> Option<RoleBucket> {
        match role {
            Role::Admin | Role::Agent => Some(RoleBucket::Agents),
            Role::Client => Some(RoleBucket::Clients),
            Role::Master => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleBucket::Agents => "agents",
            RoleBucket::Clients => "clients",
        }
    }
}

/// A fan-out group name.
///
/// Every variant except `Master` carries the owning tenant, so an emit can
/// never address users or buckets across tenants: the type has no way to
/// spell it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupId {
    /// Everyone in a tenant
    Tenant(TenantId),
    /// One role bucket of a tenant
    Bucket(TenantId, RoleBucket),
    /// One subject within a tenant
    User(TenantId, SubjectId),
    /// Master connections without a tenant
    Master,
}

impl GroupId {
    /// The tenant the group belongs to, if any
    pub fn tenant(&self) -> Option<&TenantId> {
        match self {
            GroupId::Tenant(t) | GroupId::Bucket(t, _) | GroupId::User(t, _) => Some(t),
            GroupId::Master => None,
        }
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupId::Tenant(t) => write!(f, "tenant:{}", t),
            GroupId::Bucket(t, bucket) => write!(f, "tenant:{}:{}", t, bucket.as_str()),
            GroupId::User(t, s) => write!(f, "tenant:{}:user:{}", t, s),
            GroupId::Master => write!(f, "master"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rendering() {
        let t = TenantId::from("t1");
        assert_eq!(GroupId::Tenant(t.clone()).to_string(), "tenant:t1");
        assert_eq!(
            GroupId::Bucket(t.clone(), RoleBucket::Agents).to_string(),
            "tenant:t1:agents"
        );
        assert_eq!(
            GroupId::User(t, SubjectId::from("u1")).to_string(),
            "tenant:t1:user:u1"
        );
        assert_eq!(GroupId::Master.to_string(), "master");
    }

    #[test]
    fn test_role_buckets() {
        assert_eq!(RoleBucket::for_role(Role::Admin), Some(RoleBucket::Agents));
        assert_eq!(RoleBucket::for_role(Role::Agent), Some(RoleBucket::Agents));
        assert_eq!(RoleBucket::for_role(Role::Client), Some(RoleBucket::Clients));
        assert_eq!(RoleBucket::for_role(Role::Master), None);
    }

    #[test]
    fn test_tenant_accessor() {
        let t = TenantId::from("t1");
        assert_eq!(GroupId::Tenant(t.clone()).tenant(), Some(&t));
        assert_eq!(GroupId::Master.tenant(), None);
    }
}
