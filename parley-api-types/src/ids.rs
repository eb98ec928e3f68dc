use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque tenant identifier.
///
/// Tenant ids are globally unique and treated as opaque strings throughout
/// the kernel; nothing is ever derived from their contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    /// Mint a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get as string (always available)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque subject (user) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// URL-safe tenant key.
///
/// Keys are lowercase ASCII `[a-z0-9._-]+` and map 1:1 to a tenant id. The
/// historical `slug` field shares this format and is accepted wherever a key
/// is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    /// Parse and validate a tenant key.
    ///
    /// Returns `None` when the input is empty or contains characters outside
    /// the permitted lowercase URL-safe alphabet.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > 64 {
            return None;
        }
        if s.bytes().all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-')) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_key_accepts_url_safe_lowercase() {
        assert!(TenantKey::parse("acme").is_some());
        assert!(TenantKey::parse("acme-support.eu_1").is_some());
    }

    #[test]
    fn test_tenant_key_rejects_invalid() {
        assert!(TenantKey::parse("").is_none());
        assert!(TenantKey::parse("Acme").is_none());
        assert!(TenantKey::parse("acme corp").is_none());
        assert!(TenantKey::parse("acme/evil").is_none());
        assert!(TenantKey::parse(&"a".repeat(65)).is_none());
    }

    #[test]
    fn test_tenant_id_is_opaque() {
        let id = TenantId::from("t1");
        assert_eq!(id.as_str(), "t1");
        assert_eq!(id.to_string(), "t1");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = TenantId::from("t1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"t1\"");
        let back: TenantId = serde_json::from_str("\"t1\"").unwrap();
        assert_eq!(back, id);
    }
}
