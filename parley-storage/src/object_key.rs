//! Tenant-prefixed object storage keys
//!
//! Object keys follow
//! `tenants/{tenant}/{env}/{file_type}/{YYYY}/{MM}/{name}-{timestamp}-{rand}.{ext}`.
//! Every access check verifies the caller's tenant against the key prefix
//! before a signed URL is issued or a read/write/delete is performed.

use chrono::{Datelike, Utc};
use parley_api_types::{ApiError, TenantId};

use crate::error::{StorageError, StorageResult};

/// A validated object storage key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Build a key for a new object owned by `tenant`
    pub fn build(
        tenant: &TenantId,
        env: &str,
        file_type: &str,
        name: &str,
        ext: &str,
        max_name_len: usize,
    ) -> Self {
        let now = Utc::now();
        let sanitized = sanitize_name(name, max_name_len);
        let uniq = format!("{}-{:08x}", now.timestamp_millis(), fastrand::u32(..));
        Self(format!(
            "tenants/{}/{}/{}/{:04}/{:02}/{}-{}.{}",
            tenant,
            env,
            file_type,
            now.year(),
            now.month(),
            sanitized,
            uniq,
            ext.trim_start_matches('.').to_lowercase(),
        ))
    }

    /// Accept an existing key string after verifying it belongs to `tenant`
    pub fn verify(key: &str, tenant: &TenantId) -> StorageResult<Self> {
        let prefix = format!("tenants/{}/", tenant);
        if key.starts_with(&prefix) {
            Ok(Self(key.to_string()))
        } else {
            Err(StorageError::from(ApiError::cross_tenant_denied()))
        }
    }

    /// The tenant segment of any well-formed key
    pub fn tenant_of(key: &str) -> Option<TenantId> {
        let rest = key.strip_prefix("tenants/")?;
        let (tenant, _) = rest.split_once('/')?;
        if tenant.is_empty() {
            return None;
        }
        Some(TenantId::from(tenant))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase, keep the URL-safe alphabet, bound the length
fn sanitize_name(name: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(name.len().min(max_len));
    for c in name.chars().flat_map(|c| c.to_lowercase()) {
        if out.len() >= max_len {
            break;
        }
        match c {
            'a'..='z' | '0'..='9' | '.' | '_' | '-' => out.push(c),
            ' ' => out.push('-'),
            _ => {}
        }
    }
    // Never emit an empty segment
    if out.is_empty() {
        out.push_str("file");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_api_types::ErrorCode;

    #[test]
    fn test_key_layout() {
        let key = ObjectKey::build(
            &TenantId::from("t1"),
            "production",
            "attachment",
            "Invoice March.PDF",
            "pdf",
            64,
        );
        let parts: Vec<&str> = key.as_str().split('/').collect();
        assert_eq!(parts[0], "tenants");
        assert_eq!(parts[1], "t1");
        assert_eq!(parts[2], "production");
        assert_eq!(parts[3], "attachment");
        assert_eq!(parts[4].len(), 4); // year
        assert_eq!(parts[5].len(), 2); // month
        assert!(parts[6].starts_with("invoice-march.pdf-"));
        assert!(parts[6].ends_with(".pdf"));
    }

    #[test]
    fn test_verify_prefix() {
        let t1 = TenantId::from("t1");
        assert!(ObjectKey::verify("tenants/t1/production/attachment/2026/08/a-1.pdf", &t1).is_ok());

        let err =
            ObjectKey::verify("tenants/t2/production/attachment/2026/08/a-1.pdf", &t1).unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::CrossTenantDenied);

        // A prefix-shaped tenant must not pass (t1 vs t10)
        let err = ObjectKey::verify("tenants/t10/production/a/2026/08/a-1.pdf", &t1).unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::CrossTenantDenied);
    }

    #[test]
    fn test_tenant_of() {
        assert_eq!(
            ObjectKey::tenant_of("tenants/t1/production/a/2026/08/a-1.pdf"),
            Some(TenantId::from("t1"))
        );
        assert_eq!(ObjectKey::tenant_of("uploads/t1/a.pdf"), None);
        assert_eq!(ObjectKey::tenant_of("tenants/"), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_name("Hello World.png", 64), "hello-world.png");
        assert_eq!(sanitize_name("../../etc/passwd", 64), "....etcpasswd");
        assert_eq!(sanitize_name("日本語", 64), "file");
        assert_eq!(sanitize_name("abcdef", 3), "abc");
    }
}
