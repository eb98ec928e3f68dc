//! Token minting and verification

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parley_api_types::{ApiError, Role, SubjectId, TenantId};
use parley_config::domains::auth::CURRENT_TOKEN_VERSION;
use parley_config::{AuthConfig, TenancyConfig};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Signed token claims.
///
/// From `token_version` 2 onward, non-master subjects carry their tenant in
/// the token; version-1 tokens predate the claim and are accepted only under
/// the migration grace policy, with tenant resolution deferred to the
/// identity store.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user) id
    pub sub: String,
    /// Subject role
    pub role: Role,
    /// Tenant binding; absent for master and for legacy tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Tenant key enrichment for clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_key: Option<String>,
    /// Claim layout version
    pub token_version: u32,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl TokenClaims {
    pub fn subject_id(&self) -> SubjectId {
        SubjectId::from(self.sub.as_str())
    }

    pub fn tenant(&self) -> Option<TenantId> {
        self.tenant_id.as_deref().map(TenantId::from)
    }
}

/// Token manager bound to the signing configuration and migration policy
pub struct TokenService {
    auth: AuthConfig,
    allow_legacy_tokens: bool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    legacy_accepts: AtomicU64,
}

impl TokenService {
    pub fn new(auth: AuthConfig, tenancy: &TenancyConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(auth.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(auth.secret.as_ref());

        Self {
            auth,
            allow_legacy_tokens: tenancy.allow_legacy_tokens,
            encoding_key,
            decoding_key,
            legacy_accepts: AtomicU64::new(0),
        }
    }

    /// Mint a current-version token for a subject
    pub fn mint(
        &self,
        subject: &SubjectId,
        role: Role,
        tenant: Option<&TenantId>,
        tenant_key: Option<&str>,
    ) -> Result<String, ApiError> {
        if !role.is_master() && tenant.is_none() {
            return Err(ApiError::invalid_token(
                "non-master tokens require a tenant binding",
            ));
        }

        let now = Utc::now();
        let exp = now + chrono::Duration::from_std(self.auth.token_ttl).unwrap_or_default();

        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            tenant_id: tenant.map(|t| t.to_string()),
            tenant_key: tenant_key.map(|k| k.to_string()),
            token_version: CURRENT_TOKEN_VERSION,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.auth.issuer.clone(),
            aud: self.auth.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::invalid_token(format!("failed to sign token: {}", e)))
    }

    /// Verify and decode a token, enforcing the version policy
    pub fn verify(&self, token: &str) -> Result<TokenClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.auth.issuer]);
        validation.set_audience(&[&self.auth.audience]);

        let token_data =
            decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::token_expired(),
                    _ => {
                        warn!("token verification failed: {}", e);
                        ApiError::invalid_token("Invalid token")
                    }
                }
            })?;

        let claims = token_data.claims;

        if claims.token_version < 2 {
            if !self.allow_legacy_tokens {
                warn!(subject = %claims.sub, "rejected legacy token");
                return Err(ApiError::invalid_token("Legacy token is no longer accepted"));
            }
            // Every acceptance is counted so operators can see when cutover is safe
            let total = self.legacy_accepts.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                subject = %claims.sub,
                total_accepted = total,
                "legacy_token_accepted"
            );
        } else if !claims.role.is_master() && claims.tenant_id.is_none() {
            warn!(subject = %claims.sub, "version-2 token missing tenant claim");
            return Err(ApiError::invalid_token("Token missing tenant claim"));
        }

        debug!(subject = %claims.sub, role = %claims.role, "token verified");
        Ok(claims)
    }

    /// Number of legacy tokens accepted since start
    pub fn legacy_accept_count(&self) -> u64 {
        self.legacy_accepts.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(allow_legacy: bool) -> TokenService {
        let auth = AuthConfig {
            secret: "test-secret-key".to_string(),
            ..Default::default()
        };
        let tenancy = TenancyConfig {
            allow_legacy_tokens: allow_legacy,
            ..Default::default()
        };
        TokenService::new(auth, &tenancy)
    }

    fn legacy_token(service: &TokenService, tenant_id: Option<&str>) -> String {
        // Hand-build a version-1 claim set with the same signing key
        let now = Utc::now();
        let claims = TokenClaims {
            sub: "u1".to_string(),
            role: Role::Agent,
            tenant_id: tenant_id.map(|t| t.to_string()),
            tenant_key: None,
            token_version: 1,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iss: service.auth.issuer.clone(),
            aud: service.auth.audience.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &service.encoding_key,
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let service = service(false);
        let token = service
            .mint(
                &SubjectId::from("u1"),
                Role::Agent,
                Some(&TenantId::from("t1")),
                Some("acme"),
            )
            .unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.tenant_id.as_deref(), Some("t1"));
        assert_eq!(claims.tenant_key.as_deref(), Some("acme"));
        assert_eq!(claims.token_version, CURRENT_TOKEN_VERSION);
    }

    #[test]
    fn test_mint_requires_tenant_for_non_master() {
        let service = service(false);
        assert!(service
            .mint(&SubjectId::from("u1"), Role::Agent, None, None)
            .is_err());
        // Master mints without tenant
        assert!(service
            .mint(&SubjectId::from("m1"), Role::Master, None, None)
            .is_ok());
    }

    #[test]
    fn test_legacy_rejected_without_grace() {
        let service = service(false);
        let token = legacy_token(&service, None);
        let err = service.verify(&token).unwrap_err();
        assert_eq!(err.code, parley_api_types::ErrorCode::InvalidToken);
        assert_eq!(service.legacy_accept_count(), 0);
    }

    #[test]
    fn test_legacy_accepted_under_grace_and_counted() {
        let service = service(true);
        let token = legacy_token(&service, None);
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.token_version, 1);
        assert!(claims.tenant_id.is_none());
        assert_eq!(service.legacy_accept_count(), 1);
    }

    #[test]
    fn test_v2_non_master_without_tenant_rejected() {
        let service = service(true);
        let now = Utc::now();
        let claims = TokenClaims {
            sub: "u1".to_string(),
            role: Role::Agent,
            tenant_id: None,
            tenant_key: None,
            token_version: 2,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iss: service.auth.issuer.clone(),
            aud: service.auth.audience.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &service.encoding_key,
        )
        .unwrap();

        let err = service.verify(&token).unwrap_err();
        assert_eq!(err.code, parley_api_types::ErrorCode::InvalidToken);
    }

    #[test]
    fn test_expired_token_is_typed() {
        let service = service(false);
        let now = Utc::now();
        let claims = TokenClaims {
            sub: "u1".to_string(),
            role: Role::Agent,
            tenant_id: Some("t1".to_string()),
            tenant_key: None,
            token_version: 2,
            iat: (now - chrono::Duration::hours(2)).timestamp(),
            exp: (now - chrono::Duration::hours(1)).timestamp(),
            iss: service.auth.issuer.clone(),
            aud: service.auth.audience.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &service.encoding_key,
        )
        .unwrap();

        let err = service.verify(&token).unwrap_err();
        assert_eq!(err.code, parley_api_types::ErrorCode::TokenExpired);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service_a = service(false);
        let mut auth = AuthConfig::default();
        auth.secret = "other-secret".to_string();
        let service_b = TokenService::new(auth, &TenancyConfig::default());

        let token = service_a
            .mint(
                &SubjectId::from("u1"),
                Role::Agent,
                Some(&TenantId::from("t1")),
                None,
            )
            .unwrap();
        assert!(service_b.verify(&token).is_err());
    }
}
