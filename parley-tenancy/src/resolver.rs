//! Deterministic tenant resolution
//!
//! Maps an [`IdentityEnvelope`] to exactly one tenant, a master/unscoped
//! outcome, or a typed failure. The source priority is total, so the same
//! envelope always resolves the same way; `resolved_by` records which source
//! won for audit and telemetry.

use parley_api_types::{ApiError, SubscriptionStatus, TenantId};
use parley_config::{SuspendedPolicy, TenancyConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::directory::IdentityDirectory;
use crate::error::{TenancyError, TenancyResult};
use crate::registry::TenantRegistry;
use crate::tenant::Tenant;
use crate::token::TokenClaims;

/// Hostname labels never treated as tenant subdomains
const RESERVED_SUBDOMAINS: [&str; 3] = ["www", "api", "localhost"];

/// A tenant reference before coercion: either an opaque id or a key/slug.
///
/// Everything downstream of the resolver operates on resolved [`Tenant`]
/// values; this is the only place raw identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantRef {
    Id(TenantId),
    Key(String),
}

/// Route classification driving identity and tenant requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RouteClass {
    /// No identity, no tenant (login, register, health, billing webhooks)
    Public,
    /// Identity required, tenant optional
    IdentityOnly,
    /// Identity and tenant required
    #[default]
    TenantScoped,
    /// Master identity required
    MasterOnly,
}

/// The mechanism that chose the tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedBy {
    Subject,
    HeaderId,
    HeaderKey,
    Subdomain,
    Domain,
    Query,
    FallbackDefault,
    MasterOverride,
}

impl ResolvedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedBy::Subject => "subject",
            ResolvedBy::HeaderId => "header-id",
            ResolvedBy::HeaderKey => "header-key",
            ResolvedBy::Subdomain => "subdomain",
            ResolvedBy::Domain => "domain",
            ResolvedBy::Query => "query",
            ResolvedBy::FallbackDefault => "fallback-default",
            ResolvedBy::MasterOverride => "master-override",
        }
    }
}

/// Everything the resolver may consult, in one value.
///
/// Built by the HTTP layer from headers/host/query and by the realtime hub
/// from the handshake bag. `claims` may be absent for public routes and for
/// CORS preflights, which still need tenant resolution from host or headers.
#[derive(Debug, Clone, Default)]
pub struct IdentityEnvelope {
    pub claims: Option<TokenClaims>,
    pub header_tenant_id: Option<String>,
    pub header_tenant_key: Option<String>,
    pub query_tenant_id: Option<String>,
    pub query_tenant: Option<String>,
    pub origin: Option<String>,
    pub host: Option<String>,
    pub path: String,
    pub route_class: RouteClass,
}

impl IdentityEnvelope {
    pub fn for_route(route_class: RouteClass, path: impl Into<String>) -> Self {
        Self {
            route_class,
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Resolution outcome
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tenant: Option<Tenant>,
    pub resolved_by: Option<ResolvedBy>,
    pub is_master: bool,
    /// Set when the subscription policy admits the request in limited mode
    pub limited: bool,
}

impl Resolution {
    fn master_unscoped() -> Self {
        Self {
            tenant: None,
            resolved_by: None,
            is_master: true,
            limited: false,
        }
    }

    fn unscoped() -> Self {
        Self {
            tenant: None,
            resolved_by: None,
            is_master: false,
            limited: false,
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant.as_ref().map(|t| &t.id)
    }
}

/// Deterministic resolver over the registry and identity store
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
    identities: Arc<dyn IdentityDirectory>,
    config: TenancyConfig,
}

impl TenantResolver {
    pub fn new(
        registry: Arc<TenantRegistry>,
        identities: Arc<dyn IdentityDirectory>,
        config: TenancyConfig,
    ) -> Self {
        Self {
            registry,
            identities,
            config,
        }
    }

    /// Coerce a raw tenant reference into a resolved record.
    ///
    /// The single entry point for duck-typed identifiers; everything past
    /// the resolver holds a full `Tenant`.
    pub async fn coerce(&self, reference: &TenantRef) -> TenancyResult<Tenant> {
        match reference {
            TenantRef::Id(id) => self.registry.by_id(id).await,
            TenantRef::Key(key) => self.registry.by_key(key).await,
        }
    }

    /// Resolve the tenant for an envelope
    pub async fn resolve(&self, envelope: &IdentityEnvelope) -> TenancyResult<Resolution> {
        let is_master = envelope
            .claims
            .as_ref()
            .is_some_and(|c| c.role.is_master());

        if envelope.route_class == RouteClass::MasterOnly && !is_master {
            return Err(ApiError::insufficient_role("master").into());
        }

        let mut resolution = if is_master {
            self.resolve_master(envelope).await?
        } else {
            self.resolve_scoped(envelope).await?
        };

        if let Some(tenant) = &resolution.tenant {
            resolution.limited = self.validate_tenant(tenant)?;

            // A non-master identity must stay inside its own tenant
            if !resolution.is_master {
                if let Some(claimed) = envelope.claims.as_ref().and_then(|c| c.tenant()) {
                    if claimed != tenant.id {
                        debug!(claimed = %claimed, resolved = %tenant.id, "cross-tenant resolution denied");
                        return Err(ApiError::cross_tenant_denied().into());
                    }
                }
            }
        } else if envelope.route_class == RouteClass::TenantScoped {
            return Err(ApiError::tenant_required().into());
        }

        if let (Some(tenant), Some(source)) = (&resolution.tenant, resolution.resolved_by) {
            debug!(tenant_id = %tenant.id, resolved_by = source.as_str(), "tenant resolved");
        }

        Ok(resolution)
    }

    /// Master identities are unscoped unless they explicitly name a tenant
    async fn resolve_master(&self, envelope: &IdentityEnvelope) -> TenancyResult<Resolution> {
        let override_ref = if let Some(id) = &envelope.header_tenant_id {
            Some(TenantRef::Id(TenantId::from(id.as_str())))
        } else if let Some(key) = &envelope.header_tenant_key {
            Some(TenantRef::Key(key.clone()))
        } else if let Some(id) = &envelope.query_tenant_id {
            Some(TenantRef::Id(TenantId::from(id.as_str())))
        } else if let Some(key) = &envelope.query_tenant {
            Some(TenantRef::Key(key.clone()))
        } else {
            None
        };

        match override_ref {
            Some(reference) => {
                let tenant = self.coerce(&reference).await?;
                Ok(Resolution {
                    tenant: Some(tenant),
                    resolved_by: Some(ResolvedBy::MasterOverride),
                    is_master: true,
                    limited: false,
                })
            }
            None => Ok(Resolution::master_unscoped()),
        }
    }

    /// Ordered source walk for non-master identities; first hit wins
    async fn resolve_scoped(&self, envelope: &IdentityEnvelope) -> TenancyResult<Resolution> {
        // 1. Identity-bound tenant, from the claim or (legacy tokens) the
        //    identity store
        if let Some(claims) = &envelope.claims {
            if let Some(tenant_id) = claims.tenant() {
                let tenant = self.registry.by_id(&tenant_id).await?;
                return Ok(self.hit(tenant, ResolvedBy::Subject));
            }
            if claims.token_version < 2 {
                if let Some(tenant) = self.legacy_subject_tenant(claims).await? {
                    return Ok(self.hit(tenant, ResolvedBy::Subject));
                }
            }
        }

        // 2. Explicit id header
        if let Some(id) = &envelope.header_tenant_id {
            let tenant = self.registry.by_id(&TenantId::from(id.as_str())).await?;
            return Ok(self.hit(tenant, ResolvedBy::HeaderId));
        }

        // 3. Explicit key header (key or legacy slug)
        if let Some(key) = &envelope.header_tenant_key {
            let tenant = self.registry.by_key(key).await?;
            return Ok(self.hit(tenant, ResolvedBy::HeaderKey));
        }

        // 4. Host subdomain
        if let Some(host) = &envelope.host {
            if let Some(label) = subdomain_label(host) {
                if let Some(tenant) = self.lookup_key_opt(label).await? {
                    return Ok(self.hit(tenant, ResolvedBy::Subdomain));
                }
            }

            // 5. Full custom-domain match
            if let Some(tenant) = self.lookup_domain_opt(strip_port(host)).await? {
                return Ok(self.hit(tenant, ResolvedBy::Domain));
            }
        }

        // 6. Query parameter, development aid behind policy
        if self.config.allow_query_tenant {
            if let Some(id) = &envelope.query_tenant_id {
                let tenant = self.registry.by_id(&TenantId::from(id.as_str())).await?;
                return Ok(self.hit(tenant, ResolvedBy::Query));
            }
            if let Some(key) = &envelope.query_tenant {
                let tenant = self.registry.by_key(key).await?;
                return Ok(self.hit(tenant, ResolvedBy::Query));
            }
        }

        // 7. Configured fallback tenant, migration aid behind policy and a
        //    route allow-list; identity-only routes need their own opt-in
        if self.fallback_applies(envelope) {
            if let Some(tenant) = self.lookup_key_opt(&self.config.default_tenant_key).await? {
                return Ok(self.hit(tenant, ResolvedBy::FallbackDefault));
            }
        }

        Ok(Resolution::unscoped())
    }

    async fn legacy_subject_tenant(&self, claims: &TokenClaims) -> TenancyResult<Option<Tenant>> {
        let identity = self
            .identities
            .find_by_subject(&claims.subject_id())
            .await?
            .ok_or_else(|| TenancyError::from(ApiError::user_not_found()))?;

        if !identity.is_active {
            return Err(ApiError::account_disabled().into());
        }

        match identity.tenant_id {
            Some(id) => Ok(Some(self.registry.by_id(&id).await?)),
            None => Ok(None),
        }
    }

    fn fallback_applies(&self, envelope: &IdentityEnvelope) -> bool {
        if !self.config.use_default_tenant_fallback {
            return false;
        }
        if envelope.route_class == RouteClass::IdentityOnly && !self.config.identity_only_fallback {
            return false;
        }
        self.config
            .fallback_route_allowlist
            .iter()
            .any(|prefix| envelope.path.starts_with(prefix.as_str()))
    }

    fn hit(&self, tenant: Tenant, source: ResolvedBy) -> Resolution {
        Resolution {
            tenant: Some(tenant),
            resolved_by: Some(source),
            is_master: false,
            limited: false,
        }
    }

    /// Post-resolution validation; returns whether limited mode applies
    fn validate_tenant(&self, tenant: &Tenant) -> TenancyResult<bool> {
        if !tenant.is_active {
            return Err(ApiError::tenant_suspended().into());
        }

        match tenant.subscription_status {
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => Ok(false),
            SubscriptionStatus::Suspended => match self.config.subscription_suspended_policy {
                SuspendedPolicy::Deny => Err(ApiError::subscription_suspended().into()),
                SuspendedPolicy::Limited => Ok(true),
            },
            SubscriptionStatus::Expired | SubscriptionStatus::Cancelled => {
                match self.config.subscription_suspended_policy {
                    SuspendedPolicy::Deny => Err(ApiError::subscription_expired().into()),
                    SuspendedPolicy::Limited => Ok(true),
                }
            }
        }
    }

    /// Key lookup that treats absence as a miss instead of an error, for
    /// implicit sources that fall through to the next one
    async fn lookup_key_opt(&self, key: &str) -> TenancyResult<Option<Tenant>> {
        match self.registry.by_key(key).await {
            Ok(tenant) => Ok(Some(tenant)),
            Err(TenancyError::Denied(err))
                if err.code == parley_api_types::ErrorCode::TenantNotFound =>
            {
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    async fn lookup_domain_opt(&self, host: &str) -> TenancyResult<Option<Tenant>> {
        match self.registry.by_domain(host).await {
            Ok(tenant) => Ok(Some(tenant)),
            Err(TenancyError::Denied(err))
                if err.code == parley_api_types::ErrorCode::TenantNotFound =>
            {
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

/// Strip any port suffix from a host header value
fn strip_port(host: &str) -> &str {
    host.rsplit_once(':')
        .map(|(h, port)| if port.chars().all(|c| c.is_ascii_digit()) { h } else { host })
        .unwrap_or(host)
}

/// The first hostname label, when the host looks like a tenant subdomain
fn subdomain_label(host: &str) -> Option<&str> {
    let host = strip_port(host);
    let mut labels = host.split('.');
    let first = labels.next()?;
    // Need at least sub.domain.tld
    if labels.count() < 2 {
        return None;
    }
    if RESERVED_SUBDOMAINS.contains(&first) {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Identity, InMemoryDirectory};
    use parley_api_types::{ErrorCode, Role, SubjectId, TenantKey};
    use parley_config::CacheConfig;

    fn tenant(id: &str, key: &str) -> Tenant {
        Tenant::new(TenantId::from(id), TenantKey::parse(key).unwrap())
    }

    fn claims(subject: &str, role: Role, tenant_id: Option<&str>, version: u32) -> TokenClaims {
        let now = chrono::Utc::now();
        TokenClaims {
            sub: subject.to_string(),
            role,
            tenant_id: tenant_id.map(|t| t.to_string()),
            tenant_key: None,
            token_version: version,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iss: "parley".to_string(),
            aud: "parley-clients".to_string(),
        }
    }

    struct Fixture {
        directory: Arc<InMemoryDirectory>,
        resolver: TenantResolver,
    }

    fn fixture(config: TenancyConfig) -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let registry = Arc::new(TenantRegistry::new(directory.clone(), &CacheConfig::default()));
        let resolver = TenantResolver::new(registry, directory.clone(), config);
        Fixture {
            directory,
            resolver,
        }
    }

    #[tokio::test]
    async fn test_subject_claim_wins_over_headers() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));
        f.directory.insert_tenant(tenant("t2", "beta"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/api/v1/chats");
        envelope.claims = Some(claims("u1", Role::Agent, Some("t1"), 2));
        // A same-tenant header is redundant but permitted
        envelope.header_tenant_id = Some("t1".to_string());

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.tenant_id().unwrap().as_str(), "t1");
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::Subject));
    }

    #[tokio::test]
    async fn test_claim_mismatching_header_is_cross_tenant() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));
        f.directory.insert_tenant(tenant("t2", "beta"));

        // Claims resolve first, so a mismatching header cannot shift scope;
        // flip it around by giving the claim no tenant (legacy) and pointing
        // the header at a foreign tenant
        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/api/v1/chats");
        envelope.claims = Some(claims("u1", Role::Agent, Some("t1"), 2));
        envelope.header_tenant_id = Some("t2".to_string());

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        // Subject source wins; header never consulted
        assert_eq!(resolution.tenant_id().unwrap().as_str(), "t1");
    }

    #[tokio::test]
    async fn test_header_id_beats_header_key() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));
        f.directory.insert_tenant(tenant("t2", "beta"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.header_tenant_id = Some("t1".to_string());
        envelope.header_tenant_key = Some("beta".to_string());

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.tenant_id().unwrap().as_str(), "t1");
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::HeaderId));
    }

    #[tokio::test]
    async fn test_subdomain_resolution() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.host = Some("acme.parley.app".to_string());

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::Subdomain));
    }

    #[tokio::test]
    async fn test_reserved_subdomains_skipped() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "www"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.host = Some("www.parley.app".to_string());

        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::TenantRequired);
    }

    #[tokio::test]
    async fn test_custom_domain_resolution() {
        let f = fixture(TenancyConfig::default());
        let mut t = tenant("t1", "acme");
        t.custom_domain = Some("support.acme.com".to_string());
        f.directory.insert_tenant(t);

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.host = Some("support.acme.com:443".to_string());

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        // "support" is not a registered key, so the domain source matches
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::Domain));
    }

    #[tokio::test]
    async fn test_query_param_gated_by_policy() {
        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.query_tenant = Some("acme".to_string());

        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));
        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::TenantRequired);

        let f = fixture(TenancyConfig {
            allow_query_tenant: true,
            ..Default::default()
        });
        f.directory.insert_tenant(tenant("t1", "acme"));
        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::Query));
    }

    #[tokio::test]
    async fn test_fallback_requires_flag_and_allowlist() {
        let config = TenancyConfig {
            use_default_tenant_fallback: true,
            fallback_route_allowlist: vec!["/api/v1/widget".to_string()],
            ..Default::default()
        };
        let f = fixture(config);
        f.directory.insert_tenant(tenant("t0", "default"));

        let envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/api/v1/widget/boot");
        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::FallbackDefault));

        let envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/api/v1/chats");
        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::TenantRequired);
    }

    #[tokio::test]
    async fn test_fallback_skips_identity_only_routes_by_default() {
        let config = TenancyConfig {
            use_default_tenant_fallback: true,
            fallback_route_allowlist: vec!["/api".to_string()],
            ..Default::default()
        };
        let f = fixture(config);
        f.directory.insert_tenant(tenant("t0", "default"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::IdentityOnly, "/api/v1/profile");
        envelope.claims = Some(claims("u1", Role::Agent, Some("t0"), 2));
        // Identity-only with claim-bound tenant resolves by subject, not fallback
        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::Subject));

        // Without any source, identity-only stays unscoped rather than
        // falling back
        let envelope = IdentityEnvelope::for_route(RouteClass::IdentityOnly, "/api/v1/profile");
        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert!(resolution.tenant.is_none());
    }

    #[tokio::test]
    async fn test_master_unscoped_without_override() {
        let f = fixture(TenancyConfig::default());

        let mut envelope = IdentityEnvelope::for_route(RouteClass::IdentityOnly, "/admin");
        envelope.claims = Some(claims("m1", Role::Master, None, 2));

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert!(resolution.is_master);
        assert!(resolution.tenant.is_none());
    }

    #[tokio::test]
    async fn test_master_override_via_header() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t2", "beta"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/admin");
        envelope.claims = Some(claims("m1", Role::Master, None, 2));
        envelope.header_tenant_id = Some("t2".to_string());

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert!(resolution.is_master);
        assert_eq!(resolution.tenant_id().unwrap().as_str(), "t2");
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::MasterOverride));
    }

    #[tokio::test]
    async fn test_master_required_route() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::MasterOnly, "/admin/tenants");
        envelope.claims = Some(claims("u1", Role::Admin, Some("t1"), 2));

        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::InsufficientRole);
    }

    #[tokio::test]
    async fn test_inactive_tenant_suspended() {
        let f = fixture(TenancyConfig::default());
        let mut t = tenant("t1", "acme");
        t.is_active = false;
        f.directory.insert_tenant(t);

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.claims = Some(claims("u1", Role::Agent, Some("t1"), 2));

        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::TenantSuspended);
    }

    #[tokio::test]
    async fn test_suspended_subscription_policies() {
        let mut t = tenant("t1", "acme");
        t.subscription_status = SubscriptionStatus::Suspended;

        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(t.clone());
        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.claims = Some(claims("u1", Role::Agent, Some("t1"), 2));
        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::SubscriptionSuspended);

        let f = fixture(TenancyConfig {
            subscription_suspended_policy: SuspendedPolicy::Limited,
            ..Default::default()
        });
        f.directory.insert_tenant(t);
        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert!(resolution.limited);
    }

    #[tokio::test]
    async fn test_legacy_claims_resolve_via_identity_store() {
        let f = fixture(TenancyConfig {
            allow_legacy_tokens: true,
            ..Default::default()
        });
        f.directory.insert_tenant(tenant("t1", "acme"));
        f.directory.insert_identity(Identity {
            subject_id: SubjectId::from("u1"),
            tenant_id: Some(TenantId::from("t1")),
            role: Role::Agent,
            is_active: true,
        });

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.claims = Some(claims("u1", Role::Agent, None, 1));

        let resolution = f.resolver.resolve(&envelope).await.unwrap();
        assert_eq!(resolution.tenant_id().unwrap().as_str(), "t1");
        assert_eq!(resolution.resolved_by, Some(ResolvedBy::Subject));
    }

    #[tokio::test]
    async fn test_legacy_claims_without_db_tenant() {
        let f = fixture(TenancyConfig {
            allow_legacy_tokens: true,
            ..Default::default()
        });
        f.directory.insert_identity(Identity {
            subject_id: SubjectId::from("u1"),
            tenant_id: None,
            role: Role::Agent,
            is_active: true,
        });

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.claims = Some(claims("u1", Role::Agent, None, 1));

        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::TenantRequired);
    }

    #[tokio::test]
    async fn test_legacy_unknown_subject() {
        let f = fixture(TenancyConfig {
            allow_legacy_tokens: true,
            ..Default::default()
        });

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.claims = Some(claims("ghost", Role::Agent, None, 1));

        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn test_legacy_disabled_subject() {
        let f = fixture(TenancyConfig {
            allow_legacy_tokens: true,
            ..Default::default()
        });
        f.directory.insert_identity(Identity {
            subject_id: SubjectId::from("u1"),
            tenant_id: Some(TenantId::from("t1")),
            role: Role::Agent,
            is_active: false,
        });

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.claims = Some(claims("u1", Role::Agent, None, 1));

        let err = f.resolver.resolve(&envelope).await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, ErrorCode::AccountDisabled);
    }

    #[tokio::test]
    async fn test_determinism() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));

        let mut envelope = IdentityEnvelope::for_route(RouteClass::TenantScoped, "/");
        envelope.host = Some("acme.parley.app".to_string());

        let first = f.resolver.resolve(&envelope).await.unwrap();
        for _ in 0..5 {
            let again = f.resolver.resolve(&envelope).await.unwrap();
            assert_eq!(again.tenant_id(), first.tenant_id());
            assert_eq!(again.resolved_by, first.resolved_by);
        }
    }

    #[tokio::test]
    async fn test_coerce_raw_references() {
        let f = fixture(TenancyConfig::default());
        f.directory.insert_tenant(tenant("t1", "acme"));

        let by_id = f.resolver.coerce(&TenantRef::Id(TenantId::from("t1"))).await.unwrap();
        let by_key = f.resolver.coerce(&TenantRef::Key("acme".to_string())).await.unwrap();
        assert_eq!(by_id.id, by_key.id);
    }
}
