//! Per-tenant origin allow-listing
//!
//! Origin lists live on the tenant record and are matched here against the
//! pattern grammar: exact origins, the full wildcard `*`, subdomain
//! wildcards `*.domain.tld`, any-port forms `scheme://host:*`, and bracketed
//! regular expressions `/.../`. Lists are parsed once and cached per tenant
//! with TTL; writes go through the registry, which invalidates the cached
//! list before returning. Allowed/blocked counters feed the pattern
//! suggestion helper and operator dashboards; they are best-effort and
//! bounded.

use lru::LruCache;
use parking_lot::Mutex;
use parley_api_types::{ApiError, TenantId};
use parley_caching::{Cache, TtlCache};
use parley_config::{CorsConfig, Environment};
use parley_tenancy::{TenancyResult, TenantRegistry};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, warn};

/// One validated origin pattern
#[derive(Debug, Clone)]
pub enum OriginPattern {
    /// Exact origin string
    Exact(String),
    /// Full wildcard
    Any,
    /// Any subdomain of a domain, e.g. `*.corp.example`
    Subdomain(String),
    /// Any port on a host, e.g. `http://localhost:*`
    AnyPort { scheme: String, host: String },
    /// Bracketed regular expression matched against the whole origin
    Regex(regex::Regex),
}

impl OriginPattern {
    /// Parse and validate a pattern. Invalid patterns are rejected before
    /// they can be persisted.
    pub fn parse(pattern: &str) -> Result<Self, ApiError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ApiError::origin_not_allowed("empty origin pattern"));
        }

        if pattern == "*" {
            return Ok(OriginPattern::Any);
        }

        if let Some(inner) = pattern.strip_prefix('/').and_then(|p| p.strip_suffix('/')) {
            let regex = regex::Regex::new(inner).map_err(|e| {
                ApiError::origin_not_allowed(&format!("invalid origin regex: {}", e))
            })?;
            return Ok(OriginPattern::Regex(regex));
        }

        if let Some(domain) = pattern.strip_prefix("*.") {
            if domain.is_empty() || domain.contains("://") {
                return Err(ApiError::origin_not_allowed("invalid subdomain pattern"));
            }
            return Ok(OriginPattern::Subdomain(domain.to_string()));
        }

        if let Some((scheme, rest)) = pattern.split_once("://") {
            if let Some(host) = rest.strip_suffix(":*") {
                if host.is_empty() {
                    return Err(ApiError::origin_not_allowed("invalid any-port pattern"));
                }
                return Ok(OriginPattern::AnyPort {
                    scheme: scheme.to_string(),
                    host: host.to_string(),
                });
            }
            return Ok(OriginPattern::Exact(pattern.to_string()));
        }

        Err(ApiError::origin_not_allowed(
            "origin pattern must be an origin, '*', '*.domain', 'scheme://host:*' or '/regex/'",
        ))
    }

    /// Whether an origin matches this pattern
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Exact(expected) => origin == expected,
            OriginPattern::Any => true,
            OriginPattern::Subdomain(domain) => origin_host(origin)
                .is_some_and(|host| host.ends_with(&format!(".{}", domain))),
            OriginPattern::AnyPort { scheme, host } => match split_origin(origin) {
                Some((s, h, _)) => s == scheme && h == host,
                None => false,
            },
            OriginPattern::Regex(regex) => regex.is_match(origin),
        }
    }
}

/// `scheme://host[:port]` → `(scheme, host, port)`
fn split_origin(origin: &str) -> Option<(&str, &str, Option<&str>)> {
    let (scheme, rest) = origin.split_once("://")?;
    match rest.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
            Some((scheme, host, Some(port)))
        }
        _ => Some((scheme, rest, None)),
    }
}

fn origin_host(origin: &str) -> Option<&str> {
    split_origin(origin).map(|(_, host, _)| host)
}

/// The outcome of an origin check
#[derive(Debug, Clone)]
pub struct OriginDecision {
    pub allowed: bool,
    pub reason: String,
}

impl OriginDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn block(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    allowed: u64,
    blocked: u64,
}

/// Bounded per-(tenant, origin) allow/block counters
pub struct OriginStats {
    counters: Mutex<LruCache<(TenantId, String), Counters>>,
}

impl OriginStats {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            counters: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn record(&self, tenant: &TenantId, origin: &str, allowed: bool) {
        let key = (tenant.clone(), origin.to_string());
        let mut counters = self.counters.lock();
        let mut entry = counters.get(&key).copied().unwrap_or_default();
        if allowed {
            entry.allowed += 1;
        } else {
            entry.blocked += 1;
        }
        counters.put(key, entry);
    }

    /// Blocked origins for one tenant with their counts
    pub fn blocked_for(&self, tenant: &TenantId) -> Vec<(String, u64)> {
        let counters = self.counters.lock();
        counters
            .iter()
            .filter(|((t, _), c)| t == tenant && c.blocked > 0)
            .map(|((_, origin), c)| (origin.clone(), c.blocked))
            .collect()
    }

    /// Allowed/blocked totals for one origin
    pub fn totals(&self, tenant: &TenantId, origin: &str) -> (u64, u64) {
        let mut counters = self.counters.lock();
        counters
            .get(&(tenant.clone(), origin.to_string()))
            .map(|c| (c.allowed, c.blocked))
            .unwrap_or((0, 0))
    }
}

/// Per-tenant CORS policy over the registry's origin lists
pub struct OriginPolicy {
    registry: Arc<TenantRegistry>,
    config: CorsConfig,
    environment: Environment,
    parsed: TtlCache<TenantId, Arc<Vec<OriginPattern>>>,
    stats: OriginStats,
}

impl OriginPolicy {
    pub fn new(registry: Arc<TenantRegistry>, config: CorsConfig, environment: Environment) -> Self {
        let parsed = TtlCache::new(config.origin_cache_ttl);
        let stats = OriginStats::new(config.stats_capacity);
        Self {
            registry,
            config,
            environment,
            parsed,
            stats,
        }
    }

    /// Check an origin against a tenant's allow-list
    pub async fn is_allowed(&self, origin: &str, tenant: &TenantId) -> TenancyResult<OriginDecision> {
        // Development origins short-circuit only in development
        if self.environment.is_development()
            && self.config.development_origins.iter().any(|o| o == origin)
        {
            self.stats.record(tenant, origin, true);
            return Ok(OriginDecision::allow("development allow-list"));
        }

        let patterns = self.patterns_for(tenant).await?;
        let decision = match patterns.iter().find(|p| p.matches(origin)) {
            Some(pattern) => OriginDecision::allow(format!("matched {:?}", pattern)),
            None => OriginDecision::block("no pattern matched"),
        };

        self.stats.record(tenant, origin, decision.allowed);
        if !decision.allowed {
            debug!(origin, tenant_id = %tenant, "origin blocked");
        }
        Ok(decision)
    }

    /// Add a pattern to a tenant's allow-list
    pub async fn add_allowed(&self, tenant: &TenantId, pattern: &str) -> TenancyResult<()> {
        OriginPattern::parse(pattern).map_err(parley_tenancy::TenancyError::from)?;
        let pattern = pattern.to_string();
        self.registry
            .modify_allowed_origins(tenant, move |list| {
                if !list.contains(&pattern) {
                    list.push(pattern);
                }
            })
            .await?;
        self.invalidate(tenant).await;
        Ok(())
    }

    /// Remove a pattern from a tenant's allow-list
    pub async fn remove_allowed(&self, tenant: &TenantId, pattern: &str) -> TenancyResult<()> {
        let pattern = pattern.to_string();
        self.registry
            .modify_allowed_origins(tenant, move |list| list.retain(|p| p != &pattern))
            .await?;
        self.invalidate(tenant).await;
        Ok(())
    }

    /// Replace a tenant's allow-list
    pub async fn set_allowed(&self, tenant: &TenantId, patterns: Vec<String>) -> TenancyResult<()> {
        for pattern in &patterns {
            OriginPattern::parse(pattern).map_err(parley_tenancy::TenancyError::from)?;
        }
        self.registry.set_allowed_origins(tenant, patterns).await?;
        self.invalidate(tenant).await;
        Ok(())
    }

    /// Propose coarser patterns from blocked-origin statistics: several
    /// blocked subdomains of one parent domain collapse into `*.parent`.
    pub fn suggest(&self, tenant: &TenantId) -> Vec<String> {
        let mut by_parent: HashMap<String, (u64, usize)> = HashMap::new();

        for (origin, blocked) in self.stats.blocked_for(tenant) {
            let Some(host) = origin_host(&origin) else { continue };
            let labels: Vec<&str> = host.split('.').collect();
            if labels.len() < 3 {
                continue;
            }
            let parent = labels[1..].join(".");
            let entry = by_parent.entry(parent).or_default();
            entry.0 += blocked;
            entry.1 += 1;
        }

        let mut suggestions: Vec<String> = by_parent
            .into_iter()
            .filter(|(_, (blocked, distinct))| {
                *blocked >= self.config.suggestion_threshold && *distinct >= 2
            })
            .map(|(parent, _)| format!("*.{}", parent))
            .collect();
        suggestions.sort();
        suggestions
    }

    /// Origin statistics handle
    pub fn stats(&self) -> &OriginStats {
        &self.stats
    }

    async fn patterns_for(&self, tenant: &TenantId) -> TenancyResult<Arc<Vec<OriginPattern>>> {
        if let Ok(Some(patterns)) = self.parsed.get(tenant).await {
            return Ok(patterns);
        }

        let raw = self.registry.allowed_origins(tenant).await?;
        let patterns: Vec<OriginPattern> = raw
            .iter()
            .filter_map(|p| match OriginPattern::parse(p) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    // Persisted lists are validated on write; tolerate and
                    // skip anything older than that
                    warn!(tenant_id = %tenant, pattern = p, error = %err, "skipping unparsable origin pattern");
                    None
                }
            })
            .collect();

        let patterns = Arc::new(patterns);
        let _ = self.parsed.put(tenant.clone(), patterns.clone()).await;
        Ok(patterns)
    }

    async fn invalidate(&self, tenant: &TenantId) {
        let _ = self.parsed.remove(tenant).await;
    }
}
