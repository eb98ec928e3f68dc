//! Route classification

use parley_tenancy::RouteClass;

/// Prefix-based route classification table.
///
/// The longest matching prefix wins; unmatched paths default to
/// tenant-scoped, so forgetting to declare a route fails closed.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<(String, RouteClass)>,
}

impl RoutePolicy {
    /// An empty table: everything is tenant-scoped
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The conventional platform layout: auth flows, health and inbound
    /// billing webhooks are public; admin is master-only.
    pub fn with_defaults() -> Self {
        Self::new()
            .route("/api/v1/auth/login", RouteClass::Public)
            .route("/api/v1/auth/register", RouteClass::Public)
            .route("/health", RouteClass::Public)
            .route("/webhooks/billing", RouteClass::Public)
            .route("/api/v1/me", RouteClass::IdentityOnly)
            .route("/api/v1/admin", RouteClass::MasterOnly)
    }

    /// Declare a prefix
    pub fn route(mut self, prefix: impl Into<String>, class: RouteClass) -> Self {
        self.rules.push((prefix.into(), class));
        self
    }

    /// Classify a request path
    pub fn classify(&self, path: &str) -> RouteClass {
        self.rules
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, class)| *class)
            .unwrap_or(RouteClass::TenantScoped)
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}
