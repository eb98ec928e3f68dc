//! Tenant identity for the Parley kernel
//!
//! This crate owns the four pieces the rest of the system builds on:
//!
//! - [`registry::TenantRegistry`]: cached, authoritative lookup of tenant
//!   records by id, key, legacy slug, or custom domain
//! - [`token::TokenService`]: minting and verification of signed identity
//!   tokens, including the legacy-version migration policy
//! - [`resolver::TenantResolver`]: the deterministic mapping from a request
//!   envelope to exactly one tenant (or a master/unscoped outcome)
//! - [`scope::TenantScope`]: the task-local ambient frame that carries the
//!   resolved tenant to call sites that never see the request

pub mod directory;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod tenant;
pub mod token;

pub use directory::{Identity, IdentityDirectory, InMemoryDirectory, TenantDirectory};
pub use error::{TenancyError, TenancyResult};
pub use registry::TenantRegistry;
pub use resolver::{
    IdentityEnvelope, Resolution, ResolvedBy, RouteClass, TenantRef, TenantResolver,
};
pub use scope::{ScopeFrame, TenantScope};
pub use tenant::Tenant;
pub use token::{TokenClaims, TokenService};
