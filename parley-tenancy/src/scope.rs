//! Ambient tenant scope
//!
//! The current tenant is carried in task-local storage so that call sites
//! that never see the request (model hooks, aggregation assembly) still
//! observe the right scope. Scopes nest structurally: an inner scope shadows
//! the outer one for exactly the lifetime of the wrapped future and the
//! outer frame is restored when it completes or is cancelled, which gives
//! the enter/exit pairing without a disposer that could be forgotten or
//! invoked twice. Frames are cloned into spawned tasks, never shared
//! mutably across operations.

use parley_api_types::TenantId;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

tokio::task_local! {
    static CURRENT_SCOPE: ScopeFrame;
}

/// Count of bypass scopes entered since process start
static BYPASS_ENTRIES: AtomicU64 = AtomicU64::new(0);

/// One frame of tenant scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    /// The tenant every scoped operation is filtered to
    pub tenant: Option<TenantId>,
    /// Scope suspended for the enclosed operation
    pub bypass: bool,
    /// Master identity operating unscoped
    pub master: bool,
}

impl ScopeFrame {
    /// The unscoped sentinel
    pub fn unscoped() -> Self {
        Self {
            tenant: None,
            bypass: false,
            master: false,
        }
    }

    /// A frame scoped to one tenant
    pub fn for_tenant(tenant: TenantId) -> Self {
        Self {
            tenant: Some(tenant),
            bypass: false,
            master: false,
        }
    }

    /// A bypass frame (audited suspension of scope)
    pub fn bypassed() -> Self {
        Self {
            tenant: None,
            bypass: true,
            master: false,
        }
    }

    /// A master frame, unscoped but privileged
    pub fn master_unscoped() -> Self {
        Self {
            tenant: None,
            bypass: false,
            master: true,
        }
    }

    /// Whether scope enforcement applies under this frame
    pub fn enforced(&self) -> bool {
        !self.bypass && !self.master
    }
}

/// Entry points for reading and installing scope frames
pub struct TenantScope;

impl TenantScope {
    /// The current frame, or the unscoped sentinel outside any scope
    pub fn current() -> ScopeFrame {
        CURRENT_SCOPE
            .try_with(|frame| frame.clone())
            .unwrap_or_else(|_| ScopeFrame::unscoped())
    }

    /// Run a future under an explicit frame
    pub async fn scope<F: Future>(frame: ScopeFrame, f: F) -> F::Output {
        CURRENT_SCOPE.scope(frame, f).await
    }

    /// Run a future scoped to `tenant`
    pub async fn with_tenant<F: Future>(tenant: TenantId, f: F) -> F::Output {
        CURRENT_SCOPE.scope(ScopeFrame::for_tenant(tenant), f).await
    }

    /// Run a future with scope suspended.
    ///
    /// Every entry is audited with the call site so bypass use is
    /// attributable after the fact.
    pub async fn without_tenant<F: Future>(call_site: &'static str, f: F) -> F::Output {
        let entries = BYPASS_ENTRIES.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(call_site, total_entries = entries, "tenant_scope_bypass");
        CURRENT_SCOPE.scope(ScopeFrame::bypassed(), f).await
    }

    /// Run a future under a master frame
    pub async fn as_master<F: Future>(f: F) -> F::Output {
        CURRENT_SCOPE.scope(ScopeFrame::master_unscoped(), f).await
    }

    /// Spawn a task inheriting the caller's frame at launch time.
    ///
    /// The child gets its own copy; later changes on either side are not
    /// visible to the other.
    pub fn spawn<F>(f: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let frame = Self::current();
        debug!(?frame, "propagating tenant scope to spawned task");
        tokio::spawn(CURRENT_SCOPE.scope(frame, f))
    }

    /// Bypass entries since process start
    pub fn bypass_entries() -> u64 {
        BYPASS_ENTRIES.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscoped_outside_any_frame() {
        assert_eq!(TenantScope::current(), ScopeFrame::unscoped());
    }

    #[tokio::test]
    async fn test_with_tenant_installs_and_restores() {
        let t1 = TenantId::from("t1");
        TenantScope::with_tenant(t1.clone(), async {
            assert_eq!(TenantScope::current().tenant, Some(TenantId::from("t1")));
        })
        .await;
        assert_eq!(TenantScope::current(), ScopeFrame::unscoped());
    }

    #[tokio::test]
    async fn test_nested_scopes_restore_lifo() {
        TenantScope::with_tenant(TenantId::from("t1"), async {
            TenantScope::with_tenant(TenantId::from("t2"), async {
                assert_eq!(TenantScope::current().tenant, Some(TenantId::from("t2")));
            })
            .await;
            // Outer frame restored
            assert_eq!(TenantScope::current().tenant, Some(TenantId::from("t1")));
        })
        .await;
    }

    #[tokio::test]
    async fn test_bypass_is_counted_and_scoped() {
        let before = TenantScope::bypass_entries();
        TenantScope::with_tenant(TenantId::from("t1"), async {
            TenantScope::without_tenant("test_site", async {
                let frame = TenantScope::current();
                assert!(frame.bypass);
                assert!(frame.tenant.is_none());
            })
            .await;
            // Tenant frame restored after bypass
            assert_eq!(TenantScope::current().tenant, Some(TenantId::from("t1")));
        })
        .await;
        assert_eq!(TenantScope::bypass_entries(), before + 1);
    }

    #[tokio::test]
    async fn test_spawned_task_inherits_frame_copy() {
        TenantScope::with_tenant(TenantId::from("t1"), async {
            let handle = TenantScope::spawn(async {
                // Child sees the frame that was current at launch
                TenantScope::current().tenant
            });
            assert_eq!(handle.await.unwrap(), Some(TenantId::from("t1")));
        })
        .await;
    }

    #[tokio::test]
    async fn test_concurrent_operations_do_not_share_frames() {
        let a = TenantScope::spawn(TenantScope::scope(
            ScopeFrame::for_tenant(TenantId::from("ta")),
            async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                TenantScope::current().tenant
            },
        ));
        let b = TenantScope::spawn(TenantScope::scope(
            ScopeFrame::for_tenant(TenantId::from("tb")),
            async { TenantScope::current().tenant },
        ));

        assert_eq!(a.await.unwrap(), Some(TenantId::from("ta")));
        assert_eq!(b.await.unwrap(), Some(TenantId::from("tb")));
    }

    #[tokio::test]
    async fn test_master_frame_is_unscoped_but_privileged() {
        TenantScope::as_master(async {
            let frame = TenantScope::current();
            assert!(frame.master);
            assert!(frame.tenant.is_none());
            assert!(!frame.enforced());
        })
        .await;
    }
}
