//! The realtime hub
//!
//! Connections authenticate with the same token service and tenant resolver
//! as HTTP, get bound to one tenant (or master), and join their tenant's
//! fan-out groups. Each group is a bounded broadcast channel; a per-connection
//! forwarder moves frames into the connection's inbox, preserving per-group
//! order. Saturated or paused connections drop frames rather than stall the
//! emitter, and every drop is counted.

use parking_lot::RwLock;
use parley_api_types::{ApiError, RejectionReason, TenantId};
use parley_config::RealtimeConfig;
use parley_tenancy::{IdentityEnvelope, RouteClass, TenantResolver, TokenService};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::connection::{ConnectionId, ConnectionInfo, ConnectionState};
use crate::error::{rejection_for, RealtimeError, RealtimeResult};
use crate::group::{GroupId, RoleBucket};

/// One event as delivered to clients
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EventFrame {
    pub event: String,
    pub payload: JsonValue,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// The authentication bag presented at handshake
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct HandshakeAuth {
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_key: Option<String>,
}

/// The client side of an accepted connection
#[derive(Debug)]
pub struct ClientHandle {
    pub info: ConnectionInfo,
    /// Ordered inbox of frames from every joined group
    pub events: mpsc::Receiver<EventFrame>,
}

struct ConnectionEntry {
    info: ConnectionInfo,
    state: ConnectionState,
    groups: Vec<GroupId>,
    forwarders: Vec<tokio::task::JoinHandle<()>>,
    paused: Arc<AtomicBool>,
}

/// Tenant-isolated connection broker
pub struct RealtimeHub {
    tokens: Arc<TokenService>,
    resolver: Arc<TenantResolver>,
    config: RealtimeConfig,
    groups: RwLock<HashMap<GroupId, broadcast::Sender<EventFrame>>>,
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    dropped: Arc<AtomicU64>,
}

impl RealtimeHub {
    pub fn new(
        tokens: Arc<TokenService>,
        resolver: Arc<TenantResolver>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            tokens,
            resolver,
            config,
            groups: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Authenticate a handshake and admit the connection.
    ///
    /// On failure the typed reason is returned and the transport must be
    /// dropped by the caller.
    pub async fn connect(&self, auth: HandshakeAuth) -> RealtimeResult<ClientHandle> {
        // Connecting -> Authenticated | Rejected
        let Some(token) = auth.token.as_deref() else {
            return Err(RealtimeError::Rejected(RejectionReason::AuthenticationRequired));
        };

        let claims = self.tokens.verify(token).map_err(|err| {
            RealtimeError::Rejected(rejection_for(&parley_tenancy::TenancyError::from(err)))
        })?;

        let route_class = if claims.role.is_master() {
            RouteClass::IdentityOnly
        } else {
            RouteClass::TenantScoped
        };
        let mut envelope = IdentityEnvelope::for_route(route_class, "/realtime");
        envelope.header_tenant_id = auth.tenant_id.clone();
        envelope.header_tenant_key = auth.tenant_key.clone();
        envelope.claims = Some(claims.clone());

        let resolution = self
            .resolver
            .resolve(&envelope)
            .await
            .map_err(|err| RealtimeError::Rejected(rejection_for(&err)))?;

        let info = ConnectionInfo {
            id: ConnectionId::generate(),
            tenant: resolution.tenant_id().cloned(),
            subject: claims.subject_id(),
            role: claims.role,
        };

        // Authenticated -> Active, gated on group membership
        let groups = Self::groups_for(&info);
        let (tx, rx) = mpsc::channel(self.config.group_buffer);
        let paused = Arc::new(AtomicBool::new(false));

        let mut forwarders = Vec::with_capacity(groups.len());
        for group in &groups {
            let receiver = self.subscribe_group(group);
            forwarders.push(self.spawn_forwarder(receiver, tx.clone(), paused.clone()));
        }

        debug!(
            connection = %info.id,
            subject = %info.subject,
            tenant = ?info.tenant,
            groups = groups.len(),
            "realtime connection admitted"
        );

        self.connections.write().insert(
            info.id,
            ConnectionEntry {
                info: info.clone(),
                state: ConnectionState::Active,
                groups,
                forwarders,
                paused,
            },
        );

        Ok(ClientHandle { info, events: rx })
    }

    /// Tear a connection down, leaving all groups atomically
    pub fn disconnect(&self, id: ConnectionId) {
        let entry = self.connections.write().remove(&id);
        if let Some(entry) = entry {
            for task in entry.forwarders {
                task.abort();
            }
            debug!(connection = %id, "realtime connection closed");
        }
        // Drop group channels nobody listens to anymore
        self.groups.write().retain(|_, tx| tx.receiver_count() > 0);
    }

    /// Emit a frame to one group; returns the number of live subscribers
    pub fn emit(&self, group: &GroupId, frame: EventFrame) -> usize {
        let groups = self.groups.read();
        match groups.get(group) {
            Some(tx) => tx.send(frame).unwrap_or(0),
            None => {
                debug!(group = %group, "emit to group without subscribers");
                0
            }
        }
    }

    /// Emit to a single user. Only tenant-qualified addressing exists;
    /// there is no way to reach a subject across tenants.
    pub fn emit_to_user(
        &self,
        tenant: &TenantId,
        subject: &parley_api_types::SubjectId,
        frame: EventFrame,
    ) -> usize {
        self.emit(&GroupId::User(tenant.clone(), subject.clone()), frame)
    }

    /// Validate an inbound frame against the connection's tenant binding.
    ///
    /// Payloads asserting a tenant must assert the connection's tenant;
    /// masters are exempt.
    pub fn validate_inbound(&self, id: ConnectionId, payload: &JsonValue) -> RealtimeResult<()> {
        let connections = self.connections.read();
        let entry = connections.get(&id).ok_or(RealtimeError::UnknownConnection)?;

        if entry.info.role.is_master() {
            return Ok(());
        }

        let asserted = payload
            .get("tenantId")
            .or_else(|| payload.get("tenant_id"))
            .and_then(|v| v.as_str());

        if let Some(asserted) = asserted {
            let owned = entry.info.tenant.as_ref().map(|t| t.as_str());
            if owned != Some(asserted) {
                warn!(
                    connection = %id,
                    asserted,
                    owned = ?owned,
                    "inbound frame crossing tenant boundary rejected"
                );
                return Err(ApiError::cross_tenant_denied().into());
            }
        }

        Ok(())
    }

    /// Pause delivery to a connection; frames arriving meanwhile are dropped
    pub fn pause(&self, id: ConnectionId) -> RealtimeResult<()> {
        self.transition(id, ConnectionState::Paused)
    }

    /// Resume delivery
    pub fn resume(&self, id: ConnectionId) -> RealtimeResult<()> {
        self.transition(id, ConnectionState::Active)
    }

    fn transition(&self, id: ConnectionId, to: ConnectionState) -> RealtimeResult<()> {
        let mut connections = self.connections.write();
        let entry = connections.get_mut(&id).ok_or(RealtimeError::UnknownConnection)?;
        if !entry.state.can_transition(to) {
            return Err(RealtimeError::IllegalTransition {
                from: entry.state,
                to,
            });
        }
        entry.state = to;
        entry
            .paused
            .store(to == ConnectionState::Paused, Ordering::Relaxed);
        Ok(())
    }

    /// Groups a connection's membership, all bound to its own tenant
    fn groups_for(info: &ConnectionInfo) -> Vec<GroupId> {
        match (&info.tenant, info.role.is_master()) {
            // Master without a tenant override joins only the master group
            (None, true) => vec![GroupId::Master],
            // Master with an override additionally observes that tenant
            (Some(tenant), true) => vec![
                GroupId::Master,
                GroupId::Tenant(tenant.clone()),
                GroupId::User(tenant.clone(), info.subject.clone()),
            ],
            (Some(tenant), false) => {
                let mut groups = vec![GroupId::Tenant(tenant.clone())];
                if let Some(bucket) = RoleBucket::for_role(info.role) {
                    groups.push(GroupId::Bucket(tenant.clone(), bucket));
                }
                groups.push(GroupId::User(tenant.clone(), info.subject.clone()));
                groups
            }
            // Unreachable for admitted connections: the resolver requires a
            // tenant for non-master handshakes
            (None, false) => Vec::new(),
        }
    }

    fn subscribe_group(&self, group: &GroupId) -> broadcast::Receiver<EventFrame> {
        let mut groups = self.groups.write();
        groups
            .entry(group.clone())
            .or_insert_with(|| broadcast::channel(self.config.group_buffer).0)
            .subscribe()
    }

    fn spawn_forwarder(
        &self,
        mut receiver: broadcast::Receiver<EventFrame>,
        tx: mpsc::Sender<EventFrame>,
        paused: Arc<AtomicBool>,
    ) -> tokio::task::JoinHandle<()> {
        let dropped = self.dropped.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(frame) => {
                        if paused.load(Ordering::Relaxed) {
                            dropped.fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                        match tx.try_send(frame) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                // Bounded inbox: drop rather than block the
                                // emitter across tenants
                                dropped.fetch_add(1, Ordering::Relaxed);
                                warn!("realtime inbox full, frame dropped");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        dropped.fetch_add(skipped, Ordering::Relaxed);
                        warn!(skipped, "realtime subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Groups a connection currently belongs to
    pub fn connection_groups(&self, id: ConnectionId) -> Vec<GroupId> {
        self.connections
            .read()
            .get(&id)
            .map(|entry| entry.groups.clone())
            .unwrap_or_default()
    }

    /// Lifecycle state of a connection, if still tracked
    pub fn connection_state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.connections.read().get(&id).map(|entry| entry.state)
    }

    /// Number of tracked connections
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Frames dropped due to saturation, lag, or pause since start
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
