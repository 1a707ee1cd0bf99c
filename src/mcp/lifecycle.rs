//! MCP connection lifecycle.
//!
//! [`MCPConnectionController`] turns a stream of desired-state changes into
//! at most one live session whose tools are registered in the shared
//! [`ToolRegistry`]. Every call to [`MCPConnectionController::set_desired_state`]
//! starts a new generation; work belonging to an older generation is
//! discarded at each commit point instead of being aborted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio_stream::wrappers::WatchStream;

use super::bridge;
use super::schema::RemoteToolDescriptor;
use super::server::ServerConfigStore;
use super::settings::{load_desired_state, save_desired_state, DesiredState};
use super::transport::{MCPConnector, MCPSession};
use crate::config::SettingsStore;
use crate::error::AgentError;
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::ToolSource;

/// Coarse connection state shown to the user.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Step of a transition that failed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStage {
    Resolve,
    Connect,
    ListTools,
}

/// The single current status value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<ConnectionStage>,
    /// Generation that wrote this snapshot.
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// `true` once the transition for `generation` has settled.
    pub ready: bool,
}

impl StatusSnapshot {
    fn connecting(generation: u64, server_id: Option<String>) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            generation,
            server_id,
            ..Default::default()
        }
    }

    fn disconnected(generation: u64) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            generation,
            ready: true,
            ..Default::default()
        }
    }

    fn connected(generation: u64, server_id: String) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            generation,
            server_id: Some(server_id),
            ready: true,
            ..Default::default()
        }
    }

    fn failed(generation: u64, server_id: String, stage: ConnectionStage, message: String) -> Self {
        Self {
            status: ConnectionStatus::Error,
            error: Some(message),
            stage: Some(stage),
            generation,
            server_id: Some(server_id),
            ready: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

/// How a transition ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// MCP is off, or no server is selected.
    Disconnected,
    Connected { tool_count: usize },
    Failed {
        stage: ConnectionStage,
        message: String,
    },
    /// A newer call took over before this one committed.
    Superseded,
}

/// Resolves once the transition it was returned for has settled.
#[derive(Debug)]
pub struct TransitionHandle {
    generation: u64,
    outcome: oneshot::Receiver<TransitionOutcome>,
}

impl TransitionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the outcome.
    pub async fn ready(self) -> TransitionOutcome {
        // The sender only disappears if the runtime drops the task.
        self.outcome.await.unwrap_or(TransitionOutcome::Superseded)
    }
}

struct ActiveSession {
    generation: u64,
    server_id: String,
    session: Arc<dyn MCPSession>,
}

#[derive(Default)]
struct ControllerState {
    generation: u64,
    active: Option<ActiveSession>,
    desired: DesiredState,
}

struct Inner {
    registry: Arc<ToolRegistry>,
    servers: Arc<dyn ServerConfigStore>,
    connector: Arc<dyn MCPConnector>,
    state: Mutex<ControllerState>,
    status: watch::Sender<StatusSnapshot>,
}

/// Owns the MCP connection and keeps the registry's MCP tools in step with it.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct MCPConnectionController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MCPConnectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MCPConnectionController")
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}

impl MCPConnectionController {
    pub fn new(
        registry: Arc<ToolRegistry>,
        servers: Arc<dyn ServerConfigStore>,
        connector: Arc<dyn MCPConnector>,
    ) -> Self {
        let (status, _) = watch::channel(StatusSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                registry,
                servers,
                connector,
                state: Mutex::new(ControllerState::default()),
                status,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.inner.registry
    }

    /// Start a transition towards `desired`.
    ///
    /// Returns immediately: the live session (if any) is detached, MCP tools
    /// are retracted and status becomes `connecting` before this returns; the
    /// rest runs on a spawned task. Must be called inside a Tokio runtime.
    pub fn set_desired_state(&self, desired: DesiredState) -> TransitionHandle {
        let (tx, rx) = oneshot::channel();

        let generation = {
            let mut state = self.inner.lock_state();
            state.generation += 1;
            let generation = state.generation;
            state.desired = desired.clone();

            if let Some(active) = state.active.take() {
                tracing::debug!(
                    generation,
                    previous = active.generation,
                    server_id = %active.server_id,
                    "Detaching MCP session"
                );
                spawn_teardown(active.server_id, active.session);
            }

            let retracted = self.inner.registry.unregister_all(|t| t.source().is_mcp());
            if retracted > 0 {
                tracing::debug!(generation, retracted, "Retracted MCP tools");
            }

            self.inner.status.send_replace(StatusSnapshot::connecting(
                generation,
                desired.target().map(str::to_owned),
            ));
            generation
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.run_transition(generation, desired).await;
            let _ = tx.send(outcome);
        });

        TransitionHandle {
            generation,
            outcome: rx,
        }
    }

    /// Shorthand for a disabled desired state.
    pub fn disconnect(&self) -> TransitionHandle {
        self.set_desired_state(DesiredState::disabled())
    }

    /// Persist `desired`, then apply it.
    ///
    /// A failed save is logged; the state is applied regardless.
    pub fn toggle(&self, settings: &dyn SettingsStore, desired: DesiredState) -> TransitionHandle {
        if let Err(e) = save_desired_state(settings, &desired) {
            tracing::warn!(error = %e, "Failed to save MCP settings");
        }
        self.set_desired_state(desired)
    }

    /// Apply whatever desired state was last persisted.
    pub fn restore(&self, settings: &dyn SettingsStore) -> TransitionHandle {
        self.set_desired_state(load_desired_state(settings))
    }

    pub fn current_status(&self) -> StatusSnapshot {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.inner.status.subscribe()
    }

    /// Status changes as a stream, starting with the current snapshot.
    pub fn status_stream(&self) -> WatchStream<StatusSnapshot> {
        WatchStream::new(self.subscribe())
    }

    pub fn desired_state(&self) -> DesiredState {
        self.inner.lock_state().desired.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock_state().generation
    }

    /// Server whose session is currently committed, if any.
    pub fn active_server_id(&self) -> Option<String> {
        self.inner
            .lock_state()
            .active
            .as_ref()
            .map(|active| active.server_id.clone())
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.lock_state().generation != generation
    }

    /// Write `snapshot` unless `generation` has been superseded.
    fn publish(&self, generation: u64, snapshot: StatusSnapshot) -> bool {
        let state = self.lock_state();
        if state.generation != generation {
            return false;
        }
        self.status.send_replace(snapshot);
        true
    }

    async fn run_transition(&self, generation: u64, desired: DesiredState) -> TransitionOutcome {
        let Some(server_id) = desired.target().map(str::to_owned) else {
            if self.publish(generation, StatusSnapshot::disconnected(generation)) {
                tracing::debug!(generation, "MCP disabled");
                return TransitionOutcome::Disconnected;
            }
            return superseded(generation, "disable");
        };

        let config = match self.servers.get_server_config(&server_id) {
            Ok(Some(config)) => config,
            Ok(None) => {
                return self.fail(
                    generation,
                    server_id.clone(),
                    ConnectionStage::Resolve,
                    AgentError::ServerNotFound(server_id),
                )
            }
            Err(e) => return self.fail(generation, server_id, ConnectionStage::Resolve, e),
        };
        if self.is_stale(generation) {
            return superseded(generation, "resolve");
        }

        tracing::debug!(generation, server_id = %server_id, url = %config.url, "Opening MCP session");
        let session = match self.connector.open(&config).await {
            Ok(session) => session,
            Err(e) => return self.fail(generation, server_id, ConnectionStage::Connect, e),
        };
        if self.is_stale(generation) {
            teardown(&server_id, session).await;
            return superseded(generation, "connect");
        }

        let descriptors = match session.list_tools().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                teardown(&server_id, session).await;
                return self.fail(generation, server_id, ConnectionStage::ListTools, e);
            }
        };

        self.commit(generation, server_id, session, descriptors).await
    }

    fn fail(
        &self,
        generation: u64,
        server_id: String,
        stage: ConnectionStage,
        error: AgentError,
    ) -> TransitionOutcome {
        let message = error.user_message();
        let snapshot = StatusSnapshot::failed(generation, server_id.clone(), stage, message.clone());
        if !self.publish(generation, snapshot) {
            return superseded(generation, "fail");
        }
        tracing::warn!(generation, server_id = %server_id, %stage, error = %error, "MCP connection failed");
        TransitionOutcome::Failed { stage, message }
    }

    async fn commit(
        &self,
        generation: u64,
        server_id: String,
        session: Arc<dyn MCPSession>,
        descriptors: Vec<RemoteToolDescriptor>,
    ) -> TransitionOutcome {
        let committed = {
            let mut state = self.lock_state();
            if state.generation != generation {
                None
            } else {
                let source = ToolSource::Mcp {
                    server_id: server_id.clone(),
                    generation,
                };
                for descriptor in descriptors {
                    if self
                        .registry
                        .get(&descriptor.name)
                        .is_some_and(|existing| !existing.source().is_mcp())
                    {
                        tracing::warn!(
                            generation,
                            tool = %descriptor.name,
                            "Skipping MCP tool that shadows a built-in tool"
                        );
                        continue;
                    }
                    let name = descriptor.name.clone();
                    match bridge::adapt(descriptor, source.clone(), Arc::clone(&session)) {
                        Ok(tool) => self.registry.register_tool(tool),
                        Err(e) => {
                            tracing::warn!(generation, tool = %name, error = %e, "Skipping MCP tool")
                        }
                    }
                }

                let tool_count = self
                    .registry
                    .list_tools()
                    .iter()
                    .filter(|tool| tool.source().is_mcp())
                    .count();
                state.active = Some(ActiveSession {
                    generation,
                    server_id: server_id.clone(),
                    session: Arc::clone(&session),
                });
                self.status
                    .send_replace(StatusSnapshot::connected(generation, server_id.clone()));
                Some(tool_count)
            }
        };

        match committed {
            Some(tool_count) => {
                tracing::info!(generation, server_id = %server_id, tool_count, "MCP server connected");
                TransitionOutcome::Connected { tool_count }
            }
            None => {
                teardown(&server_id, session).await;
                superseded(generation, "commit")
            }
        }
    }
}

fn superseded(generation: u64, at: &str) -> TransitionOutcome {
    tracing::debug!(generation, at, "Discarding superseded MCP transition");
    TransitionOutcome::Superseded
}

async fn teardown(server_id: &str, session: Arc<dyn MCPSession>) {
    if let Err(e) = session.close().await {
        tracing::warn!(server_id = %server_id, error = %e, "Failed to close MCP session");
    }
}

fn spawn_teardown(server_id: String, session: Arc<dyn MCPSession>) {
    tokio::spawn(async move { teardown(&server_id, session).await });
}
