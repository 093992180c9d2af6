use crate::builder::RelayBuilder;
use crate::collaborators::{ConversationLog, LiveObserver, SectionSink, SettingsStore};
use crate::error::RelayError;
use crate::inflight::InflightRegistry;
use crate::queue::{DestinationQueues, TaskHandle};
use crate::router::GraphRouter;
use crate::topology::Topology;
use anyhow::Result;
use std::sync::Arc;
use strand_llm::{FallbackResolver, ReplyClient, ReplyResult};
use strand_types::{Edge, Node, RelayConfig, RouteMeta};
use tracing::info;

/// Text to reply to, and the node it came from (none for direct input)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub text: String,
    pub source_id: Option<String>,
}

impl ReplyContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: None,
        }
    }

    pub fn from_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

pub(crate) struct RelayInner {
    pub(crate) topology: Arc<Topology>,
    pub(crate) router: GraphRouter,
    pub(crate) queues: DestinationQueues,
    pub(crate) inflight: InflightRegistry,
    pub(crate) client: Arc<dyn ReplyClient>,
    pub(crate) resolver: FallbackResolver,
    pub(crate) log: Arc<dyn ConversationLog>,
    pub(crate) sections: Arc<dyn SectionSink>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) observer: Option<Arc<dyn LiveObserver>>,
    pub(crate) config: RelayConfig,
}

/// Entry point for moving messages through the node graph
///
/// Cheap to clone; clones share queues, in-flight replies and topology.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    pub fn builder() -> RelayBuilder {
        RelayBuilder::new()
    }

    pub(crate) fn from_parts(
        topology: Arc<Topology>,
        client: Arc<dyn ReplyClient>,
        log: Arc<dyn ConversationLog>,
        sections: Arc<dyn SectionSink>,
        settings: Arc<dyn SettingsStore>,
        observer: Option<Arc<dyn LiveObserver>>,
        config: RelayConfig,
    ) -> Self {
        let resolver = FallbackResolver::new(Arc::clone(&client), config.reply.safe_default_model.clone());
        Self {
            inner: Arc::new(RelayInner {
                router: GraphRouter::new(Arc::clone(&topology)),
                topology,
                queues: DestinationQueues::new(),
                inflight: InflightRegistry::new(),
                client,
                resolver,
                log,
                sections,
                settings,
                observer,
                config,
            }),
        }
    }

    /// Send `text` from `source_id` to every connected destination
    ///
    /// Returns immediately; each handle resolves when that destination has
    /// processed the message. Dropping the handles is fine.
    pub fn route(&self, source_id: &str, text: &str, meta: RouteMeta) -> Vec<TaskHandle> {
        self.inner.route(source_id, text, &meta)
    }

    /// Ask `owner_id` to reply to `ctx` without routing the result
    pub async fn request_reply(&self, owner_id: &str, ctx: ReplyContext) -> Result<ReplyResult> {
        let owner = self
            .inner
            .topology
            .node(owner_id)
            .ok_or_else(|| RelayError::UnknownNode(owner_id.to_string()))?;
        if !owner.capability.is_agent() {
            return Err(RelayError::NotAnAgent(owner_id.to_string()).into());
        }
        let (reply, _) = self.inner.reply_for(&owner, &ctx).await?;
        Ok(reply)
    }

    /// Cancel the owner's in-flight reply; false when nothing was running
    pub fn cancel(&self, owner_id: &str) -> bool {
        self.inner.inflight.cancel(owner_id)
    }

    pub fn has_active(&self, owner_id: &str) -> bool {
        self.inner.inflight.has_active(owner_id)
    }

    pub async fn key_status(&self) -> strand_llm::Result<bool> {
        self.inner.client.key_status().await
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.inner.topology
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn add_node(&self, node: Node) {
        info!(node = %node.id, capability = ?node.capability, "node added");
        self.inner.topology.add_node(node);
    }

    /// Remove a node, cancelling its reply and releasing its queue
    pub fn remove_node(&self, node_id: &str) -> Option<Node> {
        let removed = self.inner.topology.remove_node(node_id);
        self.inner.inflight.cancel(node_id);
        self.inner.queues.evict(node_id);
        if removed.is_some() {
            info!(node = %node_id, "node removed");
        }
        removed
    }

    pub fn connect(&self, edge: Edge) -> bool {
        self.inner.topology.connect(edge)
    }

    pub fn disconnect(&self, from: &str, to: &str) -> usize {
        self.inner.topology.disconnect(from, to)
    }
}
