//! # Strand
//!
//! Strand moves text between the nodes of a directed graph. Plain sinks
//! record what reaches them; agent nodes answer through a chat backend and
//! their replies travel onward along outbound edges.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strand::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let topology = Arc::new(Topology::new());
//!     topology.add_node(Node::sink("user", "You"));
//!     topology.add_node(Node::chat_agent("tutor", "Tutor"));
//!     topology.connect(Edge::new("user", "tutor"));
//!
//!     let relay = Relay::builder()
//!         .config(RelayConfig::new().with_backend(BackendConfig::new("http://localhost:8000")))
//!         .topology(topology)
//!         .build()?;
//!
//!     for handle in relay.route("user", "What is osmosis?", RouteMeta::new().who(Who::User)) {
//!         handle.join().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **strand-types**: nodes, edges, messages, policies and configuration
//! - **strand-llm**: backend client, NDJSON streaming, fallbacks and paged continuation
//! - **strand-graph**: routing, per-destination queues, chunking and the relay itself

pub use strand_graph as graph;
pub use strand_llm as llm;
pub use strand_types as types;

pub use strand_graph::{Relay, RelayBuilder, RelayError, ReplyContext, TaskHandle, Topology};
pub use strand_llm::{HttpReplyClient, ReplyClient, ReplyError, ReplyResult};
pub use strand_types::{Edge, Message, Node, RelayConfig, RouteMeta, Who};

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::graph::{
        ConversationLog, LiveObserver, MemoryConversationLog, MemorySectionSink, MemorySettings,
        SectionSink, SettingsStore,
    };
    pub use crate::llm::{ReplyClient, ReplyResult};
    pub use crate::types::{
        Attachment, BackendConfig, Capability, ChunkPolicy, Citation, Edge, Node, NodeSettings,
        RelayConfig, ReplyConfig, RouteMeta, Who,
    };
    pub use crate::{Relay, ReplyContext, Topology};
    pub use anyhow::Result;
}
