pub mod builder;
pub mod chunking;
pub mod collaborators;
pub mod delivery;
pub mod error;
pub mod inflight;
pub mod memory;
pub mod queue;
pub mod relay;
pub mod router;
pub mod topology;

pub use builder::RelayBuilder;
pub use chunking::{ChunkPlan, ChunkStrategy, Destination};
pub use collaborators::{
    ConversationLog, EntryKind, LiveObserver, LogEntry, SectionSink, SettingsStore,
};
pub use error::RelayError;
pub use inflight::{InflightGuard, InflightRegistry};
pub use memory::{MemoryConversationLog, MemorySectionSink, MemorySettings};
pub use queue::{DestinationQueues, TaskHandle};
pub use relay::{Relay, ReplyContext};
pub use router::{GraphRouter, RouteTarget};
pub use topology::{Topology, TopologySnapshot};

// Re-export the data model used throughout the relay API
pub use strand_types::{
    Attachment, Capability, ChunkPolicy, Citation, Edge, Message, Node, NodeSettings, RouteMeta,
    Who,
};
