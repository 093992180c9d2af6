pub mod config;
pub mod message;
pub mod node;
pub mod policy;

pub use config::{BackendConfig, ChunkingConfig, LoggingConfig, RelayConfig, ReplyConfig};
pub use message::{Attachment, Citation, Message, MessageMeta, RouteMeta, Who};
pub use node::{Capability, Edge, Node, Port, PortRole};
pub use policy::{ChunkPolicy, NodeSettings, WebOptions};
