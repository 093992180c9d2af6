use serde::{Deserialize, Serialize};

/// What a node does with inbound traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Receives and records messages, never replies (human input, sections)
    #[default]
    PlainSink,
    /// Replies through the backend chat endpoints
    ChatAgent,
    /// Replies through the backend with web search enabled
    WebAgent,
}

impl Capability {
    /// Whether inbound messages trigger a backend reply
    pub fn is_agent(self) -> bool {
        matches!(self, Self::ChatAgent | Self::WebAgent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    In,
    Out,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Port {
    #[serde(default)]
    pub role: PortRole,
}

impl Port {
    pub fn new(role: PortRole) -> Self {
        Self { role }
    }
}

/// A participant in the message graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub capability: Capability,
    pub display_name: String,
    /// Document-section sink
    #[serde(default)]
    pub section: bool,
    #[serde(default = "default_ports")]
    pub ports: Vec<Port>,
}

fn default_ports() -> Vec<Port> {
    vec![Port::new(PortRole::In), Port::new(PortRole::Out)]
}

impl Node {
    /// Index of the default inbound port
    pub const IN: usize = 0;
    /// Index of the default outbound port
    pub const OUT: usize = 1;

    pub fn new(id: impl Into<String>, capability: Capability, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capability,
            display_name: display_name.into(),
            section: false,
            ports: default_ports(),
        }
    }

    pub fn chat_agent(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(id, Capability::ChatAgent, display_name)
    }

    pub fn web_agent(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(id, Capability::WebAgent, display_name)
    }

    pub fn sink(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(id, Capability::PlainSink, display_name)
    }

    pub fn section(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            section: true,
            ..Self::new(id, Capability::PlainSink, display_name)
        }
    }

    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = ports;
        self
    }

    /// Role of the port at `index`; unknown ports are permissive
    pub fn port_role(&self, index: usize) -> PortRole {
        self.ports.get(index).map(|p| p.role).unwrap_or_default()
    }
}

/// Directed wire between a port on one node and a port on another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from_node_id: String,
    pub to_node_id: String,
    #[serde(default = "out_port")]
    pub from_port: usize,
    #[serde(default = "in_port")]
    pub to_port: usize,
}

fn out_port() -> usize {
    Node::OUT
}

fn in_port() -> usize {
    Node::IN
}

impl Edge {
    /// Edge from the default out port of `from` to the default in port of `to`
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_node_id: from.into(),
            to_node_id: to.into(),
            from_port: Node::OUT,
            to_port: Node::IN,
        }
    }

    pub fn with_ports(mut self, from_port: usize, to_port: usize) -> Self {
        self.from_port = from_port;
        self.to_port = to_port;
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from_node_id == node_id || self.to_node_id == node_id
    }

    /// Label used in message metadata, e.g. `a->b`
    pub fn via(&self) -> String {
        format!("{}->{}", self.from_node_id, self.to_node_id)
    }
}
