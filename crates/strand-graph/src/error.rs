use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node {0} does not reply")]
    NotAnAgent(String),

    #[error("delivery task panicked: {0}")]
    TaskPanicked(String),

    #[error("delivery task for {0} was dropped before completing")]
    TaskDropped(String),
}
