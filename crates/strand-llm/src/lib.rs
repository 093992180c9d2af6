pub mod backend;
pub mod buffer_utils;
pub mod continuation;
pub mod error;
pub mod resolver;
pub mod session;
pub mod streaming;
pub mod traits;
pub mod types;

pub use backend::{ClientFactory, HttpReplyClient};
pub use buffer_utils::{parse_ndjson_stream, CircularLineBuffer};
pub use continuation::{
    contains_sentinel, strip_sentinel, ContinuationController, ContinuationResult, MaterialWindow,
};
pub use error::{ReplyError, Result};
pub use resolver::{FallbackResolver, Resolved};
pub use session::{FallbackReason, StreamOutcome, StreamState, StreamingSession};
pub use streaming::StreamEvent;
pub use traits::{EventStream, ReplyClient, StreamObserver, StreamStart};
pub use types::{
    coerce_model, ChatReply, ChatTurn, Pagewise, ReplyRequest, ReplyResult, EMPTY_REPLY,
};
