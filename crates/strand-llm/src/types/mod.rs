mod reply;
mod request;

pub use reply::{ChatReply, ReplyResult, EMPTY_REPLY};
pub use request::{coerce_model, ChatTurn, Pagewise, ReplyRequest};
