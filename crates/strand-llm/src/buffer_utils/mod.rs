mod buffering;
mod ndjson_parser;

pub use buffering::CircularLineBuffer;
pub use ndjson_parser::{parse_event_line, parse_ndjson_stream};
