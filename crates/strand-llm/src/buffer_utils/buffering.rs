use std::collections::VecDeque;

/// Byte buffer that hands out complete newline-terminated lines
///
/// Chunk boundaries from the transport never line up with record
/// boundaries, so bytes accumulate here until a `\n` arrives.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line with its terminator (and any `\r`) removed
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the record will fail
    /// JSON parsing downstream and be skipped there.
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode_line(&line_bytes[..line_bytes.len() - 1]))
    }

    /// Trailing bytes without a terminator, flushed at end of stream
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        let line = decode_line(&rest);
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_buffer_basic() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"line1\nline2\r\n");

        assert_eq!(buffer.next_line().unwrap(), "line1");
        assert_eq!(buffer.next_line().unwrap(), "line2");
        assert!(buffer.next_line().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_line() {
        let mut buffer = CircularLineBuffer::with_capacity(64);

        buffer.extend(b"{\"type\":\"del");
        assert!(buffer.next_line().is_none());

        buffer.extend(b"ta\"}\n");
        assert_eq!(buffer.next_line().unwrap(), "{\"type\":\"delta\"}");
    }

    #[test]
    fn test_finish_flushes_unterminated_tail() {
        let mut buffer = CircularLineBuffer::with_capacity(64);
        buffer.extend(b"first\n{\"type\":\"done\"}");

        assert_eq!(buffer.next_line().unwrap(), "first");
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.finish().unwrap(), "{\"type\":\"done\"}");
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_finish_ignores_whitespace_tail() {
        let mut buffer = CircularLineBuffer::with_capacity(8);
        buffer.extend(b"  ");
        assert!(buffer.finish().is_none());
    }
}
