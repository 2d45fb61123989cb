//! Incremental server-sent-events parser.
//!
//! Feed raw transport chunks in as they arrive; complete messages come
//! out in receipt order. Chunk boundaries fall anywhere — mid-line,
//! mid-UTF-8 — so the parser buffers bytes and only interprets whole
//! lines. Per the SSE format: `data:` lines accumulate (joined with
//! newlines), an empty line dispatches, `:` lines are comments, and
//! unknown fields (`id:`, `retry:`, ...) are ignored.

/// One dispatched SSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// Value of the last `event:` field, if any.
    pub event: Option<String>,
    /// Joined `data:` payload.
    pub data: String,
}

/// Stateful line-buffering parser. Create one per stream.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns all messages completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(message) = self.dispatch() {
                    messages.push(message);
                }
            } else {
                self.field(line);
            }
        }
        messages
    }

    fn field(&mut self, line: &str) {
        if line.starts_with(':') {
            return; // comment / keep-alive
        }
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match name {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event_name = Some(value.to_string()),
            _ => {} // id, retry, unknown fields
        }
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        if self.data_lines.is_empty() {
            self.event_name = None;
            return None;
        }
        Some(SseMessage {
            event: self.event_name.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b"data: {\"type\":\"progress\",\"percent\":10}\n\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "{\"type\":\"progress\",\"percent\":10}");
        assert_eq!(messages[0].event, None);
    }

    #[test]
    fn chunk_split_mid_line() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"type\":\"pro").is_empty());
        assert!(parser.feed(b"gress\",\"percent\":50}").is_empty());
        let messages = parser.feed(b"\n\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "{\"type\":\"progress\",\"percent\":50}");
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b"data: one\n\ndata: two\n\n");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].data, "one");
        assert_eq!(messages[1].data, "two");
    }

    #[test]
    fn multiline_data_joined() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b"data: first\ndata: second\n\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "first\nsecond");
    }

    #[test]
    fn crlf_line_endings() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b"data: payload\r\n\r\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "payload");
    }

    #[test]
    fn comments_and_unknown_fields_ignored() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b": keep-alive\nid: 7\nretry: 3000\ndata: payload\n\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "payload");
    }

    #[test]
    fn event_field_captured() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b"event: extraction\ndata: payload\n\n");
        assert_eq!(messages[0].event.as_deref(), Some("extraction"));
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"\n\n\n").is_empty());
    }

    #[test]
    fn data_without_space_after_colon() {
        let mut parser = SseParser::new();
        let messages = parser.feed(b"data:tight\n\n");
        assert_eq!(messages[0].data, "tight");
    }

    #[test]
    fn event_name_resets_between_messages() {
        let mut parser = SseParser::new();
        let first = parser.feed(b"event: special\ndata: a\n\n");
        assert_eq!(first[0].event.as_deref(), Some("special"));
        let second = parser.feed(b"data: b\n\n");
        assert_eq!(second[0].event, None);
    }

    #[test]
    fn byte_by_byte_feeding() {
        let mut parser = SseParser::new();
        let input = b"data: slow\n\n";
        let mut messages = Vec::new();
        for byte in input {
            messages.extend(parser.feed(&[*byte]));
        }
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, "slow");
    }
}
