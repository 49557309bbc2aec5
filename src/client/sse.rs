//! Incremental Server-Sent Events decoding.

/// One complete SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, `"message"` when absent.
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Splits a byte stream into SSE frames.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut line_start = 0;
        let mut search_from = self.scanned;

        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let line_end = search_from + offset;
            let line = String::from_utf8_lossy(&self.buffer[line_start..line_end])
                .trim_end_matches('\r')
                .to_string();
            if let Some(frame) = self.feed_line(&line) {
                frames.push(frame);
            }
            line_start = line_end + 1;
            search_from = line_start;
        }

        self.buffer.drain(..line_start);
        self.scanned = self.buffer.len();
        frames
    }

    /// Flush a final frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            self.scanned = 0;
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            if let Some(frame) = self.feed_line(&line) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {} // id / retry are not used
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: metadata\ndata: {\"run_id\":\"r1\"}\n\nevent: events\ndata: {}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "metadata");
        assert_eq!(frames[0].data, "{\"run_id\":\"r1\"}");
        assert_eq!(frames[1].event, "events");
    }

    #[test]
    fn frames_may_span_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: ev").is_empty());
        assert!(decoder.push(b"ents\r\ndata: {\"a\":").is_empty());
        let frames = decoder.push(b"1}\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "events".into(),
                data: "{\"a\":1}".into()
            }]
        );
    }

    #[test]
    fn split_utf8_is_reassembled() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&text[..split]).is_empty());
        let frames = decoder.push(&text[split..]);
        assert_eq!(frames[0].data, "caf\u{e9}");
        assert_eq!(frames[0].event, "message");
    }

    #[test]
    fn comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\ndata: a\ndata: b\n\n");
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn long_line_across_many_chunks() {
        let payload = "x".repeat(64 * 1024);
        let body = format!("event: events\ndata: {payload}\n\n");
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for piece in body.as_bytes().chunks(7) {
            frames.extend(decoder.push(piece));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.len(), payload.len());
        assert_eq!(frames[0].event, "events");
    }

    #[test]
    fn newline_after_scanned_prefix_is_found() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: abc").is_empty());
        assert!(decoder.push(b"def").is_empty());
        let frames = decoder.push(b"\n\ndata: next\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "abcdef");
        assert_eq!(frames[1].data, "next");
    }

    #[test]
    fn finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: end\ndata: null").is_empty());
        let frame = decoder.finish().unwrap();
        assert_eq!(frame.event, "end");
        assert_eq!(frame.data, "null");
        assert!(decoder.finish().is_none());
    }
}
