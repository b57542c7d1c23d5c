//! Line buffering for server-sent-event payloads.
//!
//! Frames from the network split lines (and UTF-8 sequences) at arbitrary
//! byte offsets. Bytes are held until a newline completes the line.

/// A meaningful SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Payload of a `data:` line.
    Data(String),
    /// The `data: [DONE]` end sentinel.
    Done,
}

/// Incremental `data:` line parser.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame; returns the complete lines it finished.
    pub fn push(&mut self, frame: &[u8]) -> Vec<SseLine> {
        self.buf.extend_from_slice(frame);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(parsed) = parse_line(&line) {
                out.push(parsed);
            }
        }
        out
    }

    /// End of input: parse whatever partial line remains.
    pub fn finish(&mut self) -> Vec<SseLine> {
        let rest = std::mem::take(&mut self.buf);
        parse_line(&rest).into_iter().collect()
    }

    /// Bytes held waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn parse_line(raw: &[u8]) -> Option<SseLine> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    // Comments, blank separators, and event:/id:/retry: fields carry no payload
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseLine::Done);
    }
    Some(SseLine::Data(data.to_string()))
}
