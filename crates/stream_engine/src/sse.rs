use bytes::{Buf, BytesMut};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
    /// Last event id seen on the stream, carried forward across frames;
    /// `None` before any id or after an empty `id:` line.
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder. Chunks may split lines (and
/// `\r\n` pairs) at any byte.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_id: Option<String>,
    skip_lf: bool,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder whose last event id starts at `last_event_id`.
    pub fn resuming(last_event_id: Option<String>) -> Self {
        Self {
            last_id: last_event_id,
            ..Self::default()
        }
    }

    /// Feeds raw bytes and returns every frame completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        if !self.started {
            if self.buffer.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.buffer) {
                return Vec::new();
            }
            if self.buffer.starts_with(UTF8_BOM) {
                self.buffer.advance(UTF8_BOM.len());
            }
            self.started = true;
        }

        let mut frames = Vec::new();
        while let Some(line) = self.next_line() {
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn next_line(&mut self) -> Option<String> {
        if self.skip_lf && !self.buffer.is_empty() {
            if self.buffer[0] == b'\n' {
                self.buffer.advance(1);
            }
            self.skip_lf = false;
        }

        let end = self
            .buffer
            .iter()
            .position(|&byte| byte == b'\n' || byte == b'\r')?;
        let line = self.buffer.split_to(end);
        let terminator = self.buffer[0];
        self.buffer.advance(1);
        if terminator == b'\r' {
            match self.buffer.first().copied() {
                Some(b'\n') => self.buffer.advance(1),
                Some(_) => {}
                None => self.skip_lf = true,
            }
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(index) => {
                let value = &line[index + 1..];
                (&line[..index], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            // An empty id resets it.
            "id" if !value.contains('\0') => {
                self.last_id = (!value.is_empty()).then(|| value.to_string());
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        Some(SseFrame {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}
