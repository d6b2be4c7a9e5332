// src/protocol/handler.rs

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::READY;
use crate::errors::Result;

/// Consumes process output one line at a time.
///
/// `line` is `None` once the stream has ended. The return value says whether
/// the reader should keep going.
pub trait OutputHandler {
    fn read_line(&mut self, line: Option<&str>) -> bool;
}

/// Feed lines from `reader` to `handler` until it asks to stop or the stream
/// ends.
///
/// Line terminators (`\n` or `\r\n`) are stripped. At end of stream the
/// handler receives a final `None`.
pub async fn read_lines<R>(reader: &mut R, handler: &mut (dyn OutputHandler + Send)) -> Result<()>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut buf = String::new();
    loop {
        buf.clear();
        if reader.read_line(&mut buf).await? == 0 {
            handler.read_line(None);
            return Ok(());
        }

        let line = buf.trim_end_matches(['\n', '\r']);
        if !handler.read_line(Some(line)) {
            return Ok(());
        }
    }
}

/// Stops at end of stream or on the `{ready}` marker.
#[derive(Debug, Default)]
pub struct StopHandler {
    ready_seen: bool,
    ended: bool,
}

impl StopHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last read ended on `{ready}` rather than end of stream.
    pub fn ready_seen(&self) -> bool {
        self.ready_seen
    }

    /// Whether the stream ended. False when another handler cut the read
    /// short before either marker.
    pub fn at_end(&self) -> bool {
        self.ended
    }
}

impl OutputHandler for StopHandler {
    fn read_line(&mut self, line: Option<&str>) -> bool {
        match line {
            None => {
                self.ended = true;
                false
            }
            Some(READY) => {
                self.ready_seen = true;
                false
            }
            Some(_) => true,
        }
    }
}

/// Captures every line it sees; used as the capture-all handler of the
/// executor and for raw diagnostics.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    lines: Vec<String>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Captured lines joined with `\n`.
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_output(self) -> String {
        self.lines.join("\n")
    }
}

impl OutputHandler for CollectingHandler {
    fn read_line(&mut self, line: Option<&str>) -> bool {
        match line {
            Some(line) => {
                self.lines.push(line.to_string());
                true
            }
            None => false,
        }
    }
}

/// Reads until end of stream and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DrainHandler;

impl OutputHandler for DrainHandler {
    fn read_line(&mut self, line: Option<&str>) -> bool {
        line.is_some()
    }
}

/// Fans one line out to several handlers.
///
/// Every handler sees every line, even after one of them asked to stop; the
/// read continues only if all of them agree.
pub struct MultiHandler<'a> {
    handlers: Vec<&'a mut (dyn OutputHandler + Send)>,
}

impl<'a> MultiHandler<'a> {
    pub fn new(handlers: Vec<&'a mut (dyn OutputHandler + Send)>) -> Self {
        Self { handlers }
    }
}

impl OutputHandler for MultiHandler<'_> {
    fn read_line(&mut self, line: Option<&str>) -> bool {
        let mut keep_reading = true;
        for handler in self.handlers.iter_mut() {
            keep_reading &= handler.read_line(line);
        }
        keep_reading
    }
}
