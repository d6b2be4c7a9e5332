use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use stayopen::errors::{Result, StayOpenError};
use stayopen::exec::{BoxFuture, Command, CommandExecutor, CommandProcess, CommandResult};
use stayopen::protocol::{read_lines, CollectingHandler, MultiHandler, OutputHandler, EXECUTE, READY};
use stayopen::version::cache::VERSION_ARG;

/// What the fake answers to `<tool> -ver`.
#[derive(Debug, Clone)]
pub enum VersionReply {
    /// Exit 0 and print this text.
    Output(String),
    /// Exit with this status and print nothing.
    ExitCode(i32),
    /// Fail to spawn, as if the binary did not exist.
    NotFound,
}

/// Counters shared between a `FakeExecutor` and the processes it started.
#[derive(Debug, Default)]
pub struct FakeStats {
    pub version_queries: AtomicUsize,
    pub one_shot_runs: AtomicUsize,
    pub starts: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Arguments of every request, one-shot and stay-open alike.
    pub requests: Mutex<Vec<Vec<String>>>,
}

impl FakeStats {
    pub fn version_queries(&self) -> usize {
        self.version_queries.load(Ordering::SeqCst)
    }

    pub fn one_shot_runs(&self) -> usize {
        self.one_shot_runs.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }

    fn begin_request(&self, args: Vec<String>) {
        self.requests.lock().unwrap().push(args);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn end_request(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A fake executor that:
/// - answers version queries from a scripted `VersionReply`
/// - answers one-shot commands with canned output lines
/// - starts in-memory stay-open "processes" that speak the `-execute` /
///   `{ready}` protocol over a duplex pipe
/// - records everything in `FakeStats`.
pub struct FakeExecutor {
    version: Mutex<VersionReply>,
    response: Vec<String>,
    delay: Duration,
    failing_closes: AtomicUsize,
    crash_on_request: bool,
    stats: Arc<FakeStats>,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            version: Mutex::new(VersionReply::Output("12.40".to_string())),
            response: Vec::new(),
            delay: Duration::ZERO,
            failing_closes: AtomicUsize::new(0),
            crash_on_request: false,
            stats: Arc::new(FakeStats::default()),
        }
    }

    pub fn with_version(self, version: &str) -> Self {
        self.with_version_reply(VersionReply::Output(version.to_string()))
    }

    pub fn with_version_reply(self, reply: VersionReply) -> Self {
        self.set_version_reply(reply);
        self
    }

    /// Lines printed for every request (the `{ready}` marker is added by the
    /// stay-open emulator).
    pub fn with_response<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Time every version query and request takes before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The first `count` started processes fail when their stdin is closed.
    pub fn with_failing_closes(self, count: usize) -> Self {
        self.failing_closes.store(count, Ordering::SeqCst);
        self
    }

    /// Stay-open processes exit as soon as they receive a request, without
    /// answering.
    pub fn with_crash_on_request(mut self) -> Self {
        self.crash_on_request = true;
        self
    }

    pub fn set_version_reply(&self, reply: VersionReply) {
        *self.version.lock().unwrap() = reply;
    }

    pub fn stats(&self) -> Arc<FakeStats> {
        Arc::clone(&self.stats)
    }

    async fn answer_version(
        &self,
        command: &Command,
        handler: &mut (dyn OutputHandler + Send),
    ) -> Result<CommandResult> {
        self.stats.version_queries.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let reply = self.version.lock().unwrap().clone();
        match reply {
            VersionReply::Output(text) => feed(&text, handler).await.map(|out| CommandResult::new(0, out)),
            VersionReply::ExitCode(code) => Ok(CommandResult::new(code, "")),
            VersionReply::NotFound => Err(StayOpenError::ProcessNotFound {
                executable: command.executable().to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }
}

impl CommandExecutor for FakeExecutor {
    fn execute_with<'a>(
        &'a self,
        command: &'a Command,
        handler: &'a mut (dyn OutputHandler + Send),
    ) -> BoxFuture<'a, Result<CommandResult>> {
        Box::pin(async move {
            if command.arguments() == [VERSION_ARG] {
                return self.answer_version(command, handler).await;
            }

            self.stats.one_shot_runs.fetch_add(1, Ordering::SeqCst);
            self.stats.begin_request(command.arguments().to_vec());
            tokio::time::sleep(self.delay).await;
            self.stats.end_request();

            let text = self.response.join("\n");
            let output = feed(&text, handler).await?;
            Ok(CommandResult::new(0, output))
        })
    }

    fn start<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandProcess>> {
        Box::pin(async move {
            let idx = self.stats.starts.fetch_add(1, Ordering::SeqCst);
            let (client, server) = tokio::io::duplex(64 * 1024);
            let (reader, writer) = tokio::io::split(client);

            tokio::spawn(emulate_stay_open(
                server,
                self.response.clone(),
                self.delay,
                self.crash_on_request,
                Arc::clone(&self.stats),
            ));

            let label = format!("{}#{}", command.executable(), idx);
            let fail_close = self
                .failing_closes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            if fail_close {
                Ok(CommandProcess::from_streams(label, reader, FailingClose(writer)))
            } else {
                Ok(CommandProcess::from_streams(label, reader, writer))
            }
        })
    }
}

/// Run `text` through the same line splitter the real executor uses.
async fn feed(text: &str, handler: &mut (dyn OutputHandler + Send)) -> Result<String> {
    let mut capture = CollectingHandler::new();
    {
        let mut multi = MultiHandler::new(vec![&mut capture as &mut (dyn OutputHandler + Send), handler]);
        let mut reader = text.as_bytes();
        read_lines(&mut reader, &mut multi).await?;
    }
    Ok(capture.into_output())
}

/// Plays the tool's `-stay_open True -@ -` mode on the server end of a pipe.
async fn emulate_stay_open(
    server: DuplexStream,
    response: Vec<String>,
    delay: Duration,
    crash_on_request: bool,
    stats: Arc<FakeStats>,
) {
    let (reader, mut writer) = tokio::io::split(server);
    let mut lines = BufReader::new(reader).lines();
    let mut pending: Vec<String> = Vec::new();

    while let Ok(Some(line)) = lines.next_line().await {
        if line == EXECUTE {
            if crash_on_request {
                return;
            }

            stats.begin_request(std::mem::take(&mut pending));
            tokio::time::sleep(delay).await;
            stats.end_request();

            let mut out = String::new();
            for l in &response {
                out.push_str(l);
                out.push('\n');
            }
            out.push_str(READY);
            out.push('\n');
            if writer.write_all(out.as_bytes()).await.is_err() {
                return;
            }
            let _ = writer.flush().await;
        } else if line == "False" && pending.last().map(String::as_str) == Some("-stay_open") {
            stats.shutdowns.fetch_add(1, Ordering::SeqCst);
            return;
        } else {
            pending.push(line);
        }
    }
}

/// Writer whose shutdown always fails, to exercise close error paths.
struct FailingClose<W>(W);

impl<W: AsyncWrite + Unpin> AsyncWrite for FailingClose<W> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("simulated close failure")))
    }
}
