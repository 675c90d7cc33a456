//! Subprocess transport.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::{
    CaptureMode, Connection, DiagnosticSink, RawOutcome, Request, Target, append_diagnostics,
};
use crate::error::{ProviderError, Result};

/// How often a child with a deadline is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs requests as child processes.
///
/// The request's command is appended to an optional prefix (`ssh host`,
/// `sudo -u postgres`, ...) and executed directly, without a shell.
///
/// ```rust,no_run
/// use cloudwire_provider::{Connection, ProcessConnection, Request};
///
/// let mut conn = ProcessConnection::builder("local").build();
/// let outcome = conn.request(&Request::command(["uname", "-a"]))?;
/// println!("{}", outcome.body);
/// # Ok::<(), cloudwire_provider::ProviderError>(())
/// ```
pub struct ProcessConnection {
    provider: &'static str,
    command_prefix: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
    diagnostics: Option<DiagnosticSink>,
    connected: bool,
}

/// Builder for [`ProcessConnection`].
pub struct ProcessConnectionBuilder {
    provider: &'static str,
    command_prefix: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
    diagnostics: Option<DiagnosticSink>,
}

impl ProcessConnectionBuilder {
    fn new(provider: &'static str) -> Self {
        Self {
            provider,
            command_prefix: Vec::new(),
            env: BTreeMap::new(),
            timeout: None,
            diagnostics: None,
        }
    }

    /// Arguments placed before every request's command.
    #[must_use]
    pub fn command_prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    /// Environment variable set for every child (per-request values win).
    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Hard deadline per request. The child is killed when it expires.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Transcript destination, one record per request.
    #[must_use]
    pub fn diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn build(self) -> ProcessConnection {
        ProcessConnection {
            provider: self.provider,
            command_prefix: self.command_prefix,
            env: self.env,
            timeout: self.timeout,
            diagnostics: self.diagnostics,
            connected: false,
        }
    }
}

impl ProcessConnection {
    pub fn builder(provider: &'static str) -> ProcessConnectionBuilder {
        ProcessConnectionBuilder::new(provider)
    }

    fn argv(&self, request: &Request) -> Result<Vec<String>> {
        let Target::Command(args) = &request.target else {
            return Err(ProviderError::InvalidParameter {
                provider: self.provider.to_string(),
                param: "target".to_string(),
                detail: "process connections execute commands, not URL paths".to_string(),
            });
        };
        let argv: Vec<String> = self
            .command_prefix
            .iter()
            .chain(args)
            .cloned()
            .collect();
        if argv.is_empty() {
            return Err(ProviderError::InvalidParameter {
                provider: self.provider.to_string(),
                param: "target".to_string(),
                detail: "empty command".to_string(),
            });
        }
        Ok(argv)
    }

    fn spawn(&self, argv: &[String], request: &Request, silent: bool) -> Result<Child> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ProviderError::transport(self.provider, "empty command"))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&self.env)
            .envs(&request.env)
            .stdin(if stdin_data(request).is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if silent {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|e| {
            ProviderError::transport(self.provider, format!("failed to spawn '{program}': {e}"))
        })?;

        if let (Some(data), Some(stdin)) = (stdin_data(request), child.stdin.take()) {
            feed_stdin(self.provider, stdin, data.to_string());
        }
        Ok(child)
    }

    fn run_captured(&self, argv: &[String], request: &Request) -> Result<RawOutcome> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut child = self.spawn(argv, request, false)?;

        let (tx, rx) = mpsc::channel();
        let mut readers = 0;
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, Stream::Stdout, tx.clone());
            readers += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, Stream::Stderr, tx.clone());
            readers += 1;
        }
        drop(tx);

        let status = self.wait(&mut child, deadline)?;
        let (stdout, stderr) = self.collect_output(&rx, readers, deadline)?;

        Ok(RawOutcome::new(exit_code(status), stdout).with_diagnostic(stderr))
    }

    fn run_silent(&self, argv: &[String], request: &Request) -> Result<RawOutcome> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut child = self.spawn(argv, request, true)?;
        let status = self.wait(&mut child, deadline)?;
        Ok(RawOutcome::new(exit_code(status), ""))
    }

    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus> {
        let Some(deadline) = deadline else {
            return child
                .wait()
                .map_err(|e| ProviderError::transport(self.provider, e));
        };

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    if let Err(e) = child.kill() {
                        log::warn!("[{}] Failed to kill child {}: {e}", self.provider, child.id());
                    }
                    let _ = child.wait();
                    return Err(self.timed_out());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ProviderError::transport(self.provider, e)),
            }
        }
    }

    /// Waits for both reader threads. The deadline also bounds this phase, since
    /// a surviving grandchild can hold the pipes open after the child exits.
    fn collect_output(
        &self,
        rx: &Receiver<(Stream, Vec<u8>)>,
        readers: usize,
        deadline: Option<Instant>,
    ) -> Result<(String, String)> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        for _ in 0..readers {
            let received = match deadline {
                Some(deadline) => rx
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .map_err(|_| self.timed_out())?,
                None => rx.recv().map_err(|_| {
                    ProviderError::transport(self.provider, "output reader stopped unexpectedly")
                })?,
            };
            match received {
                (Stream::Stdout, bytes) => stdout = bytes,
                (Stream::Stderr, bytes) => stderr = bytes,
            }
        }
        Ok((
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }

    fn timed_out(&self) -> ProviderError {
        let timeout = self.timeout.unwrap_or_default();
        ProviderError::transport(
            self.provider,
            format!("command timed out after {}ms", timeout.as_millis()),
        )
    }
}

impl Connection for ProcessConnection {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn connect(&mut self) -> Result<()> {
        if !self.connected {
            if self.command_prefix.iter().any(String::is_empty) {
                return Err(ProviderError::InvalidParameter {
                    provider: self.provider.to_string(),
                    param: "command_prefix".to_string(),
                    detail: "prefix contains an empty argument".to_string(),
                });
            }
            self.connected = true;
        }
        Ok(())
    }

    fn request(&mut self, request: &Request) -> Result<RawOutcome> {
        self.connect()?;
        let argv = self.argv(request)?;
        let invocation = render_command(&argv);
        log::debug!("[{}] exec {invocation}", self.provider);

        let result = match request.capture {
            CaptureMode::Captured => self.run_captured(&argv, request),
            CaptureMode::Silent => self.run_silent(&argv, request),
        };

        match &result {
            Ok(outcome) => log::debug!("[{}] exit status {}", self.provider, outcome.status),
            Err(e) => log::warn!("[{}] {e}", self.provider),
        }
        let record = transcript(&invocation, request.capture, &result);
        append_diagnostics(&mut self.diagnostics, self.provider, &record);
        result
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R>(mut source: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = source.read_to_end(&mut buf) {
            log::warn!("Failed to read child output: {e}");
        }
        let _ = tx.send((stream, buf));
    });
}

/// Writes `data` on its own thread so a child that fills its stdout pipe before
/// draining stdin cannot deadlock the caller.
fn feed_stdin(provider: &'static str, mut stdin: ChildStdin, data: String) {
    thread::spawn(move || {
        if let Err(e) = stdin.write_all(data.as_bytes()) {
            log::warn!("[{provider}] Failed to write child stdin: {e}");
        }
    });
}

fn stdin_data(request: &Request) -> Option<&str> {
    request.body.as_deref().filter(|data| !data.is_empty())
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn render_command(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

fn transcript(invocation: &str, capture: CaptureMode, result: &Result<RawOutcome>) -> String {
    let mut record = format!("$ {invocation}\n");
    match result {
        Ok(outcome) => {
            let _ = writeln!(record, "# returncode is {}", outcome.status);
            if capture == CaptureMode::Silent {
                record.push_str("# output discarded\n");
            } else {
                let _ = write!(
                    record,
                    "# -------- begin stdout ----------\n{}\
                     # -------- begin stderr ----------\n{}\
                     # -------- end ----------\n",
                    with_newline(&outcome.body),
                    with_newline(&outcome.diagnostic)
                );
            }
        }
        Err(e) => {
            let _ = writeln!(record, "# failed: {e}");
        }
    }
    record
}

fn with_newline(s: &str) -> String {
    if s.is_empty() || s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{s}\n")
    }
}
