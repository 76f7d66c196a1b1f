use std::env;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use redgreenblue_plugin_api::{
    PluginCapabilities, PluginError, PluginResult, RewritePlugin, RewriteRequest,
};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const ENV_PREFIX: &str = "REDGREENBLUE_AI_";
const BINARY_ENV: &str = "REDGREENBLUE_AI_CLI_BIN";
const TIMEOUT_ENV: &str = "REDGREENBLUE_AI_CLI_TIMEOUT_SECS";
const DEFAULT_BINARY: &str = "redgreenblue-ai";

/// Plugin that pipes the request text through an external rewrite CLI.
///
/// The CLI receives the text on stdin and must print the full replacement on
/// stdout. Its environment is cleared except for `PATH`, `HOME` and any
/// `REDGREENBLUE_AI_*` variable of the host process.
#[derive(Debug, Clone)]
pub struct CommandRewriter {
    binary: OsString,
    args: Vec<OsString>,
    timeout: Duration,
    path: Option<OsString>,
    home: Option<OsString>,
    passthrough: Vec<(OsString, OsString)>,
}

impl CommandRewriter {
    /// Construct a rewriter configured from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let binary = env::var_os(BINARY_ENV).unwrap_or_else(|| OsString::from(DEFAULT_BINARY));
        let timeout = env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(seconds) => Some(seconds),
                Err(err) => {
                    warn!(value = %raw, error = %err, "ignoring invalid rewrite CLI timeout");
                    None
                }
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut passthrough = Vec::new();
        for (key, value) in env::vars_os() {
            if key.to_string_lossy().starts_with(ENV_PREFIX) {
                passthrough.push((key, value));
            }
        }

        Self {
            binary,
            args: Vec::new(),
            timeout: Duration::from_secs(timeout),
            path: env::var_os("PATH"),
            home: env::var_os("HOME"),
            passthrough,
        }
    }

    /// Construct a rewriter running `binary` with the given arguments.
    pub fn new<I, S>(binary: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            binary: binary.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::from_env()
        }
    }

    /// Override the time allowed for the CLI to answer.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, input: &str) -> PluginResult<String> {
        let mut command = Command::new(&self.binary);
        command.args(&self.args);
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        self.configure_environment(&mut command);

        let mut child = command
            .spawn()
            .map_err(|err| PluginError::message(format!("failed to spawn rewrite CLI: {err}")))?;

        // Drain both pipes before feeding stdin so a CLI that answers while
        // still reading never blocks on a full pipe.
        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);
        let stdin_handle = child.stdin.take().map(|mut stdin| {
            let input = input.to_owned();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        match child.wait_timeout(self.timeout) {
            Ok(Some(_)) => (),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PluginError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PluginError::message(format!(
                    "failed waiting on rewrite CLI: {err}"
                )));
            }
        }

        let status = child
            .wait()
            .map_err(|err| PluginError::message(format!("failed to reap rewrite CLI: {err}")))?;

        join_writer(stdin_handle)?;

        let stdout = join_reader(stdout_handle, "stdout")?;
        let stderr = join_reader(stderr_handle, "stderr")?;

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "terminated".to_string(), |c| c.to_string());
            return Err(PluginError::message(format!(
                "rewrite CLI failed with status {}: {}",
                code,
                stderr.trim()
            )));
        }

        Ok(strip_trailing_newline(stdout))
    }

    fn configure_environment(&self, command: &mut Command) {
        command.env_clear();
        if let Some(path) = &self.path {
            command.env("PATH", path);
        }
        if let Some(home) = &self.home {
            command.env("HOME", home);
        }
        for (key, value) in &self.passthrough {
            command.env(key, value);
        }
    }
}

impl Default for CommandRewriter {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl RewritePlugin for CommandRewriter {
    fn id(&self) -> &'static str {
        "command"
    }

    fn label(&self) -> &'static str {
        "External rewrite CLI"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::new(false, false)
    }

    async fn rewrite(&self, request: RewriteRequest) -> PluginResult<String> {
        debug!(
            binary = %self.binary.to_string_lossy(),
            bytes = request.text.len(),
            "running rewrite CLI"
        );
        let rewriter = self.clone();
        tokio::task::spawn_blocking(move || rewriter.run(&request.text))
            .await
            .map_err(|err| PluginError::message(format!("rewrite CLI task failed: {err}")))?
    }
}

fn spawn_reader<R>(mut stream: R) -> thread::JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

/// A CLI may exit without reading all of its input; only other write
/// failures are errors.
fn join_writer(handle: Option<thread::JoinHandle<io::Result<()>>>) -> PluginResult<()> {
    let Some(handle) = handle else {
        return Ok(());
    };
    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!("rewrite CLI closed stdin before reading all input");
            Ok(())
        }
        Ok(Err(err)) => Err(PluginError::message(format!(
            "failed to write to rewrite CLI stdin: {err}"
        ))),
        Err(_) => Err(PluginError::message(
            "failed to join rewrite CLI stdin writer",
        )),
    }
}

fn join_reader(
    handle: Option<thread::JoinHandle<io::Result<Vec<u8>>>>,
    stream: &str,
) -> PluginResult<String> {
    match handle {
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| {
                    PluginError::message(format!("failed to join rewrite CLI {stream} reader"))
                })?
                .map_err(|err| {
                    PluginError::message(format!("failed to read rewrite CLI {stream}: {err}"))
                })?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
        None => Ok(String::new()),
    }
}

/// CLIs conventionally end their output with a newline the document never had.
fn strip_trailing_newline(mut output: String) -> String {
    if output.ends_with('\n') {
        output.pop();
        if output.ends_with('\r') {
            output.pop();
        }
    }
    output
}
