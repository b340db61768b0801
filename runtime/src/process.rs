//! External application execution with a hang timeout.
//!
//! [`ProcessExecutor`] spawns the application with piped output, drains both
//! pipes on background threads and waits at most the configured timeout.
//! An application that does not exit in time is killed and reported with a
//! message naming the timeout.

use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{Result, RuntimeError};

/// Default hang timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Runs an external application.
pub trait ApplicationExecutor {
    /// Runs `application` with `arguments`.
    ///
    /// With `wait_for_exit` the call blocks until the application exits and
    /// returns its standard output. Without it the application is started
    /// and left running; its exit status is collected in the background so
    /// it does not linger as a zombie.
    fn run(&self, wait_for_exit: bool, application: &str, arguments: &[String]) -> Result<String>;
}

/// Runs applications as child processes of the current process.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use automate_runtime::{ApplicationExecutor, ProcessExecutor};
///
/// let executor = ProcessExecutor::new(Duration::from_secs(2));
/// let output = executor.run(true, "git", &["--version".to_string()]).unwrap();
/// assert!(output.starts_with("git version"));
/// ```
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            working_dir: None,
        }
    }

    /// Runs applications from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, application: &str, arguments: &[String]) -> Command {
        let mut command = Command::new(application);
        command.args(arguments).stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }

    fn start(&self, application: &str, arguments: &[String]) -> Result<String> {
        let mut command = self.command(application, arguments);
        command.stdout(Stdio::null()).stderr(Stdio::null());
        let child = command
            .spawn()
            .map_err(|e| spawn_error(application, arguments, e))?;
        let pid = child.id();
        debug!(application, pid, "Started application without waiting");
        reap(application, child);
        Ok(format!("started application '{application}' (pid {pid})"))
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl ApplicationExecutor for ProcessExecutor {
    fn run(&self, wait_for_exit: bool, application: &str, arguments: &[String]) -> Result<String> {
        if !wait_for_exit {
            return self.start(application, arguments);
        }

        let mut command = self.command(application, arguments);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command
            .spawn()
            .map_err(|e| spawn_error(application, arguments, e))?;

        // Drain both pipes so a chatty child cannot block on a full buffer.
        let stdout_thread = child.stdout.take().map(drain);
        let stderr_thread = child.stderr.take().map(drain);

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                let stdout = collect(application, "stdout", stdout_thread);
                let stderr = collect(application, "stderr", stderr_thread);
                if status.success() {
                    return Ok(stdout.trim_end().to_string());
                }
                let message = match (stderr.trim(), status.code()) {
                    (text, _) if !text.is_empty() => text.to_string(),
                    (_, Some(code)) => format!("exited with status {code}"),
                    (_, None) => "terminated by signal".to_string(),
                };
                debug!(application, exit_code = ?status.code(), "Application failed");
                Err(RuntimeError::ApplicationFailed {
                    application: application.to_string(),
                    message,
                })
            }
            Ok(None) => {
                warn!(
                    application,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Application timed out, killing process"
                );
                let _ = child.kill();
                let _ = child.wait();
                Err(RuntimeError::ApplicationTimeout {
                    application: application.to_string(),
                    timeout_ms: self.timeout.as_millis(),
                })
            }
            Err(e) => {
                debug!(application, error = %e, "Failed to wait on application");
                let _ = child.kill();
                let _ = child.wait();
                Err(RuntimeError::io(application, e))
            }
        }
    }
}

fn spawn_error(application: &str, arguments: &[String], e: std::io::Error) -> RuntimeError {
    debug!(application, arguments = ?arguments, error = %e, "Failed to spawn application");
    if e.kind() == ErrorKind::NotFound {
        return RuntimeError::ApplicationNotFound(application.to_string());
    }
    RuntimeError::io(application, e)
}

/// Waits for a detached child on a background thread.
fn reap(application: &str, mut child: Child) {
    let application = application.to_string();
    std::thread::spawn(move || match child.wait() {
        Ok(status) => {
            debug!(application = %application, pid = child.id(), %status, "Detached application exited");
        }
        Err(e) => {
            warn!(application = %application, pid = child.id(), error = %e, "Failed to reap detached application");
        }
    });
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(
    application: &str,
    stream: &str,
    thread: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> String {
    let buf = thread
        .and_then(|t| t.join().ok())
        .and_then(|res| match res {
            Ok(buf) => Some(buf),
            Err(e) => {
                debug!(application, stream, error = %e, "Failed to read application output");
                None
            }
        })
        .unwrap_or_default();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Splits an argument string into words.
///
/// Words are separated by whitespace. Single quotes keep their contents
/// literally; inside double quotes a backslash escapes `"` and `\`; outside
/// quotes a backslash escapes any character.
///
/// # Errors
///
/// Returns [`RuntimeError::InvalidArguments`] for an unterminated quote or a
/// trailing backslash.
///
/// # Examples
///
/// ```
/// use automate_runtime::split_arguments;
///
/// let words = split_arguments(r#"build -t "my app" 'a b'"#).unwrap();
/// assert_eq!(words, ["build", "-t", "my app", "a b"]);
/// ```
pub fn split_arguments(raw: &str) -> Result<Vec<String>> {
    let invalid = |reason: &str| RuntimeError::InvalidArguments {
        arguments: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(invalid("unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(invalid("unterminated double quote")),
                        },
                        Some(c) => current.push(c),
                        None => return Err(invalid("unterminated double quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(invalid("trailing backslash")),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
