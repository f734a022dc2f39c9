//! Go toolchain discovery and diagnostic harvesting.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::diagnostics::CANNOT_CONVERT_MARKER;

/// Exit status `go build` reports when compilation failed with errors.
pub const DEFAULT_EXPECTED_EXIT_CODE: i32 = 2;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Go toolchain '{command}' not found. Install Go and ensure it is on PATH or set GOROOT.")]
    NotFound { command: String },
    #[error("Go toolchain override path is invalid: {path}")]
    InvalidOverride { path: PathBuf },
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while waiting for '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' compiled the generated source without errors (expected exit status {expected})")]
    UnexpectedSuccess { command: String, expected: i32 },
    #[error(
        "'{command}' exited with status {status} (expected {expected}){}: {stderr}",
        exit_code_hint(.status, .stderr)
    )]
    UnexpectedExit {
        command: String,
        status: i32,
        expected: i32,
        stderr: String,
    },
    #[error("'{command}' was terminated by a signal: {stderr}")]
    Terminated { command: String, stderr: String },
    #[error("'{command}' did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("'{command}' was cancelled")]
    Cancelled { command: String },
    #[error("could not read Go version from output: {0:?}")]
    VersionParse(String),
}

/// Raw diagnostic stream captured from one compiler run.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// A located `go` binary plus the rules for interpreting its exit status.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go_path: PathBuf,
    expected_exit_code: i32,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl GoToolchain {
    pub fn at(go_path: impl Into<PathBuf>) -> Self {
        Self {
            go_path: go_path.into(),
            expected_exit_code: DEFAULT_EXPECTED_EXIT_CODE,
            timeout: Some(DEFAULT_TIMEOUT),
            cancel: None,
        }
    }

    /// Locates `go`, honoring an explicit override before searching
    /// `GOROOT`, `PATH` and well-known installation roots.
    pub fn discover(override_path: Option<&Path>) -> Result<Self, HarvestError> {
        if let Some(path) = override_path {
            return validate_override(path).map(Self::at);
        }

        let go_path = find_go().ok_or_else(|| HarvestError::NotFound {
            command: go_executable().to_string(),
        })?;
        debug!(path = %go_path.display(), "discovered Go toolchain");
        Ok(Self::at(go_path))
    }

    pub fn with_expected_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    /// `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The child is killed as soon as `flag` becomes true.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn go_path(&self) -> &Path {
        &self.go_path
    }

    pub fn expected_exit_code(&self) -> i32 {
        self.expected_exit_code
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `go version` and returns the release token, e.g. `go1.22.3`.
    pub fn version(&self) -> Result<String, HarvestError> {
        let output = Command::new(&self.go_path)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| HarvestError::Spawn {
                command: format!("{} version", self.go_path.display()),
                source,
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        parse_go_version(&text)
            .map(str::to_string)
            .ok_or_else(|| HarvestError::VersionParse(text.trim().to_string()))
    }

    /// Arguments passed to `go`: type-check without an error limit and
    /// discard any produced binary.
    pub fn build_args(&self, source: &Path) -> Vec<String> {
        vec![
            "build".to_string(),
            "-gcflags=-e".to_string(),
            "-o".to_string(),
            null_sink().to_string(),
            source.display().to_string(),
        ]
    }

    pub fn command_line(&self, source: &Path) -> String {
        let mut line = self.go_path.display().to_string();
        for arg in self.build_args(source) {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    /// Compiles `source`, expecting it to fail, and returns the compiler's
    /// standard error.
    pub fn harvest(&self, source: &Path) -> Result<Diagnostics, HarvestError> {
        let command_line = self.command_line(source);
        info!(command = %command_line, "invoking Go toolchain");

        let mut command = Command::new(&self.go_path);
        command
            .args(self.build_args(source))
            .env_remove("GOFLAGS")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Own process group, so `compile` dies with `go` on timeout or cancel.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| HarvestError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        // Drained separately so a large diagnostic stream cannot fill the
        // pipe and stall the child.
        let stderr_pipe = child.stderr.take();
        let reader = thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut buffer = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buffer)?;
            }
            Ok(buffer)
        });

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    kill_process_tree(&mut child);
                    return Err(HarvestError::Wait {
                        command: command_line,
                        source,
                    });
                }
            }

            if self.is_cancelled() {
                kill_process_tree(&mut child);
                warn!(command = %command_line, "toolchain invocation cancelled");
                return Err(HarvestError::Cancelled {
                    command: command_line,
                });
            }

            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    kill_process_tree(&mut child);
                    return Err(HarvestError::Timeout {
                        command: command_line,
                        timeout,
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        let elapsed = start.elapsed();
        let stderr = collect_stderr(reader, &command_line)?;

        let exit_code = classify_exit(&command_line, status, self.expected_exit_code, &stderr)?;
        debug!(
            exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            lines = stderr.lines().count(),
            "toolchain finished"
        );

        Ok(Diagnostics {
            stderr,
            exit_code,
            elapsed,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Joins the stderr reader. A failed or panicked read is an error, never a
/// shorter diagnostic stream.
fn collect_stderr(
    reader: thread::JoinHandle<io::Result<Vec<u8>>>,
    command: &str,
) -> Result<String, HarvestError> {
    let bytes = reader
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("stderr reader thread panicked")))
        .map_err(|source| HarvestError::Wait {
            command: command.to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Kills the child's whole process group, then reaps the child.
fn kill_process_tree(child: &mut Child) {
    kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // SAFETY: killpg only sends a signal; the child leads its own group
    // because it was spawned with `process_group(0)`.
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Points at `--expected-exit-code` when the run did produce conversion
/// errors; newer `go build` releases report them with status 1.
fn exit_code_hint(status: &i32, stderr: &str) -> String {
    if stderr.contains(CANNOT_CONVERT_MARKER) {
        format!(
            "; the compiler did report conversion errors, rerun with --expected-exit-code {status} \
             or set toolchain.expected_exit_code = {status}"
        )
    } else {
        String::new()
    }
}

/// Only the documented "errors reported" status counts as success.
fn classify_exit(
    command: &str,
    status: ExitStatus,
    expected: i32,
    stderr: &str,
) -> Result<i32, HarvestError> {
    match status.code() {
        Some(code) if code == expected => Ok(code),
        Some(0) => Err(HarvestError::UnexpectedSuccess {
            command: command.to_string(),
            expected,
        }),
        Some(code) => Err(HarvestError::UnexpectedExit {
            command: command.to_string(),
            status: code,
            expected,
            stderr: stderr.trim().to_string(),
        }),
        None => Err(HarvestError::Terminated {
            command: command.to_string(),
            stderr: stderr.trim().to_string(),
        }),
    }
}

/// Extracts `go1.22.3` from `go version go1.22.3 linux/amd64`.
pub fn parse_go_version(output: &str) -> Option<&str> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("go version ")?;
        rest.split_whitespace().next().filter(|token| {
            token
                .strip_prefix("go")
                .is_some_and(|tail| tail.starts_with(|ch: char| ch.is_ascii_digit()))
                || token.starts_with("devel")
        })
    })
}

fn validate_override(path: &Path) -> Result<PathBuf, HarvestError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(path.to_path_buf()),
        _ => Err(HarvestError::InvalidOverride {
            path: path.to_path_buf(),
        }),
    }
}

fn find_go() -> Option<PathBuf> {
    find_go_from_env()
        .or_else(find_go_in_path)
        .or_else(search_known_installations)
}

fn find_go_from_env() -> Option<PathBuf> {
    let root = env::var_os("GOROOT")?;
    go_from_root(Path::new(&root))
}

fn find_go_in_path() -> Option<PathBuf> {
    which::which(go_executable()).ok()
}

fn search_known_installations() -> Option<PathBuf> {
    known_go_roots()
        .into_iter()
        .find_map(|root| go_from_root(&root))
}

fn known_go_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    #[cfg(target_os = "windows")]
    {
        roots.push(PathBuf::from(r"C:\Program Files\Go"));
        roots.push(PathBuf::from(r"C:\Go"));
    }

    #[cfg(target_os = "macos")]
    {
        roots.push(PathBuf::from("/usr/local/go"));
        roots.push(PathBuf::from("/opt/homebrew/opt/go/libexec"));
        roots.push(PathBuf::from("/usr/local/opt/go/libexec"));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        roots.push(PathBuf::from("/usr/local/go"));
        roots.push(PathBuf::from("/usr/lib/go"));
        roots.push(PathBuf::from("/opt/go"));
        roots.push(PathBuf::from("/snap/go/current"));
    }

    roots
}

fn go_from_root(root: &Path) -> Option<PathBuf> {
    let exe_name = go_executable();

    let candidate = root.join("bin").join(exe_name);
    if candidate.is_file() {
        return Some(candidate);
    }

    if root.file_name() == Some(OsStr::new(exe_name)) && root.is_file() {
        return Some(root.to_path_buf());
    }

    None
}

fn go_executable() -> &'static str {
    if cfg!(windows) { "go.exe" } else { "go" }
}

fn null_sink() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}
