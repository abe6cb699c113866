//! Compose tool runner
//!
//! stdout goes to {log file, console}; stderr goes to {buffer, log file, console}.
//! The buffer becomes the error message when the tool exits non-zero.

use super::{ComposeOp, ComposeRunner, FanOutWriter, SharedBuffer};
use async_trait::async_trait;
use rtpanel_foundation::{Error, Result, DEFAULT_COMPOSE_COMMAND};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 8192;

/// Runs `<compose command> -f <file> <verb> [-d]`
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// argv prefix, e.g. `["docker", "compose"]`
    command: Vec<String>,
    /// Mirror output to this process's stdout/stderr
    console: bool,
}

impl ProcessRunner {
    pub fn new(command: Vec<String>) -> Self {
        let command = if command.is_empty() {
            vec![DEFAULT_COMPOSE_COMMAND.to_string()]
        } else {
            command
        };
        Self {
            command,
            console: true,
        }
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    fn open_log(log_path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to open log file {}: {}", log_path.display(), e),
                ))
            })
    }

    fn build_command(&self, op: ComposeOp, compose_path: &Path) -> Command {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..])
            .args(op.args(compose_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(vec![DEFAULT_COMPOSE_COMMAND.to_string()])
    }
}

/// Copy a child stream into its sinks.
///
/// A failing sink never stops the drain, otherwise the child could block on a
/// full pipe. Healthy sinks keep receiving every chunk.
async fn pump<R: AsyncRead + Unpin>(mut reader: R, mut sink: FanOutWriter, stream: &str) {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut warned = false;
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read {}: {}", stream, e);
                break;
            }
        };
        if let Err(e) = sink.write_all(&buf[..n]) {
            if !warned {
                warn!("Failed to write {} output: {}", stream, e);
                warned = true;
            }
        }
    }
    let _ = sink.flush();
}

#[async_trait]
impl ComposeRunner for ProcessRunner {
    async fn run(&self, op: ComposeOp, compose_path: &Path, log_path: &Path) -> Result<()> {
        let log_file = Self::open_log(log_path)?;
        let stderr_buf = SharedBuffer::new();

        let mut stdout_sink = FanOutWriter::new().with_sink(log_file.try_clone()?);
        let mut stderr_sink = FanOutWriter::new()
            .with_sink(stderr_buf.clone())
            .with_sink(log_file);
        if self.console {
            stdout_sink = stdout_sink.with_sink(std::io::stdout());
            stderr_sink = stderr_sink.with_sink(std::io::stderr());
        }

        info!(
            "Running {} {} for {}",
            self.command.join(" "),
            op,
            compose_path.display()
        );

        let mut child = match self.build_command(op, compose_path).spawn() {
            Ok(child) => child,
            Err(e) => {
                return Err(Error::Compose {
                    verb: op.verb().to_string(),
                    stderr: format!("failed to spawn {}: {}", self.command[0], e),
                })
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, _, _) = tokio::join!(
            child.wait(),
            async move {
                if let Some(out) = stdout {
                    pump(out, stdout_sink, "stdout").await;
                }
            },
            async move {
                if let Some(err) = stderr {
                    pump(err, stderr_sink, "stderr").await;
                }
            }
        );

        let status = status?;
        if status.success() {
            debug!("{} finished for {}", op, compose_path.display());
            Ok(())
        } else {
            Err(Error::Compose {
                verb: op.verb().to_string(),
                stderr: stderr_buf.contents(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Runner whose "compose tool" is a shell script receiving `-f <file> <verb> [-d]`
    fn script_runner(dir: &Path, body: &str) -> ProcessRunner {
        let script = dir.join("fake-compose.sh");
        std::fs::write(&script, body).unwrap();
        ProcessRunner::new(vec!["sh".to_string(), script.to_string_lossy().to_string()])
            .with_console(false)
    }

    #[tokio::test]
    async fn test_success_writes_log() {
        let dir = tempdir().unwrap();
        let runner = script_runner(dir.path(), "echo \"stdout $3 $4\"\necho \"warn $3\" >&2\n");
        let log = dir.path().join("run.log");

        runner
            .run(ComposeOp::Up, &dir.path().join("docker-compose.yml"), &log)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("stdout up -d"));
        assert!(content.contains("warn up"));
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let dir = tempdir().unwrap();
        let runner = script_runner(dir.path(), "echo building\necho \"no such image\" >&2\nexit 3\n");
        let log = dir.path().join("build.log");

        let err = runner
            .run(ComposeOp::Build, &dir.path().join("docker-compose.yml"), &log)
            .await
            .unwrap_err();

        assert_eq!(err.stderr(), Some("no such image\n"));
        assert_eq!(err.to_string(), "runtime operation failed:no such image\n");
        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("building"));
        assert!(content.contains("no such image"));
    }

    #[tokio::test]
    async fn test_log_is_truncated() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        std::fs::write(&log, "previous run output\n").unwrap();
        let runner = script_runner(dir.path(), "echo fresh\n");

        runner
            .run(ComposeOp::Down, &dir.path().join("docker-compose.yml"), &log)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&log).unwrap(), "fresh\n");
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_pump_keeps_feeding_healthy_sinks() {
        let captured = SharedBuffer::new();
        let sink = FanOutWriter::new()
            .with_sink(FullDisk)
            .with_sink(captured.clone());
        let output: Vec<u8> = (0..3 * READ_CHUNK).map(|i| b'a' + (i % 26) as u8).collect();

        pump(output.as_slice(), sink, "stderr").await;

        assert_eq!(captured.contents().as_bytes(), output.as_slice());
    }

    #[tokio::test]
    async fn test_missing_tool_is_compose_error() {
        let dir = tempdir().unwrap();
        let runner = ProcessRunner::new(vec!["/nonexistent/compose-tool".to_string()])
            .with_console(false);

        let err = runner
            .run(ComposeOp::Up, &dir.path().join("c.yml"), &dir.path().join("run.log"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Compose { .. }));
    }
}
