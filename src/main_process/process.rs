//! Child process bridge
//!
//! Spawns a child with piped stdio, splits its stdout and stderr into lines on
//! dedicated reader tasks, and queues writes to its stdin in order. Readers never
//! touch surface state: they only hand lines over bounded channels.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, watch};

use super::Invocation;
use crate::{Error, Result};

/// Lines buffered between a reader task and its consumer
const LINE_BUFFER: usize = 256;

/// Time a child gets to exit on its own after SIGTERM
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Slack on top of the grace period for the forced kill to be reaped
const REAP_SLACK: Duration = Duration::from_millis(500);

/// How a child process ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    /// Terminating signal, when the child was killed
    pub signal: Option<i32>,
}

impl ExitReport {
    /// Exit code to propagate: the child's code, else the signal number
    pub fn exit_code(&self) -> i32 {
        self.code.or(self.signal).unwrap_or(1)
    }
}

impl From<std::process::ExitStatus> for ExitReport {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Line streams of a spawned child
pub struct ProcessOutput {
    pub stdout: mpsc::Receiver<String>,
    pub stderr: mpsc::Receiver<String>,
}

/// Owns one child process for its whole lifetime
pub struct ProcessBridge {
    program: String,
    pid: u32,
    stdin_tx: mpsc::UnboundedSender<String>,
    kill_tx: watch::Sender<bool>,
    exit_rx: watch::Receiver<Option<ExitReport>>,
}

impl ProcessBridge {
    /// Spawn the child and start its reader, writer and supervisor tasks
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(invocation: &Invocation) -> Result<(Self, ProcessOutput)> {
        let program = invocation.program.display().to_string();

        tracing::info!(
            "Spawning {} {:?} in {:?}",
            program,
            invocation.args,
            invocation.cwd
        );

        let mut child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.env.pairs().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: program.clone(),
                source,
            })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::Other(format!("{} exited before it could be tracked", program)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::PipeClosed(format!("Failed to capture stdin of {}", program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::PipeClosed(format!("Failed to capture stdout of {}", program)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::PipeClosed(format!("Failed to capture stderr of {}", program)))?;

        let (stdout_tx, stdout_rx) = mpsc::channel(LINE_BUFFER);
        let (stderr_tx, stderr_rx) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(read_lines(stdout, stdout_tx, format!("{} stdout", program)));
        tokio::spawn(read_lines(stderr, stderr_tx, format!("{} stderr", program)));

        let (stdin_tx, stdin_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_lines(stdin, stdin_rx, program.clone()));

        let (kill_tx, kill_rx) = watch::channel(false);
        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(supervise(child, kill_rx, exit_tx, program.clone()));

        tracing::debug!("{} running as pid {}", program, pid);

        let bridge = Self {
            program,
            pid,
            stdin_tx,
            kill_tx,
            exit_rx,
        };
        let output = ProcessOutput {
            stdout: stdout_rx,
            stderr: stderr_rx,
        };

        Ok((bridge, output))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Queue one line for the child's stdin; the newline is appended here
    ///
    /// Fails with `PipeClosed` once the child has exited or its stdin broke.
    pub fn write(&self, line: &str) -> Result<()> {
        if self.exit_rx.borrow().is_some() {
            return Err(Error::PipeClosed(format!("{} has exited", self.program)));
        }

        self.stdin_tx
            .send(line.to_string())
            .map_err(|_| Error::PipeClosed(format!("stdin of {} is closed", self.program)))
    }

    /// Check if the process is still running
    pub fn is_running(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// Exit report, once the child has ended
    pub fn try_exit(&self) -> Option<ExitReport> {
        *self.exit_rx.borrow()
    }

    /// Terminate the child: SIGTERM first, forced kill after a grace period
    ///
    /// Safe to call repeatedly and after the child already exited.
    pub fn kill(&self) {
        if !self.is_running() || *self.kill_tx.borrow() {
            return;
        }

        tracing::info!("Terminating {} (pid {})", self.program, self.pid);
        terminate(self.pid);
        let _ = self.kill_tx.send(true);
    }

    /// Wait for the child to exit
    pub async fn wait(&self) -> ExitReport {
        let mut exit_rx = self.exit_rx.clone();
        let report = match exit_rx.wait_for(Option::is_some).await {
            Ok(report) => (*report).unwrap_or_default(),
            Err(_) => ExitReport::default(),
        };
        report
    }

    /// Wait for the child to exit after `kill`, for at most the grace
    /// period plus the forced kill
    ///
    /// `None` when the child is still around when time runs out.
    pub async fn wait_with_grace(&self) -> Option<ExitReport> {
        tokio::time::timeout(KILL_GRACE + REAP_SLACK, self.wait()).await.ok()
    }
}

/// Ask the process with the given pid to terminate
///
/// On platforms without signals this is a no-op; the supervisor's forced kill
/// does the work instead.
pub fn terminate(pid: u32) {
    #[cfg(unix)]
    {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return;
        };
        // SAFETY: kill(2) takes plain integers and has no memory-safety requirements.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            tracing::debug!(
                "SIGTERM to pid {} failed: {}",
                pid,
                std::io::Error::last_os_error()
            );
        }
    }

    #[cfg(not(unix))]
    let _ = pid;
}

async fn read_lines<R>(stream: R, tx: mpsc::Sender<String>, label: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut consumer_gone = false;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                // Keep draining after the consumer left so the child never blocks on a full pipe
                if !consumer_gone && tx.send(line).await.is_err() {
                    tracing::debug!("Consumer of {} went away", label);
                    consumer_gone = true;
                }
            }
            Ok(None) => {
                tracing::debug!("{} closed (EOF)", label);
                break;
            }
            Err(e) => {
                tracing::error!("Error reading {}: {}", label, e);
                break;
            }
        }
    }
}

async fn write_lines(
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<String>,
    program: String,
) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');

        let result = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to write to stdin of {}: {}", program, e);
            break;
        }
    }
}

async fn supervise(
    mut child: Child,
    mut kill_rx: watch::Receiver<bool>,
    exit_tx: watch::Sender<Option<ExitReport>>,
    program: String,
) {
    let grace = if cfg!(unix) {
        KILL_GRACE
    } else {
        Duration::ZERO
    };

    let status = tokio::select! {
        status = child.wait() => status,
        // The borrow guard must not outlive this future
        () = async {
            let _ = kill_rx.wait_for(|requested| *requested).await;
        } => {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!("{} did not exit gracefully, killing...", program);
                    if let Err(e) = child.start_kill() {
                        tracing::error!("Failed to kill {}: {}", program, e);
                    }
                    child.wait().await
                }
            }
        }
    };

    let report = match status {
        Ok(status) => ExitReport::from(status),
        Err(e) => {
            tracing::error!("Failed to wait for {}: {}", program, e);
            ExitReport::default()
        }
    };

    tracing::info!("{} exited with {:?}", program, report);
    let _ = exit_tx.send(Some(report));
}
