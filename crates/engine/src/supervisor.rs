// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision of one elevated script process.
//!
//! The child is started as the leader of a fresh process group so that the
//! whole tree (the elevation wrapper, the script, and anything it forks) can
//! be signalled at once. Two reader tasks pump cleaned lines from stdout and
//! stderr into a single channel, which preserves the order in which lines
//! became available across both pipes.

use crate::error::SupervisorError;
use dm_core::{clean, Clock, Deadline, OutputLine, OutputStream, ScriptTarget};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// How long to keep collecting output after the leader exits.
///
/// Background jobs that inherited the pipes can hold them open forever.
const DRAIN_WINDOW: Duration = Duration::from_millis(500);

type Pumped = Result<OutputLine, SupervisorError>;

/// Knobs shared by every supervised process.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Program and arguments placed before the script path. Empty runs the
    /// script directly.
    pub elevate: Vec<String>,
    pub poll_interval: Duration,
    pub kill_grace: Duration,
}

/// What one supervision tick observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    StillRunning,
    Exited(i32),
    TimedOut,
}

/// Output that became available during a tick, plus the process state.
#[derive(Debug)]
pub struct Poll {
    pub output: Vec<OutputLine>,
    pub state: ProcessState,
}

/// A running script, its process group, and its output channel.
pub struct ProcessSupervisor<C: Clock> {
    child: Child,
    pgid: Pid,
    output: mpsc::UnboundedReceiver<Pumped>,
    output_open: bool,
    deadline: Deadline,
    clock: C,
    poll_interval: Duration,
    kill_grace: Duration,
    exit_code: Option<i32>,
}

impl<C: Clock> ProcessSupervisor<C> {
    /// Start `target` in a new process group with piped stdout and stderr.
    ///
    /// The deadline starts counting here.
    pub fn start(
        target: &ScriptTarget,
        settings: &SupervisorSettings,
        clock: C,
        budget: Duration,
    ) -> Result<Self, SupervisorError> {
        let path = target.path();
        ensure_executable(path)?;

        let mut cmd = match settings.elevate.split_first() {
            Some((program, args)) => {
                let mut cmd = Command::new(program);
                cmd.args(args).arg(path);
                cmd
            }
            None => Command::new(path),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let spawn_err = |source| SupervisorError::Spawn { path: path.to_path_buf(), source };
        let mut child = cmd.spawn().map_err(spawn_err)?;
        let pid = child
            .id()
            .ok_or_else(|| spawn_err(std::io::Error::other("child exited before its pid was read")))?;

        let stdout = child.stdout.take().ok_or(SupervisorError::MissingPipe(OutputStream::Stdout))?;
        let stderr = child.stderr.take().ok_or(SupervisorError::MissingPipe(OutputStream::Stderr))?;
        let (tx, rx) = mpsc::unbounded_channel();
        pump(stdout, OutputStream::Stdout, tx.clone());
        pump(stderr, OutputStream::Stderr, tx);

        tracing::debug!(script_id = %target.id, pid, "script process started");

        Ok(Self {
            child,
            pgid: Pid::from_raw(pid as i32),
            output: rx,
            output_open: true,
            deadline: Deadline::start(&clock, budget),
            clock,
            poll_interval: settings.poll_interval,
            kill_grace: settings.kill_grace,
            exit_code: None,
        })
    }

    pub fn pid(&self) -> i32 {
        self.pgid.as_raw()
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Exit code once the leader has been reaped.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Wait up to one poll interval for output or exit.
    ///
    /// The deadline is checked on both sides of the wait, so a run that
    /// has used up its budget reports `TimedOut` even if it exited during
    /// the wait.
    pub async fn poll(&mut self) -> Result<Poll, SupervisorError> {
        if let Some(code) = self.exit_code {
            return Ok(Poll { output: Vec::new(), state: ProcessState::Exited(code) });
        }
        if self.deadline.expired(&self.clock) {
            return Ok(Poll { output: Vec::new(), state: ProcessState::TimedOut });
        }

        let mut output = Vec::new();
        if self.output_open {
            match tokio::time::timeout(self.poll_interval, self.output.recv()).await {
                Ok(Some(item)) => {
                    output.push(item?);
                    self.drain_ready(&mut output)?;
                }
                Ok(None) => self.output_open = false,
                Err(_) => {}
            }
        } else if let Ok(status) =
            tokio::time::timeout(self.poll_interval, self.child.wait()).await
        {
            status.map_err(SupervisorError::Wait)?;
        }

        if self.deadline.expired(&self.clock) {
            return Ok(Poll { output, state: ProcessState::TimedOut });
        }

        let Some(status) = self.child.try_wait().map_err(SupervisorError::Wait)? else {
            return Ok(Poll { output, state: ProcessState::StillRunning });
        };
        let code = exit_code_of(status);
        self.exit_code = Some(code);
        self.drain_for(DRAIN_WINDOW, &mut output).await?;
        Ok(Poll { output, state: ProcessState::Exited(code) })
    }

    /// Collect whatever output is still buffered, for at most the drain window.
    pub async fn drain(&mut self) -> Result<Vec<OutputLine>, SupervisorError> {
        let mut output = Vec::new();
        self.drain_for(DRAIN_WINDOW, &mut output).await?;
        Ok(output)
    }

    /// Terminate the whole process group and reap the leader.
    ///
    /// SIGTERM first; SIGKILL to whatever is left after the grace period.
    /// A no-op once the leader has been reaped.
    pub async fn kill_tree(&mut self) {
        if self.exit_code.is_some() {
            return;
        }
        let pgid = self.pgid.as_raw();
        tracing::info!(pgid, "terminating process group");
        signal_group(self.pgid, Signal::SIGTERM);

        let status = match tokio::time::timeout(self.kill_grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(
                    pgid,
                    grace_ms = self.kill_grace.as_millis() as u64,
                    "process group outlived SIGTERM, sending SIGKILL"
                );
                signal_group(self.pgid, Signal::SIGKILL);
                self.child.wait().await
            }
        };

        // Members that ignored SIGTERM keep the group alive after the leader.
        if group_alive(self.pgid) {
            signal_group(self.pgid, Signal::SIGKILL);
        }

        self.exit_code = Some(match status {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                tracing::warn!(pgid, error = %e, "failed to reap killed process");
                -1
            }
        });
    }

    fn drain_ready(&mut self, output: &mut Vec<OutputLine>) -> Result<(), SupervisorError> {
        loop {
            match self.output.try_recv() {
                Ok(item) => output.push(item?),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    self.output_open = false;
                    return Ok(());
                }
            }
        }
    }

    async fn drain_for(
        &mut self,
        window: Duration,
        output: &mut Vec<OutputLine>,
    ) -> Result<(), SupervisorError> {
        if !self.output_open {
            return Ok(());
        }
        let until = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(until, self.output.recv()).await {
                Ok(Some(item)) => output.push(item?),
                Ok(None) => {
                    self.output_open = false;
                    return Ok(());
                }
                Err(_) => return Ok(()),
            }
        }
    }
}

impl<C: Clock> Drop for ProcessSupervisor<C> {
    fn drop(&mut self) {
        if self.exit_code.is_none() {
            tracing::warn!(pgid = self.pgid.as_raw(), "supervisor dropped before reaping, killing group");
            signal_group(self.pgid, Signal::SIGKILL);
        }
    }
}

fn ensure_executable(path: &Path) -> Result<(), SupervisorError> {
    let meta = std::fs::metadata(path)
        .map_err(|source| SupervisorError::Spawn { path: path.to_path_buf(), source })?;
    if !meta.is_file() || meta.permissions().mode() & 0o111 == 0 {
        return Err(SupervisorError::NotExecutable { path: path.to_path_buf() });
    }
    Ok(())
}

fn pump<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<Pumped>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = clean(&String::from_utf8_lossy(&buf));
                    if tx.send(Ok(OutputLine::new(stream, text))).is_err() {
                        break;
                    }
                }
                Err(source) => {
                    let _ = tx.send(Err(SupervisorError::StreamRead { stream, source }));
                    break;
                }
            }
        }
    });
}

fn signal_group(pgid: Pid, signal: Signal) {
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(
            pgid = pgid.as_raw(),
            signal = signal.as_str(),
            error = %e,
            "failed to signal process group"
        ),
    }
}

fn group_alive(pgid: Pid) -> bool {
    !matches!(killpg(pgid, None), Err(Errno::ESRCH))
}

fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
