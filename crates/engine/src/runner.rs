// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script runner: drives a supervised process to a terminal state.
//!
//! Every run ends in exactly one persisted [`RunRecord`]. For streamed
//! runs the record is saved *before* the terminal event is sent, so a
//! client that sees the end of the stream can immediately read the
//! outcome back from the ledger.

use crate::session::{RunOutcome, RunSession};
use crate::supervisor::{ProcessState, ProcessSupervisor, SupervisorSettings};
use dm_core::{Actor, Clock, OutputLine, RunEvent, RunLedger, RunStatus, ScriptTarget, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events buffered between a streaming run and its consumer.
pub const EVENT_BUFFER: usize = 256;

/// Timing and elevation settings for script runs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub stream_timeout: Duration,
    pub run_timeout: Duration,
    pub poll_interval: Duration,
    pub kill_grace: Duration,
    pub elevate: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            stream_timeout: Duration::from_secs(300),
            run_timeout: Duration::from_secs(1800),
            poll_interval: Duration::from_millis(100),
            kill_grace: Duration::from_secs(2),
            elevate: vec!["/usr/bin/sudo".to_string(), "-n".to_string()],
        }
    }
}

impl RunnerConfig {
    dm_core::setters! {
        into {
            elevate: Vec<String>,
        }
        set {
            stream_timeout: Duration,
            run_timeout: Duration,
            poll_interval: Duration,
            kill_grace: Duration,
        }
    }

    fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            elevate: self.elevate.clone(),
            poll_interval: self.poll_interval,
            kill_grace: self.kill_grace,
        }
    }
}

/// How the supervision loop ended.
enum Ending {
    Exited(i32),
    TimedOut,
    Cancelled,
    Faulted(String),
}

/// Runs scripts and records their outcome in a [`RunLedger`].
pub struct ScriptRunner<C: Clock = SystemClock> {
    ledger: Arc<dyn RunLedger>,
    config: RunnerConfig,
    clock: C,
}

impl<C: Clock> ScriptRunner<C> {
    pub fn new(ledger: Arc<dyn RunLedger>, config: RunnerConfig, clock: C) -> Self {
        Self { ledger, config, clock }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn RunLedger> {
        &self.ledger
    }

    /// Start a streamed run on a background task and return its events.
    ///
    /// Dropping the receiver cancels the run: the process group is
    /// killed and the run is recorded as an `exception`.
    pub fn spawn_stream(self: &Arc<Self>, target: ScriptTarget, actor: Actor) -> mpsc::Receiver<RunEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            runner.stream(target, actor, tx).await;
        });
        rx
    }

    /// Streamed run under the stream budget. Output lines are relayed as
    /// they arrive and exactly one terminal event ends the sequence,
    /// unless the consumer has gone away.
    pub async fn stream(&self, target: ScriptTarget, actor: Actor, events: mpsc::Sender<RunEvent>) -> RunOutcome {
        self.execute(target, actor, self.config.stream_timeout, Some(&events)).await
    }

    /// Blocking run under the long budget. Returns the full output.
    pub async fn run(&self, target: ScriptTarget, actor: Actor) -> RunOutcome {
        self.execute(target, actor, self.config.run_timeout, None).await
    }

    async fn execute(
        &self,
        target: ScriptTarget,
        actor: Actor,
        budget: Duration,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> RunOutcome {
        let mut session = RunSession::begin(target, actor, self.clock.epoch_ms());
        tracing::info!(
            script_id = %session.target().id,
            path = %session.target().path().display(),
            actor = %session.actor(),
            budget_secs = budget.as_secs(),
            streamed = events.is_some(),
            "starting script run"
        );

        let settings = self.config.supervisor_settings();
        let mut supervisor =
            match ProcessSupervisor::start(session.target(), &settings, self.clock.clone(), budget) {
                Ok(supervisor) => supervisor,
                Err(e) => {
                    tracing::error!(script_id = %session.target().id, error = %e, "failed to start script");
                    let message = e.to_string();
                    let outcome = session.fail(&message, self.clock.epoch_ms());
                    return self.conclude(outcome, Some(RunEvent::InternalError { message }), events).await;
                }
            };

        let ending = loop {
            if events.is_some_and(|tx| tx.is_closed()) {
                break Ending::Cancelled;
            }
            match supervisor.poll().await {
                Ok(poll) => {
                    relay(&mut session, poll.output, events).await;
                    match poll.state {
                        ProcessState::StillRunning => {}
                        ProcessState::Exited(code) => break Ending::Exited(code),
                        ProcessState::TimedOut => break Ending::TimedOut,
                    }
                }
                Err(e) => break Ending::Faulted(e.to_string()),
            }
        };

        let script_id = session.target().id.clone();
        let (outcome, terminal) = match ending {
            Ending::Exited(code) => {
                let status = RunStatus::from_exit_code(code);
                tracing::info!(%script_id, code, %status, "script exited");
                let outcome = session.finish(status, Some(code), self.clock.epoch_ms());
                (outcome, Some(RunEvent::Completed { status }))
            }
            Ending::TimedOut => {
                tracing::warn!(%script_id, budget_secs = budget.as_secs(), "script exceeded its budget");
                supervisor.kill_tree().await;
                match supervisor.drain().await {
                    Ok(late) => relay(&mut session, late, events).await,
                    Err(e) => tracing::warn!(%script_id, error = %e, "lost output after timeout"),
                }
                let outcome = session.finish(RunStatus::Timeout, None, self.clock.epoch_ms());
                (outcome, Some(RunEvent::TimedOut { budget }))
            }
            Ending::Cancelled => {
                tracing::info!(%script_id, "client disconnected, terminating script");
                supervisor.kill_tree().await;
                (session.cancel(self.clock.epoch_ms()), None)
            }
            Ending::Faulted(message) => {
                tracing::error!(%script_id, error = %message, "supervision failed");
                supervisor.kill_tree().await;
                let outcome = session.fail(&message, self.clock.epoch_ms());
                (outcome, Some(RunEvent::InternalError { message }))
            }
        };

        self.conclude(outcome, terminal, events).await
    }

    /// Persist the record, then announce the terminal event.
    async fn conclude(
        &self,
        outcome: RunOutcome,
        terminal: Option<RunEvent>,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> RunOutcome {
        let terminal = match self.ledger.save(outcome.record.clone()) {
            Ok(()) => terminal,
            Err(e) => {
                tracing::error!(script_id = %outcome.record.script_id, error = %e, "failed to save run record");
                terminal.map(|_| RunEvent::InternalError { message: format!("failed to save run record: {e}") })
            }
        };
        if let (Some(tx), Some(event)) = (events, terminal) {
            let _ = tx.send(event).await;
        }
        outcome
    }
}

async fn relay(session: &mut RunSession, lines: Vec<OutputLine>, events: Option<&mpsc::Sender<RunEvent>>) {
    for line in lines {
        session.record_output(&line);
        if let Some(tx) = events {
            // A closed channel is noticed on the next tick.
            let _ = tx.send(RunEvent::Output(line)).await;
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
