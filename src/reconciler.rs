// src/reconciler.rs
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::config::CliSettings;
use crate::parser::{self, Connection};
use crate::runner::{CommandRunner, RunError};
use crate::status::{ModelGuard, Status, StatusModel};

const STATUS_ARGS: &[&str] = &["status"];
const SETTINGS_ARGS: &[&str] = &["settings"];

/// Brings the status model in line with what the CLI reports.
pub struct Reconciler<R> {
    model: Arc<StatusModel>,
    runner: Arc<R>,
    settings: CliSettings,
}

impl<R: CommandRunner> Reconciler<R> {
    pub fn new(model: Arc<StatusModel>, runner: Arc<R>, settings: CliSettings) -> Self {
        Self {
            model,
            runner,
            settings,
        }
    }

    pub fn model(&self) -> &Arc<StatusModel> {
        &self.model
    }

    pub fn settings(&self) -> &CliSettings {
        &self.settings
    }

    pub(crate) async fn exec(&self, timeout: Duration, args: &[&str]) -> Result<String, RunError> {
        self.runner.run(timeout, &self.settings.program, args).await
    }

    /// Runs one full cycle and returns the committed status.
    pub async fn reconcile(&self) -> Status {
        let mut guard = self.model.lock().await;
        self.reconcile_locked(&mut guard).await
    }

    /// Runs one cycle with exclusive access the caller already holds.
    ///
    /// Fields parsed earlier in the cycle survive a later sub-query failing;
    /// only the status is degraded.
    pub async fn reconcile_locked(&self, guard: &mut ModelGuard<'_>) -> Status {
        let (_, previous) = guard.current();

        let status_out = match self.exec(self.settings.status_timeout, STATUS_ARGS).await {
            Ok(out) => out,
            Err(err) => {
                let status = classify_failure("update on status", &err);
                guard.commit(status, previous);
                return status;
            }
        };

        let mut next = previous.clone();
        match parser::parse_connection(&status_out) {
            Some(Connection::Connected) => {
                next.connected = true;
                next.server_name = parser::parse_server(&status_out);
            }
            Some(Connection::Disconnected) => {
                next.connected = false;
                next.server_name = None;
            }
            None => {
                warn!(
                    "update on status: unrecognized connection status in {:?}",
                    status_out.trim()
                );
                guard.commit(Status::Stalled, previous);
                return Status::Stalled;
            }
        }

        let settings_out = match self.exec(self.settings.status_timeout, SETTINGS_ARGS).await {
            Ok(out) => out,
            Err(err) => {
                let status = classify_failure("update on settings", &err);
                guard.commit(status, next);
                return status;
            }
        };

        let mut status = Status::Done;
        match parser::parse_kill_switch(&settings_out) {
            Some(enabled) => next.kill_switch = enabled,
            None => {
                warn!(
                    "update on settings: unrecognized kill switch in {:?}",
                    settings_out.trim()
                );
                status = Status::Stalled;
            }
        }
        match parser::parse_meshnet(&settings_out) {
            Some(enabled) => next.meshnet = enabled,
            None => {
                warn!(
                    "update on settings: unrecognized meshnet in {:?}",
                    settings_out.trim()
                );
                status = Status::Stalled;
            }
        }

        debug!("cycle committed {:?}: {:?}", status, next);
        guard.commit(status, next);
        status
    }

    /// Delay before the next cycle; a dead network is polled less often.
    pub fn next_interval(&self, status: Status) -> Duration {
        match status {
            Status::NoNetwork => self.settings.no_network_interval,
            _ => self.settings.poll_interval,
        }
    }

    /// Polls until `shutdown` flips to true or its sender goes away.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Reconciler started.");
        loop {
            let status = self.reconcile().await;
            let wait = self.next_interval(status);
            debug!("next update in {:?} ({:?})", wait, status);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Reconciler stopped.");
    }
}

/// Maps a runner failure onto a status and records it.
pub(crate) fn classify_failure(stage: &str, err: &RunError) -> Status {
    let status = Status::from(err);
    match status {
        Status::NoNetwork => debug!("on {stage}: no network"),
        Status::Stalled => error!("on {stage} exceeded timeout: {err}"),
        _ => error!("on {stage}: {err}"),
    }
    status
}
