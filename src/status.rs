// src/status.rs
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::runner::RunError;

/// Reliability of the last reconciliation, not the VPN connection itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// The CLI answered with something we could not read, or did not answer in time.
    #[default]
    Stalled,
    Failed,
    NoNetwork,
    Done,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Stalled => "Stalled",
            Status::Failed => "Failed",
            Status::NoNetwork => "No network",
            Status::Done => "Up to date",
        }
    }
}

impl From<&RunError> for Status {
    fn from(err: &RunError) -> Self {
        match err {
            RunError::Timeout { .. } => Status::Stalled,
            RunError::NoNetwork => Status::NoNetwork,
            RunError::ProcessFailure { .. } | RunError::Spawn { .. } => Status::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionSnapshot {
    pub connected: bool,
    pub server_name: Option<String>,
    pub kill_switch: bool,
    pub meshnet: bool,
}

/// Everything the model publishes, read in one piece.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    pub status: Status,
    pub connection: ConnectionSnapshot,
    /// Bumped on every commit.
    pub revision: u64,
    pub updated_at: Option<DateTime<Local>>,
}

/// The single current view of the VPN.
///
/// `cycle` serializes compound read-modify-commit operations (a reconciliation
/// cycle or a user action). The published report sits behind its own lock,
/// held only while copying, so readers never wait on an external process.
pub struct StatusModel {
    cycle: tokio::sync::Mutex<()>,
    published: Mutex<StatusReport>,
    in_flight: Mutex<usize>,
    busy: watch::Sender<bool>,
}

impl Default for StatusModel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusModel {
    pub fn new() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            cycle: tokio::sync::Mutex::new(()),
            published: Mutex::new(StatusReport::default()),
            in_flight: Mutex::new(0),
            busy,
        }
    }

    pub fn snapshot(&self) -> (Status, ConnectionSnapshot) {
        let published = self.published();
        (published.status, published.connection.clone())
    }

    pub fn report(&self) -> StatusReport {
        self.published().clone()
    }

    /// Waits for exclusive access. Commits are only possible through the guard.
    pub async fn lock(&self) -> ModelGuard<'_> {
        ModelGuard {
            model: self,
            _cycle: self.cycle.lock().await,
        }
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    /// Raises the busy flag until the returned guard is dropped.
    pub fn mark_busy(&self) -> BusyGuard<'_> {
        self.adjust_in_flight(true);
        BusyGuard { model: self }
    }

    fn adjust_in_flight(&self, starting: bool) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if starting {
            *in_flight += 1;
        } else {
            *in_flight = in_flight.saturating_sub(1);
        }
        self.busy.send_replace(*in_flight > 0);
    }

    fn published(&self) -> MutexGuard<'_, StatusReport> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ModelGuard<'a> {
    model: &'a StatusModel,
    _cycle: tokio::sync::MutexGuard<'a, ()>,
}

impl ModelGuard<'_> {
    pub fn current(&self) -> (Status, ConnectionSnapshot) {
        self.model.snapshot()
    }

    pub fn commit(&mut self, status: Status, connection: ConnectionSnapshot) {
        let mut published = self.model.published();
        published.status = status;
        published.connection = connection;
        published.revision += 1;
        published.updated_at = Some(Local::now());
    }
}

pub struct BusyGuard<'a> {
    model: &'a StatusModel,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.model.adjust_in_flight(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake;
    use std::time::Duration;

    fn connected_to(server: &str) -> ConnectionSnapshot {
        ConnectionSnapshot {
            connected: true,
            server_name: Some(server.to_string()),
            kill_switch: true,
            meshnet: false,
        }
    }

    #[test]
    fn starts_stalled_and_disconnected() {
        let model = StatusModel::new();
        let (status, connection) = model.snapshot();
        assert_eq!(status, Status::Stalled);
        assert_eq!(connection, ConnectionSnapshot::default());
        assert_eq!(model.report().revision, 0);
        assert!(model.report().updated_at.is_none());
        assert!(!*model.busy().borrow());
    }

    #[tokio::test]
    async fn commit_replaces_both_halves() {
        let model = StatusModel::new();
        model
            .lock()
            .await
            .commit(Status::Done, connected_to("se42.nordvpn.com"));

        let report = model.report();
        assert_eq!(report.status, Status::Done);
        assert_eq!(report.connection, connected_to("se42.nordvpn.com"));
        assert_eq!(report.revision, 1);
        assert!(report.updated_at.is_some());
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let model = StatusModel::new();
        model
            .lock()
            .await
            .commit(Status::NoNetwork, connected_to("fr7.nordvpn.com"));

        let first = model.snapshot();
        assert_eq!(model.snapshot(), first);
        assert_eq!(model.report(), model.report());
    }

    #[tokio::test]
    async fn readers_do_not_wait_for_a_held_guard() {
        let model = StatusModel::new();
        let mut guard = model.lock().await;
        guard.commit(Status::Failed, ConnectionSnapshot::default());

        assert_eq!(model.snapshot().0, Status::Failed);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), model.lock())
                .await
                .is_err(),
            "a second guard must wait for the first"
        );
        drop(guard);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), model.lock())
                .await
                .is_ok()
        );
    }

    #[test]
    fn busy_flag_survives_overlapping_actions() {
        let model = StatusModel::new();
        let mut busy = model.busy();

        let first = model.mark_busy();
        let second = model.mark_busy();
        assert!(*busy.borrow_and_update());

        drop(first);
        assert!(*model.busy().borrow());
        drop(second);
        assert!(!*model.busy().borrow());
        assert!(busy.has_changed().unwrap());
    }

    #[test]
    fn run_errors_map_to_statuses() {
        assert_eq!(Status::from(&fake::timeout()), Status::Stalled);
        assert_eq!(Status::from(&RunError::NoNetwork), Status::NoNetwork);
        assert_eq!(Status::from(&fake::failure("boom")), Status::Failed);
        let spawn = RunError::Spawn {
            command: "nordvpn status".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(Status::from(&spawn), Status::Failed);
    }
}
