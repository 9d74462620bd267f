// src/dispatch.rs
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::reconciler::{Reconciler, classify_failure};
use crate::runner::CommandRunner;
use crate::status::Status;

/// Turns user intents into CLI calls, each followed by a forced reconciliation.
pub struct Dispatcher<R> {
    reconciler: Arc<Reconciler<R>>,
}

impl<R: CommandRunner> Dispatcher<R> {
    pub fn new(reconciler: Arc<Reconciler<R>>) -> Self {
        Self { reconciler }
    }

    /// Connects to the best server, or to one in `country` when given.
    pub async fn connect(&self, country: Option<&str>) -> Status {
        let mut args = vec!["connect"];
        // An empty argument would make the CLI look for a country called "".
        if let Some(code) = country.map(str::trim).filter(|code| !code.is_empty()) {
            args.push(code);
        }
        let _busy = self.reconciler.model().mark_busy();
        self.perform("connect", &args, self.reconciler.settings().action_timeout)
            .await
    }

    pub async fn disconnect(&self) -> Status {
        let _busy = self.reconciler.model().mark_busy();
        self.perform(
            "disconnect",
            &["disconnect"],
            self.reconciler.settings().action_timeout,
        )
        .await
    }

    pub async fn set_kill_switch(&self, enabled: bool) -> Status {
        self.perform(
            "set killswitch",
            &["set", "killswitch", on_off(enabled)],
            self.reconciler.settings().toggle_timeout,
        )
        .await
    }

    pub async fn set_meshnet(&self, enabled: bool) -> Status {
        self.perform(
            "set meshnet",
            &["set", "meshnet", on_off(enabled)],
            self.reconciler.settings().toggle_timeout,
        )
        .await
    }

    async fn perform(&self, action: &str, args: &[&str], timeout: Duration) -> Status {
        let mut guard = self.reconciler.model().lock().await;

        info!("Running {}: {}", action, args.join(" "));
        if let Err(err) = self.reconciler.exec(timeout, args).await {
            let status = classify_failure(action, &err);
            let (_, previous) = guard.current();
            guard.commit(status, previous);
        }

        self.reconciler.reconcile_locked(&mut guard).await
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
