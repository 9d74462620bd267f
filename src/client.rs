// src/client.rs
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::CliSettings;
use crate::dispatch::Dispatcher;
use crate::reconciler::Reconciler;
use crate::runner::{CliRunner, CommandRunner};
use crate::status::{ConnectionSnapshot, Status, StatusModel, StatusReport};

/// What the UI talks to. Reads are immediate; every action runs as its own
/// task on the runtime so the caller never waits on the CLI.
pub struct NordClient<R = CliRunner> {
    reconciler: Arc<Reconciler<R>>,
    dispatcher: Arc<Dispatcher<R>>,
    runtime: Handle,
}

impl<R> Clone for NordClient<R> {
    fn clone(&self) -> Self {
        Self {
            reconciler: Arc::clone(&self.reconciler),
            dispatcher: Arc::clone(&self.dispatcher),
            runtime: self.runtime.clone(),
        }
    }
}

impl<R: CommandRunner> NordClient<R> {
    pub fn new(runner: R, settings: CliSettings, runtime: Handle) -> Self {
        let model = Arc::new(StatusModel::new());
        let reconciler = Arc::new(Reconciler::new(model, Arc::new(runner), settings));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&reconciler)));
        Self {
            reconciler,
            dispatcher,
            runtime,
        }
    }

    pub fn get_snapshot(&self) -> (Status, ConnectionSnapshot) {
        self.reconciler.model().snapshot()
    }

    pub fn report(&self) -> StatusReport {
        self.reconciler.model().report()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.reconciler.model().busy()
    }

    pub fn trigger_connect(&self, country: Option<String>) -> JoinHandle<Status> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.runtime
            .spawn(async move { dispatcher.connect(country.as_deref()).await })
    }

    pub fn trigger_disconnect(&self) -> JoinHandle<Status> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.runtime
            .spawn(async move { dispatcher.disconnect().await })
    }

    pub fn trigger_set_kill_switch(&self, enabled: bool) -> JoinHandle<Status> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.runtime
            .spawn(async move { dispatcher.set_kill_switch(enabled).await })
    }

    pub fn trigger_set_meshnet(&self, enabled: bool) -> JoinHandle<Status> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.runtime
            .spawn(async move { dispatcher.set_meshnet(enabled).await })
    }

    /// Starts the background reconciliation loop.
    pub fn start_polling(&self) -> PollingHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let reconciler = Arc::clone(&self.reconciler);
        let task = self
            .runtime
            .spawn(async move { reconciler.run(shutdown_rx).await });
        PollingHandle { shutdown, task }
    }
}

pub struct PollingHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Asks the loop to stop after its current cycle.
    pub fn shutdown(self) -> JoinHandle<()> {
        if self.shutdown.send(true).is_err() {
            warn!("Reconciler already stopped.");
        }
        self.task
    }

    /// Stops the loop and waits up to `timeout` for its current cycle.
    /// Returns false if the cycle is still running afterwards.
    pub async fn stop(self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.shutdown()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Reconciler task ended abnormally: {}", e);
                true
            }
            Err(_) => {
                warn!(
                    "Reconciler did not stop within {:?}; an in-flight CLI call may be orphaned.",
                    timeout
                );
                false
            }
        }
    }
}
