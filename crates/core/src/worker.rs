//! Event dispatch loop of the interception layer.
//!
//! A [`Worker`] owns the receiving end of an event channel; any number of
//! [`WorkerHandle`]s feed it. Install and activate run inline, one at a
//! time, so no request is intercepted before activation finishes. Fetches
//! and client messages run as detached tasks: a fetch keeps going after its
//! requester hangs up, so its store write still lands.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::lifecycle::{self, ActivateReport, InstallReport, StaticFamily};
use crate::reconcile::{self, ClientMessage};
use crate::router::{Route, RouteRule, Router};
use crate::strategy::{Outcome, StrategyEngine};
use crate::{Error, Request};

/// Capacity of the event queue.
const EVENT_QUEUE: usize = 256;

/// Lifecycle position of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Not installed; requests go straight to the network.
    Parked,
    Installed,
    /// Intercepting requests.
    Activated,
}

/// Everything the worker needs to know about this deployment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub family: StaticFamily,
    pub derived_store: String,
    pub manifest: Vec<Url>,
    pub routes: Vec<RouteRule>,
}

pub enum Event {
    Install { reply: oneshot::Sender<Result<InstallReport, Error>> },
    Activate { reply: oneshot::Sender<Result<ActivateReport, Error>> },
    Fetch { request: Request, reply: oneshot::Sender<Result<Outcome, Error>> },
    Message(ClientMessage),
}

/// Cloneable sender side of the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    events: mpsc::Sender<Event>,
    state: watch::Receiver<WorkerState>,
}

impl WorkerHandle {
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Install { reply }).await?;
        rx.await.map_err(|_| Error::WorkerStopped)?
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Activate { reply }).await?;
        rx.await.map_err(|_| Error::WorkerStopped)?
    }

    pub async fn fetch(&self, request: Request) -> Result<Outcome, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Fetch { request, reply }).await?;
        rx.await.map_err(|_| Error::WorkerStopped)?
    }

    /// Queue a client message without waiting for it to be handled.
    ///
    /// Best-effort: returns `false` if the queue is full or the worker is gone.
    pub fn post_message(&self, message: ClientMessage) -> bool {
        match self.events.try_send(Event::Message(message)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "dropping client message");
                false
            }
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    async fn send(&self, event: Event) -> Result<(), Error> {
        self.events.send(event).await.map_err(|_| Error::WorkerStopped)
    }
}

pub struct Worker {
    engine: StrategyEngine,
    config: Arc<WorkerConfig>,
    router: Arc<Router>,
    events: mpsc::Receiver<Event>,
    state: watch::Sender<WorkerState>,
}

impl Worker {
    pub fn new(engine: StrategyEngine, config: WorkerConfig) -> Result<(Self, WorkerHandle), Error> {
        let router = Router::new(&config.routes, &config.family.current(), &config.derived_store)?;
        let (tx, events) = mpsc::channel(EVENT_QUEUE);
        let (state, state_rx) = watch::channel(WorkerState::Parked);

        let worker = Self { engine, config: Arc::new(config), router: Arc::new(router), events, state };
        Ok((worker, WorkerHandle { events: tx, state: state_rx }))
    }

    /// Start the loop on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process events until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(store = %self.config.family.current(), "worker started");

        while let Some(event) = self.events.recv().await {
            match event {
                Event::Install { reply } => {
                    let result = self.on_install().await;
                    let _ = reply.send(result);
                }
                Event::Activate { reply } => {
                    let result = self.on_activate().await;
                    let _ = reply.send(result);
                }
                Event::Fetch { request, reply } => {
                    let engine = self.engine.clone();
                    let route = self.route_for(&request);
                    tokio::spawn(async move {
                        let result = engine.execute(&route, &request).await;
                        if reply.send(result).is_err() {
                            tracing::debug!(key = %request.identity, "requester gone before response");
                        }
                    });
                }
                Event::Message(message) => {
                    let engine = self.engine.clone();
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        reconcile::handle_message(engine.stores().as_ref(), &config.derived_store, &message).await;
                    });
                }
            }
        }

        tracing::info!("worker stopped");
    }

    fn route_for(&self, request: &Request) -> Route {
        if *self.state.borrow() == WorkerState::Activated {
            self.router.classify(request.url())
        } else {
            Route::PassThrough
        }
    }

    async fn on_install(&mut self) -> Result<InstallReport, Error> {
        let report = lifecycle::install(&self.engine, &self.config.family, &self.config.manifest).await?;
        if *self.state.borrow() == WorkerState::Parked {
            self.state.send_replace(WorkerState::Installed);
        }
        Ok(report)
    }

    async fn on_activate(&mut self) -> Result<ActivateReport, Error> {
        let stores = self.engine.stores().as_ref();
        if *self.state.borrow() == WorkerState::Parked {
            let current = self.config.family.current();
            if stores.find(&current).await?.is_none() {
                return Err(Error::InvalidInput(format!("static store {current} is not installed")));
            }
            tracing::info!(store = %current, "reusing static store installed by an earlier run");
        }

        let report = lifecycle::activate(stores, &self.config.family).await?;
        self.state.send_replace(WorkerState::Activated);
        tracing::info!(store = %report.current, deleted = report.deleted.len(), "worker activated");
        Ok(report)
    }
}
