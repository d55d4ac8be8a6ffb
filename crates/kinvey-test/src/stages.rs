//! Scripted rack stages.
//!
//! Every stage is a cheap handle: clone it before handing it to a rack and
//! keep the clone to inspect calls afterwards.

use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kinvey_core::{KinveyError, RawResponse, Response};
use kinvey_rack::{BoxFuture, Next, RackContext, RackOutput, Stage, StageResult};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

/// Answers every request with the same output, without calling `next`.
#[derive(Debug, Clone)]
pub struct StaticStage {
    name: &'static str,
    output: Option<RackOutput>,
    calls: Arc<AtomicUsize>,
}

impl StaticStage {
    /// Answers with `output`, or with nothing.
    pub fn new(output: Option<RackOutput>) -> Self {
        Self {
            name: "static",
            output,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answers with a raw transport result.
    pub fn raw(status_code: u16, data: Value) -> Self {
        Self::new(Some(RawResponse::new(status_code, data).into()))
    }

    /// Answers with an already normalized response.
    pub fn response(response: Response) -> Self {
        Self::new(Some(response.into()))
    }

    /// Ends the chain without output.
    pub fn none() -> Self {
        Self::new(None)
    }

    /// Renames the stage.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Number of requests answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<R: Send + Sync + 'static> Stage<R> for StaticStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        _ctx: &'a mut RackContext,
        _request: &'a R,
        _next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = self.output.clone();
        Box::pin(async move { Ok(output) })
    }
}

/// Fails every request with a transport error.
#[derive(Debug, Clone)]
pub struct FailingStage {
    message: String,
    calls: Arc<AtomicUsize>,
}

impl FailingStage {
    /// Fails with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of requests failed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<R: Send + Sync + 'static> Stage<R> for FailingStage {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn process<'a>(
        &'a self,
        _ctx: &'a mut RackContext,
        _request: &'a R,
        _next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Err(KinveyError::transport(self.message.clone())) })
    }
}

#[derive(Debug, Default)]
struct PendingState {
    entered: AtomicUsize,
    cancels: AtomicUsize,
    notify: Notify,
}

/// Never settles on its own; stands in for a network call that only ends
/// when the execution is cancelled.
#[derive(Debug, Clone, Default)]
pub struct PendingStage {
    state: Arc<PendingState>,
}

impl PendingStage {
    /// A fresh stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once an execution has reached this stage.
    pub async fn entered(&self) {
        if self.entries() > 0 {
            return;
        }
        self.state.notify.notified().await;
    }

    /// Number of executions that reached this stage.
    pub fn entries(&self) -> usize {
        self.state.entered.load(Ordering::SeqCst)
    }

    /// Number of times [`Stage::cancel`] was delivered.
    pub fn cancels(&self) -> usize {
        self.state.cancels.load(Ordering::SeqCst)
    }
}

impl<R: Send + Sync + 'static> Stage<R> for PendingStage {
    fn name(&self) -> &'static str {
        "pending"
    }

    fn process<'a>(
        &'a self,
        _ctx: &'a mut RackContext,
        _request: &'a R,
        _next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult> {
        self.state.entered.fetch_add(1, Ordering::SeqCst);
        self.state.notify.notify_one();
        Box::pin(pending::<StageResult>())
    }

    fn cancel(&self) {
        self.state.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared log of stage names in the order they ran.
#[derive(Debug, Clone, Default)]
pub struct StageLog(Arc<Mutex<Vec<&'static str>>>);

impl StageLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// The names recorded so far.
    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }

    /// Forgets every entry.
    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn record(&self, name: &'static str) {
        self.0.lock().push(name);
    }
}

/// Records its name in a [`StageLog`] and forwards.
#[derive(Debug, Clone)]
pub struct RecordingStage {
    name: &'static str,
    log: StageLog,
}

impl RecordingStage {
    /// Records as `name` into `log`.
    pub fn new(name: &'static str, log: &StageLog) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl<R: Send + Sync + 'static> Stage<R> for RecordingStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RackContext,
        request: &'a R,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult> {
        self.log.record(self.name);
        next.run(ctx, request)
    }
}
