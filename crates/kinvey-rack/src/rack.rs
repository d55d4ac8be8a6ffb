//! The rack: an ordered, mutable list of stages with cooperative cancellation.
//!
//! ## Cancellation
//!
//! [`Rack::cancel`] calls [`Stage::cancel`] on the stage that is active at
//! that moment and settles the pending execution with
//! [`KinveyError::Cancelled`], dropping the rest of the chain. Calling it
//! while nothing is executing does nothing and does not affect later
//! executions.
//!
//! A rack runs one execution at a time. The execution is armed when
//! [`Rack::execute`] is called, so a cancel issued before the returned future
//! is first polled still settles it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use kinvey_core::KinveyError;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::context::RackContext;
use crate::stage::{Next, Stage, StageResult};

/// A stage stored in a rack.
pub type BoxedStage<R> = Arc<dyn Stage<R>>;

#[derive(Debug, Default)]
struct Execution {
    armed: bool,
    cancel_tx: Option<oneshot::Sender<Option<&'static str>>>,
    active: Option<usize>,
}

/// Book-keeping for the execution in flight: the cancel channel and the
/// index of the innermost stage that has not returned yet.
#[derive(Debug, Default)]
pub(crate) struct ActiveStage {
    state: Mutex<Execution>,
}

impl ActiveStage {
    pub(crate) fn enter(&self, index: usize) -> Option<usize> {
        self.state.lock().active.replace(index)
    }

    pub(crate) fn restore(&self, previous: Option<usize>) {
        self.state.lock().active = previous;
    }

    fn arm(&self) -> Result<oneshot::Receiver<Option<&'static str>>, KinveyError> {
        let mut state = self.state.lock();
        if state.armed {
            return Err(KinveyError::AlreadyExecuting);
        }

        let (tx, rx) = oneshot::channel();
        state.armed = true;
        state.cancel_tx = Some(tx);
        state.active = None;
        Ok(rx)
    }

    fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    fn disarm(&self) {
        let mut state = self.state.lock();
        state.armed = false;
        state.cancel_tx = None;
        state.active = None;
    }

    fn take(&self) -> Option<(oneshot::Sender<Option<&'static str>>, Option<usize>)> {
        let mut state = self.state.lock();
        let tx = state.cancel_tx.take()?;
        Some((tx, state.active))
    }
}

/// An armed execution. Dropping it, settled or not, frees the rack.
struct Armed<'a> {
    active: &'a ActiveStage,
    cancelled: oneshot::Receiver<Option<&'static str>>,
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        self.active.disarm();
    }
}

/// Ordered chain of stages that turns a request into a response.
///
/// # Example
///
/// ```
/// use kinvey_core::{Request, Response, HeaderStore};
/// use kinvey_rack::{FnStage, Rack, RackOutput};
///
/// # tokio_test::block_on(async {
/// let rack = Rack::builder()
///     .stage(FnStage::new("ok", |_ctx, _request: &Request, _next| {
///         Box::pin(async {
///             Ok(Some(RackOutput::from(Response::new(
///                 200,
///                 HeaderStore::new(),
///                 serde_json::json!({"ok": true}),
///             ))))
///         })
///     }))
///     .build();
///
/// let output = rack.execute(&Request::default()).await.unwrap().unwrap();
/// assert_eq!(output.status_code(), 200);
/// # });
/// ```
pub struct Rack<R> {
    stages: Vec<BoxedStage<R>>,
    active: ActiveStage,
}

impl<R: Send + Sync + 'static> Rack<R> {
    /// An empty rack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            active: ActiveStage::default(),
        }
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RackBuilder<R> {
        RackBuilder::new()
    }

    /// Runs `request` through every stage in registration order.
    ///
    /// Resolves with whatever the chain settles with; `Ok(None)` if no stage
    /// produced output. Resolves with [`KinveyError::Cancelled`] if
    /// [`Rack::cancel`] is called first, including before the first poll.
    ///
    /// The execution is armed by this call, not by the first poll. If another
    /// execution of this rack is armed, the returned future resolves with
    /// [`KinveyError::AlreadyExecuting`] and no stage runs.
    pub fn execute<'a>(&'a self, request: &'a R) -> impl Future<Output = StageResult> + Send + 'a {
        let armed = self.active.arm().map(|cancelled| Armed {
            active: &self.active,
            cancelled,
        });

        async move {
            let mut armed = armed.map_err(|e| {
                debug!("rack is already executing");
                e
            })?;

            let mut ctx = RackContext::new();
            debug!(
                request_id = %ctx.execution_id(),
                stages = self.stages.len(),
                "rack execution started"
            );

            let chain = Next::new(&self.stages, &self.active).run(&mut ctx, request);

            let result = tokio::select! {
                biased;
                Ok(stage) = &mut armed.cancelled => {
                    Err(KinveyError::cancelled(stage.map(str::to_string)))
                }
                result = chain => result,
            };

            match &result {
                Ok(Some(output)) => {
                    debug!(status = output.status_code(), "rack execution finished");
                }
                Ok(None) => debug!("rack execution finished without a response"),
                Err(e) => debug!(error = %e, "rack execution failed"),
            }

            result
        }
    }

    /// Cancels the execution in flight, if any.
    ///
    /// Safe to call at any time. Returns `true` if an execution was
    /// cancelled.
    pub fn cancel(&self) -> bool {
        let Some((tx, active)) = self.active.take() else {
            trace!("cancel ignored, rack is idle");
            return false;
        };

        let stage = active.and_then(|index| self.stages.get(index));
        if let Some(stage) = stage {
            debug!(stage = stage.name(), "cancelling active stage");
            stage.cancel();
        }

        // The receiver is gone if the execution already settled.
        let _ = tx.send(stage.map(|s| s.name()));
        true
    }

    /// Returns `true` while an execution is in flight.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.active.is_armed()
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Appends a stage.
    pub fn push_stage(&mut self, stage: impl Stage<R>) {
        self.stages.push(Arc::new(stage));
    }

    /// Inserts a stage at `index`, or at the end if `index` is past it.
    pub fn insert_stage(&mut self, index: usize, stage: impl Stage<R>) {
        let index = index.min(self.stages.len());
        self.stages.insert(index, Arc::new(stage));
    }

    /// Removes the first stage named `name`.
    pub fn remove_stage(&mut self, name: &str) -> Option<BoxedStage<R>> {
        let index = self.stages.iter().position(|s| s.name() == name)?;
        Some(self.stages.remove(index))
    }

    /// Removes every stage.
    pub fn clear(&mut self) {
        self.stages.clear();
    }
}

impl<R: Send + Sync + 'static> Default for Rack<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync + 'static> Clone for Rack<R> {
    /// Shares the stages; the clone has its own cancellation scope.
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
            active: ActiveStage::default(),
        }
    }
}

impl<R: Send + Sync + 'static> fmt::Debug for Rack<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Rack").field("stages", &names).finish()
    }
}

/// Builder for [`Rack`].
pub struct RackBuilder<R> {
    stages: Vec<BoxedStage<R>>,
}

impl<R: Send + Sync + 'static> RackBuilder<R> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: impl Stage<R>) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn boxed_stage(mut self, stage: BoxedStage<R>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Builds the rack.
    #[must_use]
    pub fn build(self) -> Rack<R> {
        Rack {
            stages: self.stages,
            active: ActiveStage::default(),
        }
    }
}

impl<R: Send + Sync + 'static> Default for RackBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{BoxFuture, RackOutput};
    use kinvey_core::{RawResponse, Request};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready, task};

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Stage<Request> for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RackContext,
            request: &'a Request,
            next: Next<'a, Request>,
        ) -> BoxFuture<'a, StageResult> {
            Box::pin(async move {
                self.log.lock().push(format!("{}:before", self.name));
                let result = next.run(ctx, request).await;
                self.log.lock().push(format!("{}:after", self.name));
                result
            })
        }
    }

    struct Canned(u16);

    impl Stage<Request> for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut RackContext,
            _request: &'a Request,
            _next: Next<'a, Request>,
        ) -> BoxFuture<'a, StageResult> {
            Box::pin(async move { Ok(Some(RawResponse::new(self.0, json!({})).into())) })
        }
    }

    #[derive(Default)]
    struct Hanging {
        entered: Notify,
        cancels: AtomicUsize,
    }

    impl Stage<Request> for Arc<Hanging> {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut RackContext,
            _request: &'a Request,
            _next: Next<'a, Request>,
        ) -> BoxFuture<'a, StageResult> {
            Box::pin(async move {
                self.entered.notify_one();
                std::future::pending().await
            })
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Recording {
        Recording {
            name,
            log: Arc::clone(log),
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let rack = Rack::builder()
            .stage(recording("first", &log))
            .stage(recording("second", &log))
            .stage(Canned(200))
            .build();

        let output = rack.execute(&Request::default()).await.unwrap();
        assert_eq!(output.map(|o| o.status_code()), Some(200));
        assert_eq!(
            *log.lock(),
            vec!["first:before", "second:before", "second:after", "first:after"]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_yields_none() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let rack = Rack::builder().stage(recording("only", &log)).build();

        assert!(rack.execute(&Request::default()).await.unwrap().is_none());
        assert!(!rack.is_executing());
    }

    #[tokio::test]
    async fn test_short_circuit_skips_later_stages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let rack = Rack::builder()
            .stage(Canned(304))
            .stage(recording("never", &log))
            .build();

        let output = rack.execute(&Request::default()).await.unwrap().unwrap();
        assert_eq!(output, RackOutput::Raw(RawResponse::new(304, json!({}))));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_stage_list_mutation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut rack = Rack::builder()
            .stage(recording("cache", &log))
            .stage(recording("http", &log))
            .build();

        rack.insert_stage(1, recording("serialize", &log));
        rack.push_stage(recording("parse", &log));
        rack.insert_stage(99, recording("tail", &log));
        assert_eq!(
            rack.stage_names(),
            vec!["cache", "serialize", "http", "parse", "tail"]
        );

        assert!(rack.remove_stage("http").is_some());
        assert!(rack.remove_stage("http").is_none());
        assert_eq!(rack.stage_count(), 4);

        rack.clear();
        assert_eq!(rack.stage_count(), 0);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let rack = Rack::builder().stage(Canned(200)).build();
        assert!(!rack.cancel());

        let request = Request::default();
        let mut run = task::spawn(rack.execute(&request));
        let output = assert_ready!(run.poll()).unwrap().unwrap();
        assert_eq!(output.status_code(), 200);

        drop(run);
        assert!(!rack.cancel());
    }

    #[tokio::test]
    async fn test_cancel_reaches_active_stage() {
        let hanging = Arc::new(Hanging::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let rack = Rack::builder()
            .stage(recording("outer", &log))
            .stage(Arc::clone(&hanging))
            .build();

        let request = Request::default();
        let run = rack.execute(&request);
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => panic!("execution should be pending"),
            () = hanging.entered.notified() => {}
        }
        assert!(rack.is_executing());
        assert!(rack.cancel());

        let err = run.await.unwrap_err();
        assert!(matches!(
            err,
            KinveyError::Cancelled { stage: Some(ref s) } if s == "hanging"
        ));
        assert_eq!(hanging.cancels.load(Ordering::SeqCst), 1);
        assert!(!rack.is_executing());
        assert_eq!(*log.lock(), vec!["outer:before"]);
    }

    #[test]
    fn test_active_stage_restored_after_inner_returns() {
        let active = ActiveStage::default();
        let _rx = active.arm();

        let outer = active.enter(0);
        let inner = active.enter(1);
        assert_eq!(inner, Some(0));
        active.restore(inner);
        assert_eq!(active.take().map(|(_, a)| a), Some(Some(0)));
        active.restore(outer);
    }

    #[test]
    fn test_clone_has_own_cancellation_scope() {
        let rack: Rack<Request> = Rack::builder().stage(Arc::new(Hanging::default())).build();
        let copy = rack.clone();

        let request = Request::default();
        let mut run = task::spawn(rack.execute(&request));
        assert_pending!(run.poll());

        assert!(!copy.cancel());
        assert!(rack.is_executing());
        assert!(rack.cancel());
        assert!(assert_ready!(run.poll()).unwrap_err().is_cancelled());
    }

    #[test]
    fn test_cancel_before_first_poll_settles() {
        let hanging = Arc::new(Hanging::default());
        let rack = Rack::builder().stage(Arc::clone(&hanging)).build();

        let request = Request::default();
        let mut run = task::spawn(rack.execute(&request));
        assert!(rack.is_executing());
        assert!(rack.cancel());

        let err = assert_ready!(run.poll()).unwrap_err();
        assert!(matches!(err, KinveyError::Cancelled { stage: None }));
        assert_eq!(hanging.cancels.load(Ordering::SeqCst), 0);

        drop(run);
        assert!(!rack.is_executing());
    }

    #[test]
    fn test_overlapping_execution_is_rejected() {
        let rack: Rack<Request> = Rack::builder().stage(Arc::new(Hanging::default())).build();

        let request = Request::default();
        let mut first = task::spawn(rack.execute(&request));
        assert_pending!(first.poll());

        let mut second = task::spawn(rack.execute(&request));
        let err = assert_ready!(second.poll()).unwrap_err();
        assert!(matches!(err, KinveyError::AlreadyExecuting));
        drop(second);

        // the rejected call leaves the first execution cancellable
        assert!(rack.is_executing());
        assert!(rack.cancel());
        assert!(assert_ready!(first.poll()).unwrap_err().is_cancelled());
    }

    #[test]
    fn test_cancelled_rack_stays_armed_until_settled() {
        let rack: Rack<Request> = Rack::builder().stage(Arc::new(Hanging::default())).build();

        let request = Request::default();
        let mut first = task::spawn(rack.execute(&request));
        assert_pending!(first.poll());
        assert!(rack.cancel());
        assert!(!rack.cancel());

        let mut second = task::spawn(rack.execute(&request));
        assert!(matches!(
            assert_ready!(second.poll()).unwrap_err(),
            KinveyError::AlreadyExecuting
        ));

        assert!(assert_ready!(first.poll()).unwrap_err().is_cancelled());
        drop(first);
        assert!(!rack.is_executing());
    }

    #[test]
    fn test_debug_lists_stage_names() {
        let rack: Rack<Request> = Rack::builder().stage(Canned(200)).build();
        assert_eq!(format!("{rack:?}"), r#"Rack { stages: ["canned"] }"#);
    }

    fn describe_copy<R: Send + Sync + 'static>(rack: &Rack<R>) -> String {
        format!("{:?}", rack.clone())
    }

    #[test]
    fn test_clone_and_debug_in_generic_code() {
        let rack: Rack<Request> = Rack::builder()
            .stage(Canned(200))
            .stage(Arc::new(Hanging::default()))
            .build();
        assert_eq!(describe_copy(&rack), r#"Rack { stages: ["canned", "hanging"] }"#);
    }
}
