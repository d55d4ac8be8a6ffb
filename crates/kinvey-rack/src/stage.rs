//! The stage trait and the chain that links stages together.
//!
//! A [`Stage`] receives the request together with [`Next`], the rest of the
//! chain. It may forward to `next`, short-circuit with its own output, or fail.
//! Running off the end of the chain yields `Ok(None)`: no stage produced a
//! response.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kinvey_core::{KinveyError, RawResponse, Response};

use crate::context::RackContext;
use crate::rack::ActiveStage;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a stage settles with.
///
/// `Ok(None)` means the chain ended without any stage producing output.
pub type StageResult = Result<Option<RackOutput>, KinveyError>;

/// The output of a rack execution.
#[derive(Debug, Clone, PartialEq)]
pub enum RackOutput {
    /// Already normalized.
    Response(Response),
    /// Straight from a transport, still to be normalized.
    Raw(RawResponse),
}

impl RackOutput {
    /// Normalizes into a [`Response`], preserving every field of a raw result.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Response(response) => response,
            Self::Raw(raw) => raw.into(),
        }
    }

    /// Status code of either variant.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Response(response) => response.status_code(),
            Self::Raw(raw) => raw.status_code,
        }
    }
}

impl From<Response> for RackOutput {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<RawResponse> for RackOutput {
    fn from(raw: RawResponse) -> Self {
        Self::Raw(raw)
    }
}

/// One processing step of a rack.
///
/// # Example
///
/// ```
/// use kinvey_core::{HeaderStore, Request, Response};
/// use kinvey_rack::{BoxFuture, Next, RackContext, Stage, StageResult};
///
/// struct Offline;
///
/// impl Stage<Request> for Offline {
///     fn name(&self) -> &'static str {
///         "offline"
///     }
///
///     fn process<'a>(
///         &'a self,
///         _ctx: &'a mut RackContext,
///         _request: &'a Request,
///         _next: Next<'a, Request>,
///     ) -> BoxFuture<'a, StageResult> {
///         Box::pin(async {
///             Ok(Some(Response::new(200, HeaderStore::new(), serde_json::json!([])).into()))
///         })
///     }
/// }
/// ```
pub trait Stage<R>: Send + Sync + 'static {
    /// Name used for logging and for [`Rack::remove_stage`](crate::Rack::remove_stage).
    fn name(&self) -> &'static str;

    /// Processes the request, usually by calling `next.run(ctx, request)`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RackContext,
        request: &'a R,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult>;

    /// Asks the stage to abort the work it is doing for the current
    /// execution. Called only while this stage is the active one.
    fn cancel(&self) {}
}

/// The remainder of the chain after the current stage.
pub struct Next<'a, R> {
    stages: &'a [Arc<dyn Stage<R>>],
    index: usize,
    active: Option<&'a ActiveStage>,
}

impl<'a, R: Send + Sync + 'static> Next<'a, R> {
    pub(crate) fn new(stages: &'a [Arc<dyn Stage<R>>], active: &'a ActiveStage) -> Self {
        Self {
            stages,
            index: 0,
            active: Some(active),
        }
    }

    /// A chain with no stages left. Running it yields `Ok(None)`.
    ///
    /// Useful for driving a single stage in isolation.
    #[must_use]
    pub const fn end() -> Self {
        Self {
            stages: &[],
            index: 0,
            active: None,
        }
    }

    /// Number of stages left in the chain.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len().saturating_sub(self.index)
    }

    /// Runs the next stage, or yields `Ok(None)` if there is none.
    pub fn run<'b>(self, ctx: &'b mut RackContext, request: &'b R) -> BoxFuture<'b, StageResult>
    where
        'a: 'b,
    {
        let Some(stage) = self.stages.get(self.index) else {
            return Box::pin(async { Ok(None) });
        };

        let index = self.index;
        let active = self.active;
        let rest = Next {
            stages: self.stages,
            index: index + 1,
            active,
        };

        Box::pin(async move {
            let previous = active.map(|a| a.enter(index));
            let result = stage.process(ctx, request, rest).await;
            if let (Some(a), Some(previous)) = (active, previous) {
                a.restore(previous);
            }
            result
        })
    }
}

/// Stage built from a closure.
///
/// ```
/// use kinvey_core::Request;
/// use kinvey_rack::{FnStage, Rack};
///
/// let rack: Rack<Request> = Rack::builder()
///     .stage(FnStage::new("passthrough", |ctx, request, next| {
///         Box::pin(async move { next.run(ctx, request).await })
///     }))
///     .build();
///
/// assert_eq!(rack.stage_names(), vec!["passthrough"]);
/// ```
pub struct FnStage<F> {
    name: &'static str,
    func: F,
}

impl<F> FnStage<F> {
    /// Wraps `func` as a stage named `name`.
    pub const fn new<R>(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(&'a mut RackContext, &'a R, Next<'a, R>) -> BoxFuture<'a, StageResult>
            + Send
            + Sync
            + 'static,
    {
        Self { name, func }
    }
}

impl<R, F> Stage<R> for FnStage<F>
where
    R: Send + Sync + 'static,
    F: for<'a> Fn(&'a mut RackContext, &'a R, Next<'a, R>) -> BoxFuture<'a, StageResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RackContext,
        request: &'a R,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult> {
        (self.func)(ctx, request, next)
    }
}
