//! Diagnostic stage that logs every request passing through it.
//!
//! Place it first to time the whole chain, or right before the network stage
//! to see the request exactly as it goes out.
//!
//! ```
//! use kinvey_core::Request;
//! use kinvey_rack::{stages::LoggingStage, Rack};
//!
//! let rack: Rack<Request> = Rack::builder()
//!     .stage(LoggingStage::new().with_headers(true))
//!     .build();
//! assert_eq!(rack.stage_names(), vec!["logging"]);
//! ```

use tracing::{debug, info, warn};

use crate::context::RackContext;
use crate::request::RackRequest;
use crate::stage::{BoxFuture, Next, Stage, StageResult};

/// Logs method and URL on entry and the outcome on exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStage {
    log_headers: bool,
}

impl LoggingStage {
    /// Creates a stage that does not log headers.
    #[must_use]
    pub const fn new() -> Self {
        Self { log_headers: false }
    }

    /// Also log request headers on entry.
    #[must_use]
    pub const fn with_headers(mut self, enabled: bool) -> Self {
        self.log_headers = enabled;
        self
    }
}

impl<R> Stage<R> for LoggingStage
where
    R: RackRequest + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RackContext,
        request: &'a R,
        next: Next<'a, R>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let request_id = ctx.execution_id();
            let url = request.url().unwrap_or_default();

            if self.log_headers {
                let headers: Vec<_> = request.headers().iter().collect();
                debug!(
                    request_id = %request_id,
                    http.method = %request.method(),
                    http.url = %url,
                    headers = ?headers,
                    "request entering rack"
                );
            } else {
                debug!(
                    request_id = %request_id,
                    http.method = %request.method(),
                    http.url = %url,
                    "request entering rack"
                );
            }

            let result = next.run(ctx, request).await;
            let duration_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                Ok(Some(output)) => info!(
                    request_id = %request_id,
                    http.method = %request.method(),
                    http.url = %url,
                    http.status_code = output.status_code(),
                    duration_ms,
                    "request completed"
                ),
                Ok(None) => warn!(
                    request_id = %request_id,
                    http.url = %url,
                    duration_ms,
                    "rack produced no response"
                ),
                Err(e) => warn!(
                    request_id = %request_id,
                    http.url = %url,
                    duration_ms,
                    error = %e,
                    "request failed"
                ),
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnStage, Rack};
    use kinvey_core::{KinveyError, RawResponse, Request, RequestOptions};
    use serde_json::json;
    use tracing_subscriber::util::SubscriberInitExt;

    fn request() -> Request {
        Request::new(
            RequestOptions::new()
                .method("get")
                .url("https://baas.kinvey.com/appdata/kid_x/books"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_passes_output_through() {
        let _guard = tracing_subscriber::fmt().with_test_writer().set_default();

        let rack = Rack::builder()
            .stage(LoggingStage::new().with_headers(true))
            .stage(FnStage::new("ok", |_ctx, _request: &Request, _next| {
                Box::pin(async { Ok(Some(RawResponse::new(200, json!([])).into())) })
            }))
            .build();

        let output = rack.execute(&request()).await.unwrap().unwrap();
        assert_eq!(output.status_code(), 200);
    }

    #[tokio::test]
    async fn test_passes_errors_through() {
        let rack = Rack::builder()
            .stage(LoggingStage::new())
            .stage(FnStage::new("down", |_ctx, _request: &Request, _next| {
                Box::pin(async { Err(KinveyError::transport("connection refused")) })
            }))
            .build();

        let err = rack.execute(&request()).await.unwrap_err();
        assert!(matches!(err, KinveyError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_passes_missing_response_through() {
        let rack: Rack<Request> = Rack::builder().stage(LoggingStage::new()).build();
        assert!(rack.execute(&request()).await.unwrap().is_none());
    }
}
