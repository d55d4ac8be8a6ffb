//! The generic HTTP request value object.
//!
//! [`Request`] owns its method, URL, headers and body, keeps the
//! `Content-Type` header in step with the body, and guards execution so that
//! only one execution per instance is in flight at a time.
//!
//! Mutating a request while one of its executions is in flight is not
//! supported. The borrow checker rejects it for the execution future
//! returned by [`Request::execute`], which borrows the request.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kinvey_config::RequestConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::headers::{ACCEPT, CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::{HeaderStore, KinveyError, KinveyResult, Method};

/// Caller-supplied construction options.
///
/// Every field is optional; unset fields take the defaults from
/// [`RequestConfig`]. Deserializes from the camelCase option object used by
/// the JavaScript SDKs (`followRedirect`, `timeout`, `body` as an alias for
/// `data`).
///
/// ```
/// use kinvey_core::{Method, Request, RequestOptions};
///
/// let request = Request::new(
///     RequestOptions::new()
///         .method("post")
///         .url("https://baas.kinvey.com/appdata/kid_abc/books")
///         .data(serde_json::json!({"title": "Dune"})),
/// )
/// .unwrap();
///
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.header("content-type"), Some("application/json; charset=utf-8"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    /// HTTP method, any casing.
    pub method: Option<String>,
    /// Initial headers as a JSON object.
    pub headers: Option<Value>,
    /// Request URL.
    pub url: Option<String>,
    /// Request body.
    #[serde(alias = "body")]
    pub data: Option<Value>,
    /// Timeout in milliseconds.
    #[serde(rename = "timeout")]
    pub timeout_ms: Option<u64>,
    /// Whether transport stages follow redirects.
    pub follow_redirect: Option<bool>,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Replaces the initial headers.
    #[must_use]
    pub fn headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Adds one initial header.
    ///
    /// Ignored if [`RequestOptions::headers`] was given something other than
    /// an object; construction rejects that case anyway.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let headers = self
            .headers
            .get_or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(map) = headers {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Sets the URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Alias for [`RequestOptions::data`].
    #[must_use]
    pub fn body(self, body: impl Into<Value>) -> Self {
        self.data(body)
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets redirect handling.
    #[must_use]
    pub fn follow_redirect(mut self, follow: bool) -> Self {
        self.follow_redirect = Some(follow);
        self
    }
}

/// A mutable HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Option<String>,
    data: Option<Value>,
    headers: HeaderStore,
    timeout: Duration,
    follow_redirect: bool,
    executing: AtomicBool,
}

impl Clone for Request {
    /// Clones the request state. The clone starts idle.
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            url: self.url.clone(),
            data: self.data.clone(),
            headers: self.headers.clone(),
            timeout: self.timeout,
            follow_redirect: self.follow_redirect,
            executing: AtomicBool::new(false),
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        let mut headers = HeaderStore::new();
        headers.insert(ACCEPT, JSON_CONTENT_TYPE.to_string());
        let config = RequestConfig::default();

        Self {
            method: Method::Get,
            url: None,
            data: None,
            headers,
            timeout: config.default_timeout(),
            follow_redirect: config.follow_redirect,
            executing: AtomicBool::new(false),
        }
    }
}

impl Request {
    /// Builds a request with the default [`RequestConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] if the method is not one of
    /// the five supported verbs or the headers are malformed.
    pub fn new(options: RequestOptions) -> KinveyResult<Self> {
        Self::with_config(options, &RequestConfig::default())
    }

    /// Builds a request, taking unset options from `config`.
    ///
    /// # Errors
    ///
    /// Same as [`Request::new`].
    pub fn with_config(options: RequestOptions, config: &RequestConfig) -> KinveyResult<Self> {
        let method = match options.method.as_deref() {
            Some(method) => method.parse()?,
            None => Method::Get,
        };

        let mut headers = HeaderStore::new();
        if let Some(initial) = &options.headers {
            headers.extend_from_json(initial)?;
        }
        if !headers.contains(ACCEPT) {
            headers.insert(ACCEPT, JSON_CONTENT_TYPE.to_string());
        }

        let mut request = Self {
            method,
            url: options.url,
            data: None,
            headers,
            timeout: options
                .timeout_ms
                .map_or_else(|| config.default_timeout(), Duration::from_millis),
            follow_redirect: options.follow_redirect.unwrap_or(config.follow_redirect),
            executing: AtomicBool::new(false),
        };

        match options.data {
            Some(data) => request.set_data(data),
            None => request.clear_data(),
        }

        Ok(request)
    }

    /// The method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Sets the method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// The base URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sets the base URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// The timeout handed to transport stages.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Whether transport stages follow redirects.
    #[must_use]
    pub const fn follow_redirect(&self) -> bool {
        self.follow_redirect
    }

    /// Sets redirect handling.
    pub fn set_follow_redirect(&mut self, follow: bool) {
        self.follow_redirect = follow;
    }

    /// The headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    /// Returns a header value, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Sets a header. See [`HeaderStore::set`].
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] for an empty name or value.
    pub fn set_header(&mut self, name: &str, value: impl Into<Value>) -> KinveyResult<()> {
        self.headers.set(name, value)
    }

    /// Sets every header of a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] if `headers` is not an object
    /// or contains an invalid entry.
    pub fn add_headers(&mut self, headers: &Value) -> KinveyResult<()> {
        self.headers.extend_from_json(headers)
    }

    /// Removes a header, ignoring case.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    /// Removes every header.
    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// The body.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Alias for [`Request::data`].
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.data()
    }

    /// Sets the body.
    ///
    /// A non-empty body ensures a `Content-Type` header exists, defaulting to
    /// JSON and never replacing one the caller set. An empty body (`null`,
    /// `""`, `false` or `0`) removes `Content-Type`.
    pub fn set_data(&mut self, data: impl Into<Value>) {
        let data = data.into();

        if is_empty(&data) {
            self.headers.remove(CONTENT_TYPE);
        } else if !self.headers.contains(CONTENT_TYPE) {
            self.headers.insert(CONTENT_TYPE, JSON_CONTENT_TYPE.to_string());
        }

        self.data = if data.is_null() { None } else { Some(data) };
    }

    /// Removes the body and the `Content-Type` header.
    pub fn clear_data(&mut self) {
        self.data = None;
        self.headers.remove(CONTENT_TYPE);
    }

    /// Returns `true` while an execution is in flight.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    /// Runs `transport` under the single-flight guard.
    ///
    /// The guard is taken when this method is called, not when the returned
    /// future is first polled. If another execution of this instance is in
    /// flight the returned future resolves to
    /// [`KinveyError::AlreadyExecuting`] and `transport` is dropped unpolled.
    /// Otherwise the transport outcome is returned unchanged and the guard is
    /// released when the future completes or is dropped.
    pub fn execute<'a, F, T>(
        &'a self,
        transport: F,
    ) -> impl Future<Output = KinveyResult<T>> + Send + 'a
    where
        F: Future<Output = KinveyResult<T>> + Send + 'a,
        T: Send + 'a,
    {
        let guard = ExecutionGuard::acquire(&self.executing);

        async move {
            let _guard = guard?;
            transport.await
        }
    }

    /// Diagnostic snapshot of the request.
    #[must_use]
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method,
            headers: self.headers.clone(),
            url: self.url.clone(),
            data: self.data.clone(),
            follow_redirect: self.follow_redirect,
        }
    }

    /// [`Request::snapshot`] as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }
}

/// Serializable view of a [`Request`] for logging. Not meant to be parsed
/// back into a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    /// Method.
    pub method: Method,
    /// Headers.
    pub headers: HeaderStore,
    /// Base URL.
    pub url: Option<String>,
    /// Body.
    pub data: Option<Value>,
    /// Redirect handling.
    pub follow_redirect: bool,
}

struct ExecutionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExecutionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> KinveyResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KinveyError::AlreadyExecuting)?;
        debug!("execution guard acquired");
        Ok(Self { flag })
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        debug!("execution guard released");
    }
}

fn is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, assert_ready_err, task};

    #[test]
    fn test_defaults() {
        let request = Request::new(RequestOptions::new()).unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url(), None);
        assert_eq!(request.data(), None);
        assert_eq!(request.timeout(), Duration::from_millis(10_000));
        assert!(request.follow_redirect());
        assert_eq!(request.header("accept"), Some(JSON_CONTENT_TYPE));
        assert!(!request.is_executing());
    }

    #[test]
    fn test_method_is_normalized() {
        let request = Request::new(RequestOptions::new().method("delete")).unwrap();
        assert_eq!(request.method(), Method::Delete);

        let err = Request::new(RequestOptions::new().method("OPTIONS")).unwrap_err();
        assert!(matches!(err, KinveyError::InvalidArgument { .. }));
    }

    #[test]
    fn test_caller_accept_header_is_kept() {
        let request =
            Request::new(RequestOptions::new().header("accept", "text/plain")).unwrap();

        assert_eq!(request.header("Accept"), Some("text/plain"));
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn test_non_object_headers_rejected() {
        let err = Request::new(RequestOptions::new().headers(json!("Accept: */*"))).unwrap_err();
        assert!(matches!(err, KinveyError::InvalidArgument { .. }));
    }

    #[test]
    fn test_config_defaults_apply() {
        let config = RequestConfig {
            default_timeout_ms: 2500,
            follow_redirect: false,
            ..Default::default()
        };

        let request = Request::with_config(RequestOptions::new(), &config).unwrap();
        assert_eq!(request.timeout(), Duration::from_millis(2500));
        assert!(!request.follow_redirect());

        let request = Request::with_config(
            RequestOptions::new().timeout(Duration::from_secs(1)),
            &config,
        )
        .unwrap();
        assert_eq!(request.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_set_data_adds_content_type() {
        let mut request = Request::default();
        request.set_data(json!({"a": 1}));

        assert_eq!(request.header("content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(request.body(), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_set_data_keeps_caller_content_type() {
        let mut request = Request::default();
        request.set_header("Content-Type", "text/csv").unwrap();
        request.set_data("a,b,c");

        assert_eq!(request.header("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_empty_data_removes_content_type() {
        for empty in [json!(null), json!(""), json!(false), json!(0)] {
            let mut request = Request::default();
            request.set_data(json!({"a": 1}));
            request.set_data(empty.clone());

            assert_eq!(request.header("content-type"), None, "{empty}");
        }

        let mut request = Request::default();
        request.set_data("payload");
        request.clear_data();
        assert_eq!(request.data(), None);
        assert!(!request.headers().contains(CONTENT_TYPE));
    }

    #[test]
    fn test_body_alias_in_options() {
        let options: RequestOptions =
            serde_json::from_value(json!({"method": "put", "body": [1, 2], "timeout": 50}))
                .unwrap();
        let request = Request::new(options).unwrap();

        assert_eq!(request.data(), Some(&json!([1, 2])));
        assert_eq!(request.timeout(), Duration::from_millis(50));
        assert!(request.headers().contains("content-type"));
    }

    #[test]
    fn test_header_operations() {
        let mut request = Request::default();
        request.set_header("X-Foo", "a").unwrap();
        assert_eq!(request.header("x-foo"), Some("a"));

        request
            .add_headers(&json!({"X-Bar": 1, "X-Baz": "b"}))
            .unwrap();
        assert_eq!(request.header("x-bar"), Some("1"));

        assert!(request.add_headers(&json!(null)).is_err());

        assert_eq!(request.remove_header("X-FOO").as_deref(), Some("a"));
        request.clear_headers();
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut request = Request::new(
            RequestOptions::new()
                .method("post")
                .url("https://baas.kinvey.com/rpc"),
        )
        .unwrap();
        request.set_data(json!({"ok": true}));

        let value = request.to_json();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["url"], "https://baas.kinvey.com/rpc");
        assert_eq!(value["data"], json!({"ok": true}));
        assert_eq!(value["followRedirect"], true);
        assert_eq!(value["headers"]["Accept"], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_clone_starts_idle() {
        let request = Request::default();
        let mut running = task::spawn(request.execute(std::future::pending::<KinveyResult<()>>()));
        assert_pending!(running.poll());

        let copy = request.clone();
        assert!(request.is_executing());
        assert!(!copy.is_executing());
    }

    #[tokio::test]
    async fn test_execute_returns_transport_outcome() {
        let request = Request::default();

        let value = request.execute(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = request
            .execute(async { Err::<(), _>(KinveyError::transport("boom")) })
            .await
            .unwrap_err();
        assert!(matches!(err, KinveyError::Transport { .. }));
        assert!(!request.is_executing());
    }

    #[test]
    fn test_second_execute_fails_while_first_in_flight() {
        let request = Request::default();
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();

        let mut first = task::spawn(request.execute(async move {
            rx.await.map_err(|_| KinveyError::NoResponse)
        }));
        assert_pending!(first.poll());
        assert!(request.is_executing());

        let mut polled = false;
        let mut second = task::spawn(request.execute(async {
            polled = true;
            Ok(0)
        }));
        let err = assert_ready_err!(second.poll());
        assert!(matches!(err, KinveyError::AlreadyExecuting));
        drop(second);
        assert!(!polled);

        tx.send(5).unwrap();
        assert_eq!(assert_ready!(first.poll()).unwrap(), 5);
        drop(first);
        assert!(!request.is_executing());

        let mut third = task::spawn(request.execute(async { Ok(9) }));
        assert_eq!(assert_ready!(third.poll()).unwrap(), 9);
    }

    #[test]
    fn test_dropping_execution_releases_guard() {
        let request = Request::default();
        let pending = request.execute(std::future::pending::<KinveyResult<()>>());
        assert!(request.is_executing());

        drop(pending);
        assert!(!request.is_executing());
    }

    #[test]
    fn test_is_empty_rules() {
        assert!(is_empty(&json!(0.0)));
        assert!(!is_empty(&json!(1)));
        assert!(!is_empty(&json!([])));
        assert!(!is_empty(&json!({})));
        assert!(!is_empty(&json!(true)));
    }
}
