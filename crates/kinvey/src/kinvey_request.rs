//! Kinvey-flavoured requests.
//!
//! [`KinveyRequest`] wraps a [`Request`] with the Kinvey protocol headers,
//! request properties, an optional [`Query`] and its own [`Rack`]. Executing
//! it runs the rack under the request's single-flight guard and normalizes
//! the outcome into a [`Response`] or a [`KinveyError`].

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kinvey_config::{KinveyConfig, RequestConfig};
use kinvey_core::{
    HeaderStore, KinveyError, KinveyResult, Method, Request, RequestOptions, RequestSnapshot,
    Response,
};
use kinvey_rack::{Rack, RackRequest, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::auth::AuthType;
use crate::device::{DeviceInformation, RustDeviceInformation};
use crate::headers::{
    API_VERSION, CLIENT_APP_VERSION, CUSTOM_REQUEST_PROPERTIES, DEVICE_INFORMATION,
    INCLUDE_HEADERS_IN_RESPONSE, KINVEY_CONTENT_TYPE, REQUEST_ID, RESPONSE_WRAPPER,
    SKIP_BUSINESS_LOGIC,
};
use crate::properties::Properties;
use crate::query::{Query, QueryEncoder};

/// Construction options for a [`KinveyRequest`].
///
/// The generic request options are flattened in, so the same camelCase
/// object used for a plain request deserializes here too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KinveyRequestOptions {
    /// Method, URL, headers, body, timeout and redirects.
    #[serde(flatten)]
    pub request: RequestOptions,
    /// Client properties sent as headers.
    pub properties: Option<Properties>,
    /// Credentials the transport should attach.
    pub auth: Option<AuthType>,
    /// Query appended to the URL.
    pub query: Option<Query>,
    /// Value for `X-Kinvey-Content-Type`.
    pub content_type: Option<String>,
    /// Bypass business logic.
    #[serde(rename = "skipBL")]
    pub skip_bl: bool,
    /// Ask the backend to echo its request id.
    pub trace: bool,
    /// API version, overriding the configured default.
    pub api_version: Option<u32>,
}

impl KinveyRequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request = self.request.method(method);
        self
    }

    /// Sets the URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.request = self.request.url(url);
        self
    }

    /// Adds one initial header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Sets the body.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.request = self.request.data(data);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request = self.request.timeout(timeout);
        self
    }

    /// Sets redirect handling.
    pub fn follow_redirect(mut self, follow: bool) -> Self {
        self.request = self.request.follow_redirect(follow);
        self
    }

    /// Sets the request properties.
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Sets the auth descriptor.
    pub fn auth(mut self, auth: AuthType) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the query.
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Sets `X-Kinvey-Content-Type`.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Bypass business logic.
    pub fn skip_bl(mut self, skip: bool) -> Self {
        self.skip_bl = skip;
        self
    }

    /// Ask for the backend request id.
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Overrides the API version.
    pub fn api_version(mut self, version: u32) -> Self {
        self.api_version = Some(version);
        self
    }
}

/// A request speaking the Kinvey protocol.
///
/// ```
/// use kinvey::{KinveyRequest, KinveyRequestOptions, Query};
///
/// let request = KinveyRequest::new(
///     KinveyRequestOptions::new()
///         .url("https://baas.kinvey.com/appdata/kid_x/books")
///         .query(Query::new().limit(5))
///         .skip_bl(true),
/// )
/// .unwrap();
///
/// assert_eq!(request.header("x-kinvey-api-version"), Some("3"));
/// assert_eq!(request.header("X-Kinvey-Skip-Business-Logic"), Some("true"));
/// assert_eq!(
///     request.url().as_deref(),
///     Some("https://baas.kinvey.com/appdata/kid_x/books?query=%7B%7D&limit=5")
/// );
/// ```
#[derive(Clone)]
pub struct KinveyRequest {
    request: Request,
    rack: Rack<KinveyRequest>,
    properties: Option<Properties>,
    auth: Option<AuthType>,
    query: Option<Query>,
    device: Arc<dyn DeviceInformation>,
    config: RequestConfig,
}

impl KinveyRequest {
    /// Builds a request with the default configuration, the default device
    /// information and an empty rack.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::InvalidArgument`] for a bad method or headers
    /// and [`KinveyError::SizeLimitExceeded`] for oversized properties.
    pub fn new(options: KinveyRequestOptions) -> KinveyResult<Self> {
        Self::builder().options(options).build()
    }

    /// Starts a builder.
    pub fn builder() -> KinveyRequestBuilder {
        KinveyRequestBuilder::new()
    }

    /// The underlying request.
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Mutable access to the underlying request.
    ///
    /// Headers written here bypass the properties bookkeeping.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// The method.
    pub const fn method(&self) -> Method {
        self.request.method()
    }

    /// Sets the method.
    pub fn set_method(&mut self, method: Method) {
        self.request.set_method(method);
    }

    /// The URL without the query.
    pub fn base_url(&self) -> Option<&str> {
        self.request.url()
    }

    /// Sets the URL without the query.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.request.set_url(url);
    }

    /// The effective URL: the base URL with the query encoded onto it.
    pub fn url(&self) -> Option<String> {
        self.request
            .url()
            .map(|base| QueryEncoder::encode(base, self.query.as_ref()))
    }

    /// The headers.
    pub const fn headers(&self) -> &HeaderStore {
        self.request.headers()
    }

    /// A header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    /// Sets a header.
    ///
    /// # Errors
    ///
    /// Same as [`Request::set_header`].
    pub fn set_header(&mut self, name: &str, value: impl Into<Value>) -> KinveyResult<()> {
        self.request.set_header(name, value)
    }

    /// Removes a header.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.request.remove_header(name)
    }

    /// The body.
    pub const fn data(&self) -> Option<&Value> {
        self.request.data()
    }

    /// Sets the body.
    pub fn set_data(&mut self, data: impl Into<Value>) {
        self.request.set_data(data);
    }

    /// Clears the body.
    pub fn clear_data(&mut self) {
        self.request.clear_data();
    }

    /// The timeout.
    pub const fn timeout(&self) -> Duration {
        self.request.timeout()
    }

    /// The auth descriptor.
    pub const fn auth(&self) -> Option<AuthType> {
        self.auth
    }

    /// Sets the auth descriptor.
    pub fn set_auth(&mut self, auth: Option<AuthType>) {
        self.auth = auth;
    }

    /// The query.
    pub const fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Sets the query.
    pub fn set_query(&mut self, query: Option<Query>) {
        self.query = query;
    }

    /// The request properties.
    pub const fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }

    /// Replaces the request properties and their headers.
    ///
    /// The app version goes to `X-Kinvey-Client-App-Version`, everything else
    /// to `X-Kinvey-Custom-Request-Properties` as a JSON object, `{}` when
    /// there are no custom properties. An empty app version removes its
    /// header. `None` removes both.
    ///
    /// # Errors
    ///
    /// Returns [`KinveyError::SizeLimitExceeded`] if the custom properties
    /// JSON is not shorter than the configured cap. Nothing is changed then.
    pub fn set_properties(&mut self, properties: Option<Properties>) -> KinveyResult<()> {
        let Some(properties) = properties else {
            self.properties = None;
            self.request.remove_header(CLIENT_APP_VERSION);
            self.request.remove_header(CUSTOM_REQUEST_PROPERTIES);
            return Ok(());
        };

        let custom = Value::Object(properties.custom().clone()).to_string();
        let allowed = self.config.max_custom_properties_bytes;
        if custom.len() >= allowed {
            return Err(KinveyError::SizeLimitExceeded {
                actual: custom.len(),
                allowed,
            });
        }

        match properties.app_version().filter(|version| !version.is_empty()) {
            Some(version) => self.request.set_header(CLIENT_APP_VERSION, version)?,
            None => {
                self.request.remove_header(CLIENT_APP_VERSION);
            }
        }
        self.request.set_header(CUSTOM_REQUEST_PROPERTIES, custom)?;

        self.properties = Some(properties);
        Ok(())
    }

    /// The device information provider.
    pub fn device_information(&self) -> &dyn DeviceInformation {
        self.device.as_ref()
    }

    /// The rack.
    pub const fn rack(&self) -> &Rack<KinveyRequest> {
        &self.rack
    }

    /// Mutable access to the rack, for changing stages between executions.
    pub fn rack_mut(&mut self) -> &mut Rack<KinveyRequest> {
        &mut self.rack
    }

    /// Whether an execution is in flight.
    pub fn is_executing(&self) -> bool {
        self.request.is_executing()
    }

    /// Runs the rack and normalizes its outcome.
    ///
    /// - another execution in flight: [`KinveyError::AlreadyExecuting`]
    /// - the rack produced nothing: [`KinveyError::NoResponse`]
    /// - non-2xx response: [`KinveyError::Response`] with the response's
    ///   own error
    /// - stage failures and cancellation are returned unchanged
    pub fn execute(&self) -> impl Future<Output = KinveyResult<Response>> + Send + '_ {
        let span = info_span!(
            "kinvey_request",
            http.method = %self.method(),
            http.url = %self.url().unwrap_or_default(),
        );
        let outcome = self.request.execute(self.rack.execute(self));

        async move {
            let result = outcome.await.and_then(|output| {
                output
                    .ok_or(KinveyError::NoResponse)?
                    .into_response()
                    .into_result()
            });

            match &result {
                Ok(response) => info!(
                    http.status_code = response.status_code(),
                    "request succeeded"
                ),
                Err(KinveyError::AlreadyExecuting) => {
                    debug!("request already executing");
                }
                Err(e) => warn!(error = %e, "request failed"),
            }

            result
        }
        .instrument(span)
    }

    /// Cancels the in-flight execution, if any.
    ///
    /// An execution is in flight from the moment [`KinveyRequest::execute`]
    /// returns its future, so a cancel issued before the first poll settles
    /// it with [`KinveyError::Cancelled`]. Returns `false` when idle.
    pub fn cancel(&self) -> bool {
        self.rack.cancel()
    }

    /// Diagnostic snapshot including the effective URL and the query.
    pub fn snapshot(&self) -> KinveyRequestSnapshot {
        let mut request = self.request.snapshot();
        request.url = self.url();

        KinveyRequestSnapshot {
            request,
            query: self.query.clone(),
        }
    }

    /// [`KinveyRequest::snapshot`] as JSON.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }
}

impl fmt::Debug for KinveyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinveyRequest")
            .field("request", &self.request)
            .field("rack", &self.rack)
            .field("properties", &self.properties)
            .field("auth", &self.auth)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl RackRequest for KinveyRequest {
    fn method(&self) -> Method {
        Self::method(self)
    }

    fn url(&self) -> Option<Cow<'_, str>> {
        Self::url(self).map(Cow::Owned)
    }

    fn headers(&self) -> &HeaderStore {
        Self::headers(self)
    }

    fn body(&self) -> Option<&Value> {
        self.data()
    }

    fn timeout(&self) -> Duration {
        Self::timeout(self)
    }

    fn follow_redirect(&self) -> bool {
        self.request.follow_redirect()
    }
}

/// Serializable view of a [`KinveyRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KinveyRequestSnapshot {
    /// Base fields, with the effective URL.
    #[serde(flatten)]
    pub request: RequestSnapshot,
    /// Query, if any.
    pub query: Option<Query>,
}

/// Builder for [`KinveyRequest`].
pub struct KinveyRequestBuilder {
    options: KinveyRequestOptions,
    config: RequestConfig,
    device: Arc<dyn DeviceInformation>,
    rack: Rack<KinveyRequest>,
}

impl KinveyRequestBuilder {
    /// Default configuration, default device information, empty rack.
    pub fn new() -> Self {
        Self {
            options: KinveyRequestOptions::default(),
            config: RequestConfig::default(),
            device: Arc::new(RustDeviceInformation::default()),
            rack: Rack::new(),
        }
    }

    /// Replaces the options.
    pub fn options(mut self, options: KinveyRequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses the request section of a loaded configuration.
    pub fn config(self, config: &KinveyConfig) -> Self {
        self.request_config(config.request.clone())
    }

    /// Uses a request configuration.
    pub fn request_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a device information provider.
    pub fn device_information(self, device: impl DeviceInformation + 'static) -> Self {
        self.shared_device_information(Arc::new(device))
    }

    /// Uses a shared device information provider.
    pub fn shared_device_information(mut self, device: Arc<dyn DeviceInformation>) -> Self {
        self.device = device;
        self
    }

    /// Uses the stages of `rack`. The request gets its own cancellation
    /// scope either way.
    pub fn rack(mut self, rack: Rack<KinveyRequest>) -> Self {
        self.rack = rack;
        self
    }

    /// Appends a stage.
    pub fn stage(mut self, stage: impl Stage<KinveyRequest>) -> Self {
        self.rack.push_stage(stage);
        self
    }

    /// Builds the request and installs the Kinvey headers.
    ///
    /// # Errors
    ///
    /// Same as [`KinveyRequest::new`].
    pub fn build(self) -> KinveyResult<KinveyRequest> {
        let Self {
            options,
            config,
            device,
            rack,
        } = self;

        let mut request = Request::with_config(options.request, &config)?;

        request.set_header(
            API_VERSION,
            options.api_version.unwrap_or(config.default_api_version),
        )?;
        request.set_header(DEVICE_INFORMATION, device.to_json())?;

        if let Some(content_type) = options.content_type {
            request.set_header(KINVEY_CONTENT_TYPE, content_type)?;
        }
        if options.skip_bl {
            request.set_header(SKIP_BUSINESS_LOGIC, true)?;
        }
        if options.trace {
            request.set_header(INCLUDE_HEADERS_IN_RESPONSE, REQUEST_ID)?;
            request.set_header(RESPONSE_WRAPPER, true)?;
        }

        let mut kinvey_request = KinveyRequest {
            request,
            rack: rack.clone(),
            properties: None,
            auth: options.auth,
            query: options.query,
            device,
            config,
        };
        kinvey_request.set_properties(options.properties)?;

        debug!(
            http.method = %kinvey_request.method(),
            stages = kinvey_request.rack.stage_count(),
            "kinvey request built"
        );
        Ok(kinvey_request)
    }
}

impl Default for KinveyRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KinveyRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinveyRequestBuilder")
            .field("options", &self.options)
            .field("config", &self.config)
            .field("rack", &self.rack)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinvey_core::RawResponse;
    use kinvey_rack::FnStage;
    use serde_json::json;

    const URL: &str = "https://baas.kinvey.com/appdata/kid_x/books";

    fn options() -> KinveyRequestOptions {
        KinveyRequestOptions::new().url(URL)
    }

    fn properties_of(bytes: usize) -> Properties {
        // {"a":"…"} is eight bytes plus the value
        Properties::new().with("a", "x".repeat(bytes - 8))
    }

    #[test]
    fn test_default_headers() {
        let request = KinveyRequest::new(options()).unwrap();

        assert_eq!(request.header("Accept"), Some("application/json; charset=utf-8"));
        assert_eq!(request.header(API_VERSION), Some("3"));

        let device: Value =
            serde_json::from_str(request.header(DEVICE_INFORMATION).unwrap()).unwrap();
        assert_eq!(device["sdk"]["name"], "kinvey");

        for name in [
            KINVEY_CONTENT_TYPE,
            SKIP_BUSINESS_LOGIC,
            INCLUDE_HEADERS_IN_RESPONSE,
            RESPONSE_WRAPPER,
            CLIENT_APP_VERSION,
            CUSTOM_REQUEST_PROPERTIES,
        ] {
            assert_eq!(request.header(name), None, "{name}");
        }
    }

    #[test]
    fn test_conditional_headers() {
        let request = KinveyRequest::new(
            options()
                .content_type("text/csv")
                .skip_bl(true)
                .trace(true)
                .api_version(5),
        )
        .unwrap();

        assert_eq!(request.header(API_VERSION), Some("5"));
        assert_eq!(request.header(KINVEY_CONTENT_TYPE), Some("text/csv"));
        assert_eq!(request.header(SKIP_BUSINESS_LOGIC), Some("true"));
        assert_eq!(
            request.header(INCLUDE_HEADERS_IN_RESPONSE),
            Some("X-Kinvey-Request-Id")
        );
        assert_eq!(request.header(RESPONSE_WRAPPER), Some("true"));
    }

    #[test]
    fn test_configured_api_version() {
        let config = RequestConfig {
            default_api_version: 4,
            ..RequestConfig::default()
        };
        let request = KinveyRequest::builder()
            .options(options())
            .request_config(config)
            .build()
            .unwrap();

        assert_eq!(request.header(API_VERSION), Some("4"));
    }

    #[test]
    fn test_injected_device_information() {
        let request = KinveyRequest::builder()
            .options(options())
            .device_information(json!({"os": "test"}))
            .build()
            .unwrap();

        assert_eq!(request.header(DEVICE_INFORMATION), Some(r#"{"os":"test"}"#));
    }

    #[test]
    fn test_properties_headers() {
        let request = KinveyRequest::new(
            options().properties(Properties::new().with_app_version("1.0").with("a", 1)),
        )
        .unwrap();

        assert_eq!(request.header(CLIENT_APP_VERSION), Some("1.0"));
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_properties_cap_is_exclusive() {
        let mut request = KinveyRequest::new(options()).unwrap();

        request.set_properties(Some(properties_of(1999))).unwrap();
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES).map(str::len), Some(1999));

        let err = request.set_properties(Some(properties_of(2000))).unwrap_err();
        assert!(matches!(
            err,
            KinveyError::SizeLimitExceeded {
                actual: 2000,
                allowed: 2000
            }
        ));
        assert_eq!(
            err.to_string(),
            "Custom request properties are 2000 bytes. It must be less than 2000 bytes."
        );
    }

    #[test]
    fn test_oversized_properties_leave_headers_untouched() {
        let mut request = KinveyRequest::new(
            options().properties(Properties::new().with_app_version("1.0").with("a", 1)),
        )
        .unwrap();

        let oversized = properties_of(4000).with_app_version("2.0");
        assert!(request.set_properties(Some(oversized)).is_err());

        assert_eq!(request.header(CLIENT_APP_VERSION), Some("1.0"));
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES), Some(r#"{"a":1}"#));
        assert_eq!(request.properties().and_then(Properties::app_version), Some("1.0"));
    }

    #[test]
    fn test_oversized_properties_fail_construction() {
        let err = KinveyRequest::new(options().properties(properties_of(2500))).unwrap_err();
        assert!(matches!(err, KinveyError::SizeLimitExceeded { actual: 2500, .. }));
    }

    #[test]
    fn test_properties_without_custom_send_empty_object() {
        let request =
            KinveyRequest::new(options().properties(Properties::new().with_app_version("1.0")))
                .unwrap();

        assert_eq!(request.header(CLIENT_APP_VERSION), Some("1.0"));
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES), Some("{}"));
    }

    #[test]
    fn test_clearing_properties_removes_headers() {
        let mut request = KinveyRequest::new(
            options().properties(Properties::new().with_app_version("1.0").with("a", 1)),
        )
        .unwrap();

        request
            .set_properties(Some(Properties::new().with("b", 2)))
            .unwrap();
        assert_eq!(request.header(CLIENT_APP_VERSION), None);
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES), Some(r#"{"b":2}"#));

        request.set_properties(None).unwrap();
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES), None);
        assert!(request.properties().is_none());
    }

    #[test]
    fn test_url_without_query_or_base() {
        let request = KinveyRequest::new(options()).unwrap();
        assert_eq!(request.url().as_deref(), Some(URL));

        let request = KinveyRequest::new(KinveyRequestOptions::new()).unwrap();
        assert_eq!(request.url(), None);
    }

    #[test]
    fn test_url_follows_query_changes() {
        let mut request = KinveyRequest::new(options()).unwrap();
        request.set_query(Some(Query::new().fields(["x", "y"]).limit(10)));

        assert_eq!(
            request.url().unwrap(),
            format!("{URL}?query=%7B%7D&fields=x,y&limit=10")
        );
        assert_eq!(request.base_url(), Some(URL));
    }

    #[test]
    fn test_snapshot_has_effective_url_and_query() {
        let request = KinveyRequest::new(options().query(Query::new().skip(5))).unwrap();
        let json = request.to_json();

        assert_eq!(json["method"], "GET");
        assert_eq!(json["url"], format!("{URL}?query=%7B%7D&skip=5"));
        assert_eq!(json["query"]["skip"], 5);
        assert_eq!(json["followRedirect"], true);
    }

    #[test]
    fn test_options_deserialize() {
        let options: KinveyRequestOptions = serde_json::from_value(json!({
            "method": "post",
            "url": URL,
            "body": {"title": "Dune"},
            "skipBL": true,
            "auth": "Session",
            "properties": {"appVersion": "1.0"},
        }))
        .unwrap();

        let request = KinveyRequest::new(options).unwrap();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.auth(), Some(AuthType::Session));
        assert_eq!(request.header(SKIP_BUSINESS_LOGIC), Some("true"));
        assert_eq!(request.header(CLIENT_APP_VERSION), Some("1.0"));
        assert_eq!(request.data(), Some(&json!({"title": "Dune"})));
    }

    #[test]
    fn test_deserialized_app_version_is_normalized() {
        let options: KinveyRequestOptions = serde_json::from_value(json!({
            "url": URL,
            "properties": {"appVersion": ""},
        }))
        .unwrap();
        let request = KinveyRequest::new(options).unwrap();
        assert_eq!(request.header(CLIENT_APP_VERSION), None);
        assert_eq!(request.header(CUSTOM_REQUEST_PROPERTIES), Some("{}"));

        let options: KinveyRequestOptions = serde_json::from_value(json!({
            "url": URL,
            "properties": {"appVersion": 3, "tier": "gold"},
        }))
        .unwrap();
        let request = KinveyRequest::new(options).unwrap();
        assert_eq!(request.header(CLIENT_APP_VERSION), Some("3"));
        assert_eq!(
            request.header(CUSTOM_REQUEST_PROPERTIES),
            Some(r#"{"tier":"gold"}"#)
        );
    }

    #[test]
    fn test_bad_method_fails() {
        let err = KinveyRequest::new(options().method("TRACE")).unwrap_err();
        assert!(matches!(err, KinveyError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_execute_wraps_raw_response() {
        let request = KinveyRequest::builder()
            .options(options())
            .stage(FnStage::new("network", |_ctx, _request: &KinveyRequest, _next| {
                Box::pin(async { Ok(Some(RawResponse::new(200, json!([{"_id": "1"}])).into())) })
            }))
            .build()
            .unwrap();

        let response = request.execute().await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.data(), &json!([{"_id": "1"}]));
        assert!(!request.is_executing());
    }

    #[tokio::test]
    async fn test_execute_without_stages_has_no_response() {
        let request = KinveyRequest::new(options()).unwrap();
        let err = request.execute().await.unwrap_err();
        assert!(matches!(err, KinveyError::NoResponse));
    }

    #[tokio::test]
    async fn test_stages_see_effective_url() {
        let request = KinveyRequest::builder()
            .options(options().query(Query::new().limit(1)))
            .stage(FnStage::new("echo", |_ctx, request: &KinveyRequest, _next| {
                let url = RackRequest::url(request).map(Cow::into_owned);
                Box::pin(async move { Ok(Some(RawResponse::new(200, json!(url)).into())) })
            }))
            .build()
            .unwrap();

        let response = request.execute().await.unwrap();
        assert_eq!(response.data(), &json!(format!("{URL}?query=%7B%7D&limit=1")));
    }
}
