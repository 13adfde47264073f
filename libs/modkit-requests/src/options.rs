//! Per-call configuration and the resolver that folds option mutators into it.

use crate::auth::Auth;
use crate::body::{BodyKind, BodyVariant, FilePart, FileSource};
use crate::error::HttpError;
use crate::interceptor::Interceptor;
use crate::multimap::MultiMap;
use crate::sink::Sink;
use crate::transport::Transport;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Decodes a successful response body into a caller-owned JSON sink.
pub type JsonBinding = Box<dyn Fn(&[u8]) -> Result<(), serde_json::Error> + Send + Sync>;

/// One configuration mutator.
///
/// Options are applied strictly in the order they were given. Header, param
/// and form options merge; body options replace the active body.
pub struct RequestOption(Box<dyn FnOnce(&mut RequestOptions) + Send>);

impl RequestOption {
    /// Wrap an arbitrary mutator
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestOptions) + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub(crate) fn apply(self, options: &mut RequestOptions) {
        (self.0)(options);
    }
}

impl fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestOption")
    }
}

/// Resolved configuration of one call.
///
/// Built fresh for every call from the client defaults, then handed to the
/// pipeline and dropped when the call returns.
pub struct RequestOptions {
    pub(crate) headers: HeaderMap,
    pub(crate) params: MultiMap,
    pub(crate) body: BodyKind,
    pub(crate) to_text: Option<Sink<String>>,
    pub(crate) to_json: Option<JsonBinding>,
    pub(crate) auth: Option<Auth>,
    pub(crate) timeout: Duration,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) dump_request: Option<Sink<String>>,
    pub(crate) dump_response: Option<Sink<String>>,
    pub(crate) interceptor: Option<Arc<dyn Interceptor>>,
    pub(crate) disable_keep_alives: bool,
    pub(crate) transport: Option<Transport>,
    /// First failure captured while applying options, reported by `resolve`
    deferred_error: Option<HttpError>,
}

impl RequestOptions {
    /// Fresh draft carrying only the client default timeout.
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            headers: HeaderMap::new(),
            params: MultiMap::new(),
            body: BodyKind::Empty,
            to_text: None,
            to_json: None,
            auth: None,
            timeout,
            cancellation: None,
            dump_request: None,
            dump_response: None,
            interceptor: None,
            disable_keep_alives: false,
            transport: None,
            deferred_error: None,
        }
    }

    /// Apply `options` in order over a fresh draft.
    ///
    /// # Errors
    ///
    /// Returns the first invalid header or JSON serialization failure captured
    /// while applying the options.
    pub(crate) fn resolve(
        default_timeout: Duration,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Result<Self, HttpError> {
        let mut draft = Self::new(default_timeout);
        for option in options {
            option.apply(&mut draft);
        }
        match draft.deferred_error.take() {
            Some(err) => Err(err),
            None => Ok(draft),
        }
    }

    pub(crate) fn defer(&mut self, err: impl Into<HttpError>) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(err.into());
        }
    }

    /// Append a header value; values for the same name accumulate
    pub fn append_header(&mut self, name: &str, value: &str) {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(err) => return self.defer(err),
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.append(name, value);
            }
            Err(err) => self.defer(err),
        }
    }

    pub fn append_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.append(key, value);
    }

    /// Append a form field, making the form the active body.
    ///
    /// Fields accumulate while the form stays active; after another body
    /// variant was selected the form starts empty again.
    pub fn append_form(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.with_form(|fields| fields.append(key, value));
    }

    pub(crate) fn with_form(&mut self, f: impl FnOnce(&mut MultiMap)) {
        let mut fields = match std::mem::replace(&mut self.body, BodyKind::Empty) {
            BodyKind::Form(fields) => fields,
            _ => MultiMap::new(),
        };
        f(&mut fields);
        self.body = BodyKind::Form(fields);
    }

    /// Add a multipart file part, making files the active body.
    ///
    /// A part with the same field name replaces the earlier one.
    pub(crate) fn add_file(&mut self, field: String, source: FileSource) {
        if !matches!(self.body, BodyKind::Files(_)) {
            self.body = BodyKind::Files(Vec::new());
        }
        if let BodyKind::Files(parts) = &mut self.body {
            parts.retain(|part| part.field != field);
            parts.push(FilePart { field, source });
        }
    }

    pub(crate) fn set_body(&mut self, body: BodyKind) {
        self.body = body;
    }

    pub fn set_text_sink(&mut self, sink: &Sink<String>) {
        self.to_text = Some(sink.clone());
    }

    pub fn set_json_sink<T>(&mut self, sink: &Sink<T>)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let sink = sink.clone();
        self.to_json = Some(Box::new(move |body: &[u8]| {
            sink.put(serde_json::from_slice(body)?);
            Ok(())
        }));
    }

    pub fn set_auth(&mut self, auth: Auth) {
        self.auth = Some(auth);
    }

    /// Per-call timeout; `Duration::ZERO` disables the deadline
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = Some(token);
    }

    pub fn set_dump_request(&mut self, sink: &Sink<String>) {
        self.dump_request = Some(sink.clone());
    }

    pub fn set_dump_response(&mut self, sink: &Sink<String>) {
        self.dump_response = Some(sink.clone());
    }

    pub fn set_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptor = Some(interceptor);
    }

    pub fn set_disable_keep_alives(&mut self, disable: bool) {
        self.disable_keep_alives = disable;
    }

    pub fn set_transport(&mut self, transport: Transport) {
        self.transport = Some(transport);
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn params(&self) -> &MultiMap {
        &self.params
    }

    /// Which body variant is currently active
    #[must_use]
    pub fn body_variant(&self) -> BodyVariant {
        self.body.variant()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn keep_alives_disabled(&self) -> bool {
        self.disable_keep_alives
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("body", &self.body)
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .field("disable_keep_alives", &self.disable_keep_alives)
            .field("has_interceptor", &self.interceptor.is_some())
            .field("has_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}
