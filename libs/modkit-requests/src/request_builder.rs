use crate::auth::Auth;
use crate::client::HttpClient;
use crate::error::HttpError;
use crate::interceptor::Interceptor;
use crate::opt;
use crate::options::RequestOption;
use crate::response::HttpResponse;
use crate::sink::Sink;
use crate::transport::Transport;
use bytes::Bytes;
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Fluent front end over [`HttpClient::execute`].
///
/// Every method records one [`RequestOption`]; options apply in the order the
/// methods were called once [`send`](Self::send) runs the call.
#[must_use = "a request does nothing until `.send().await` is called"]
pub struct RequestBuilder {
    client: HttpClient,
    method: Method,
    url: String,
    options: Vec<RequestOption>,
}

impl RequestBuilder {
    pub(crate) fn new(client: HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            options: Vec::new(),
        }
    }

    /// Add a prebuilt option
    pub fn option(mut self, option: RequestOption) -> Self {
        self.options.push(option);
        self
    }

    /// Add prebuilt options in order
    pub fn options(mut self, options: impl IntoIterator<Item = RequestOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Append a header; repeated names accumulate values.
    ///
    /// Invalid names or values are reported by [`send`](Self::send).
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(opt::header(name, value))
    }

    pub fn headers<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.option(opt::headers(pairs))
    }

    /// # Panics
    ///
    /// Panics if `kv` has an odd number of elements.
    pub fn header_pairs(self, kv: &[&str]) -> Self {
        self.option(opt::header_pairs(kv))
    }

    /// Append a query parameter
    pub fn param(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(opt::param(key, value))
    }

    pub fn params<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.option(opt::params(pairs))
    }

    pub fn params_multi<I, K, VS, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, VS)>,
        K: Into<String>,
        VS: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.option(opt::params_multi(entries))
    }

    /// # Panics
    ///
    /// Panics if `kv` has an odd number of elements.
    pub fn param_pairs(self, kv: &[&str]) -> Self {
        self.option(opt::param_pairs(kv))
    }

    /// URL-encoded form body; fields accumulate while the form stays the active body
    pub fn form<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.option(opt::form(pairs))
    }

    pub fn form_multi<I, K, VS, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, VS)>,
        K: Into<String>,
        VS: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.option(opt::form_multi(entries))
    }

    /// # Panics
    ///
    /// Panics if `kv` has an odd number of elements.
    pub fn form_pairs(self, kv: &[&str]) -> Self {
        self.option(opt::form_pairs(kv))
    }

    pub fn body(self, bytes: impl Into<Bytes>) -> Self {
        self.option(opt::body(bytes))
    }

    pub fn body_reader<R>(self, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.option(opt::body_reader(reader))
    }

    pub fn data(self, value: impl Display) -> Self {
        self.option(opt::data(value))
    }

    /// JSON body; a serialization failure is reported by [`send`](Self::send)
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.option(opt::json(value))
    }

    /// Multipart upload of the file at `path`
    pub fn file(self, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.option(opt::file(field, path))
    }

    pub fn files<I, K, P>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<PathBuf>,
    {
        self.option(opt::files(entries))
    }

    pub fn file_handle(
        self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        file: tokio::fs::File,
    ) -> Self {
        self.option(opt::file_handle(field, file_name, file))
    }

    pub fn to_text(self, sink: &Sink<String>) -> Self {
        self.option(opt::to_text(sink))
    }

    pub fn to_json<T>(self, sink: &Sink<T>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.option(opt::to_json(sink))
    }

    pub fn auth(self, auth: Auth) -> Self {
        self.option(opt::auth(auth))
    }

    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.option(opt::basic_auth(username, password))
    }

    /// Override the client default timeout for this call
    pub fn timeout(self, timeout: Duration) -> Self {
        self.option(opt::timeout(timeout))
    }

    pub fn cancellation(self, token: CancellationToken) -> Self {
        self.option(opt::cancellation(token))
    }

    pub fn dump_request(self, sink: &Sink<String>) -> Self {
        self.option(opt::dump_request(sink))
    }

    pub fn dump_response(self, sink: &Sink<String>) -> Self {
        self.option(opt::dump_response(sink))
    }

    /// Wrap this call only; runs outside the client interceptors
    pub fn interceptor(self, interceptor: impl Interceptor) -> Self {
        self.option(opt::interceptor(interceptor))
    }

    pub fn disable_keep_alives(self) -> Self {
        self.option(opt::disable_keep_alives())
    }

    pub fn transport(self, transport: Transport) -> Self {
        self.option(opt::transport(transport))
    }

    /// Run the call
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn send(self) -> Result<HttpResponse, HttpError> {
        self.client
            .execute(self.method, &self.url, self.options)
            .await
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("options", &self.options.len())
            .finish_non_exhaustive()
    }
}
