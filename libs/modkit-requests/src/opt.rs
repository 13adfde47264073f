//! Option constructors accepted by [`HttpClient::execute`](crate::HttpClient::execute).
//!
//! ```ignore
//! use modkit_requests::{Method, opt};
//!
//! let resp = client
//!     .execute(
//!         Method::POST,
//!         "https://example.com/api",
//!         vec![
//!             opt::header("x-request-id", "42"),
//!             opt::param("page", "1"),
//!             opt::json(&payload),
//!         ],
//!     )
//!     .await?;
//! ```

use crate::auth::Auth;
use crate::body::{BodyKind, FileSource};
use crate::interceptor::Interceptor;
use crate::multimap::MultiMap;
use crate::options::RequestOption;
use crate::sink::Sink;
use crate::transport::Transport;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

fn flat_pairs(kv: &[&str]) -> MultiMap {
    let mut pairs = MultiMap::new();
    pairs.extend_flat(kv);
    pairs
}

/// Append one header value
pub fn header(name: impl Into<String>, value: impl Into<String>) -> RequestOption {
    let (name, value) = (name.into(), value.into());
    RequestOption::new(move |o| o.append_header(&name, &value))
}

/// Append every `(name, value)` header
pub fn headers<I, K, V>(pairs: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    RequestOption::new(move |o| {
        for (name, value) in &pairs {
            o.append_header(name, value);
        }
    })
}

/// Append headers from a flat `name, value, name, value, ...` list
///
/// # Panics
///
/// Panics if `kv` has an odd number of elements.
pub fn header_pairs(kv: &[&str]) -> RequestOption {
    let pairs = flat_pairs(kv);
    RequestOption::new(move |o| {
        for (name, value) in pairs.iter() {
            o.append_header(name, value);
        }
    })
}

/// Append one query parameter
pub fn param(key: impl Into<String>, value: impl Into<String>) -> RequestOption {
    let (key, value) = (key.into(), value.into());
    RequestOption::new(move |o| o.append_param(key, value))
}

/// Append single-valued query parameters
pub fn params<I, K, V>(pairs: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    RequestOption::new(move |o| o.params.extend_pairs(pairs))
}

/// Append multi-valued query parameters
pub fn params_multi<I, K, VS, V>(entries: I) -> RequestOption
where
    I: IntoIterator<Item = (K, VS)>,
    K: Into<String>,
    VS: IntoIterator<Item = V>,
    V: Into<String>,
{
    let entries: Vec<(String, Vec<String>)> = entries
        .into_iter()
        .map(|(k, vs)| (k.into(), vs.into_iter().map(Into::into).collect()))
        .collect();
    RequestOption::new(move |o| o.params.extend_multi(entries))
}

/// Append query parameters from a flat `key, value, ...` list
///
/// # Panics
///
/// Panics if `kv` has an odd number of elements.
pub fn param_pairs(kv: &[&str]) -> RequestOption {
    let pairs = flat_pairs(kv);
    RequestOption::new(move |o| o.params.extend_pairs(pairs.iter()))
}

/// URL-encoded form body from single-valued fields
pub fn form<I, K, V>(pairs: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    RequestOption::new(move |o| o.with_form(|fields| fields.extend_pairs(pairs)))
}

/// URL-encoded form body from multi-valued fields
pub fn form_multi<I, K, VS, V>(entries: I) -> RequestOption
where
    I: IntoIterator<Item = (K, VS)>,
    K: Into<String>,
    VS: IntoIterator<Item = V>,
    V: Into<String>,
{
    let entries: Vec<(String, Vec<String>)> = entries
        .into_iter()
        .map(|(k, vs)| (k.into(), vs.into_iter().map(Into::into).collect()))
        .collect();
    RequestOption::new(move |o| o.with_form(|fields| fields.extend_multi(entries)))
}

/// URL-encoded form body from a flat `key, value, ...` list
///
/// # Panics
///
/// Panics if `kv` has an odd number of elements.
pub fn form_pairs(kv: &[&str]) -> RequestOption {
    let pairs = flat_pairs(kv);
    RequestOption::new(move |o| o.with_form(|fields| fields.extend_pairs(pairs.iter())))
}

/// Raw body drained from `reader` and sent unchanged
pub fn body_reader<R>(reader: R) -> RequestOption
where
    R: AsyncRead + Send + Unpin + 'static,
{
    RequestOption::new(move |o| o.set_body(BodyKind::Reader(Box::new(reader))))
}

/// Raw body bytes sent unchanged
pub fn body(bytes: impl Into<Bytes>) -> RequestOption {
    let bytes = bytes.into();
    RequestOption::new(move |o| o.set_body(BodyKind::Bytes(bytes)))
}

/// Text rendering of `value` as the body
pub fn data(value: impl Display) -> RequestOption {
    let text = value.to_string();
    RequestOption::new(move |o| o.set_body(BodyKind::Data(text)))
}

/// JSON body; serialization happens now, a failure surfaces from the call
pub fn json<T: Serialize + ?Sized>(value: &T) -> RequestOption {
    let encoded = serde_json::to_vec(value).map(Bytes::from);
    RequestOption::new(move |o| match encoded {
        Ok(bytes) => o.set_body(BodyKind::Json(bytes)),
        Err(err) => o.defer(err),
    })
}

/// Upload the file at `path` as multipart field `field`
pub fn file(field: impl Into<String>, path: impl Into<PathBuf>) -> RequestOption {
    let (field, path) = (field.into(), path.into());
    RequestOption::new(move |o| o.add_file(field, FileSource::Path(path)))
}

/// Upload several files, one multipart part per `(field, path)`
pub fn files<I, K, P>(entries: I) -> RequestOption
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: Into<PathBuf>,
{
    let entries: Vec<(String, PathBuf)> = entries
        .into_iter()
        .map(|(k, p)| (k.into(), p.into()))
        .collect();
    RequestOption::new(move |o| {
        for (field, path) in entries {
            o.add_file(field, FileSource::Path(path));
        }
    })
}

/// Upload an already opened file under `file_name`
pub fn file_handle(
    field: impl Into<String>,
    file_name: impl Into<String>,
    file: tokio::fs::File,
) -> RequestOption {
    let (field, file_name) = (field.into(), file_name.into());
    RequestOption::new(move |o| o.add_file(field, FileSource::Handle { file_name, file }))
}

/// Store the successful response body as text in `sink`
pub fn to_text(sink: &Sink<String>) -> RequestOption {
    let sink = sink.clone();
    RequestOption::new(move |o| o.set_text_sink(&sink))
}

/// Decode the successful response body as JSON into `sink`
pub fn to_json<T>(sink: &Sink<T>) -> RequestOption
where
    T: DeserializeOwned + Send + 'static,
{
    let sink = sink.clone();
    RequestOption::new(move |o| o.set_json_sink(&sink))
}

pub fn auth(auth: Auth) -> RequestOption {
    RequestOption::new(move |o| o.set_auth(auth))
}

/// HTTP Basic authentication
pub fn basic_auth(username: impl Into<String>, password: impl Into<String>) -> RequestOption {
    auth(Auth::basic(username, password))
}

/// Per-call timeout overriding the client default; zero disables the deadline
pub fn timeout(timeout: Duration) -> RequestOption {
    RequestOption::new(move |o| o.set_timeout(timeout))
}

/// Run the call under `token`; cancelling it aborts the call
pub fn cancellation(token: CancellationToken) -> RequestOption {
    RequestOption::new(move |o| o.set_cancellation(token))
}

/// Write the outgoing request in wire format into `sink`
pub fn dump_request(sink: &Sink<String>) -> RequestOption {
    let sink = sink.clone();
    RequestOption::new(move |o| o.set_dump_request(&sink))
}

/// Write the received response in wire format into `sink`
pub fn dump_response(sink: &Sink<String>) -> RequestOption {
    let sink = sink.clone();
    RequestOption::new(move |o| o.set_dump_response(&sink))
}

/// Outermost interceptor for this call only
pub fn interceptor(interceptor: impl Interceptor) -> RequestOption {
    let interceptor: Arc<dyn Interceptor> = Arc::new(interceptor);
    RequestOption::new(move |o| o.set_interceptor(interceptor))
}

/// Send this call over a fresh connection that is closed afterwards
pub fn disable_keep_alives() -> RequestOption {
    RequestOption::new(|o| o.set_disable_keep_alives(true))
}

/// Send this call through `transport` instead of the client's
pub fn transport(transport: Transport) -> RequestOption {
    RequestOption::new(move |o| o.set_transport(transport))
}
