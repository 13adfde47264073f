use crate::cookie::{Cookie, parse_set_cookies};
use crate::error::HttpError;
use crate::options::JsonBinding;
use crate::request::write_headers;
use crate::security::body_preview;
use crate::sink::Sink;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

/// Type alias for the boxed response body that supports decompression.
///
/// This type can hold either a raw body or a decompressed body (gzip/br/deflate).
/// The body is type-erased to allow the decompression layer to work transparently.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Received response with its body already drained.
///
/// The body is read from the network exactly once; every accessor returns the
/// buffered copy.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    method: Method,
    url: Uri,
}

impl HttpResponse {
    /// Response assembled from already buffered parts.
    ///
    /// Lets an interceptor answer a call without reaching the transport.
    #[must_use]
    pub fn from_parts(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        method: Method,
        url: Uri,
    ) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body,
            method,
            url,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status line text, e.g. `404 Not Found`
    #[must_use]
    pub fn status_text(&self) -> String {
        self.status.to_string()
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text; invalid UTF-8 is replaced
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    ///
    /// Returns the parser error when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Method of the request that produced this response
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL of the request that produced this response
    #[must_use]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Cookies set by this response, keyed by name
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, Cookie> {
        parse_set_cookies(&self.headers)
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Wire-format rendering: status line, headers, blank line, body.
    #[must_use]
    pub fn dump(&self) -> String {
        ResponseDump(self).to_string()
    }
}

struct ResponseDump<'a>(&'a HttpResponse);

impl fmt::Display for ResponseDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = self.0;
        write!(f, "{:?} {}\r\n", response.version, response.status)?;
        write_headers(f, &response.headers)?;
        f.write_str("\r\n")?;
        f.write_str(&String::from_utf8_lossy(&response.body))
    }
}

/// Drain a transport response into an [`HttpResponse`].
///
/// The body stream is consumed to the end and dropped on every path. The limit
/// applies to decompressed bytes.
pub async fn read(
    response: http::Response<ResponseBody>,
    method: Method,
    url: Uri,
    limit: usize,
) -> Result<HttpResponse, HttpError> {
    let (parts, body) = response.into_parts();
    let body = read_body_limited(body, limit).await?;
    Ok(HttpResponse {
        status: parts.status,
        version: parts.version,
        headers: parts.headers,
        body,
        method,
        url,
    })
}

async fn read_body_limited(body: ResponseBody, limit: usize) -> Result<Bytes, HttpError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::BodyRead)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}

/// Output bindings filled from a successful response.
#[derive(Default)]
pub struct Outputs {
    pub(crate) text: Option<Sink<String>>,
    pub(crate) json: Option<JsonBinding>,
}

/// Turn a drained response into the call result.
///
/// Non-2xx becomes [`HttpError::Status`] carrying the response. On 2xx the
/// output bindings are filled; a JSON decode failure is returned as
/// [`HttpError::Decode`], again with the response attached.
pub fn classify(response: HttpResponse, outputs: &Outputs) -> Result<HttpResponse, HttpError> {
    let status = response.status();
    if !status.is_success() {
        return Err(HttpError::Status {
            status,
            body_preview: body_preview(&response.body),
            response: Box::new(response),
        });
    }

    if let Some(sink) = &outputs.text {
        sink.put(response.text());
    }
    if let Some(bind) = &outputs.json
        && let Err(source) = bind(&response.body)
    {
        return Err(HttpError::Decode {
            source,
            response: Box::new(response),
        });
    }
    Ok(response)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde::Deserialize;

    fn response(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse::from_parts(
            status,
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
            Method::GET,
            "https://example.com/item".parse().unwrap(),
        )
    }

    fn boxed(body: &'static str) -> ResponseBody {
        Full::new(Bytes::from_static(body.as_bytes()))
            .map_err(|never| match never {})
            .boxed()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_not_found_returns_error_and_response() {
        let err = classify(
            response(StatusCode::NOT_FOUND, "not found"),
            &Outputs::default(),
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("404 Not Found"), "got: {message}");
        assert!(message.contains("not found"), "got: {message}");

        let response = err.response().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(&response.bytes()[..], b"not found");
    }

    #[test]
    fn test_bindings_not_filled_on_error_status() {
        let text = Sink::new();
        let outputs = Outputs {
            text: Some(text.clone()),
            json: None,
        };
        let result = classify(response(StatusCode::INTERNAL_SERVER_ERROR, "boom"), &outputs);
        assert!(result.is_err());
        assert!(!text.is_filled());
    }

    #[test]
    fn test_success_fills_bindings() {
        let text = Sink::new();
        let item = Sink::<Item>::new();
        let item_handle = item.clone();
        let outputs = Outputs {
            text: Some(text.clone()),
            json: Some(Box::new(move |body: &[u8]| {
                item_handle.put(serde_json::from_slice(body)?);
                Ok(())
            })),
        };

        let response = classify(response(StatusCode::OK, r#"{"id":5}"#), &outputs).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text.take().as_deref(), Some(r#"{"id":5}"#));
        assert_eq!(item.take(), Some(Item { id: 5 }));
    }

    #[test]
    fn test_decode_failure_keeps_response() {
        let outputs = Outputs {
            text: None,
            json: Some(Box::new(|body: &[u8]| {
                serde_json::from_slice::<Item>(body).map(drop)
            })),
        };
        let err = classify(response(StatusCode::OK, "not json"), &outputs).unwrap_err();
        assert!(matches!(err, HttpError::Decode { .. }));
        assert_eq!(err.response().unwrap().text(), "not json");
    }

    #[tokio::test]
    async fn test_read_drains_body() {
        let raw = http::Response::builder()
            .status(StatusCode::CREATED)
            .header("set-cookie", "a=1")
            .body(boxed("hello"))
            .unwrap();
        let response = read(raw, Method::POST, "https://example.com/".parse().unwrap(), 1024)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.text(), "hello");
        assert_eq!(response.text(), "hello", "reads return the buffered copy");
        assert_eq!(*response.method(), Method::POST);
        assert_eq!(response.cookies()["a"].value, "1");
    }

    #[tokio::test]
    async fn test_read_enforces_limit() {
        let raw = http::Response::builder()
            .body(boxed("0123456789"))
            .unwrap();
        let err = read(raw, Method::GET, "https://example.com/".parse().unwrap(), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::BodyTooLarge { limit: 4, .. }));
    }

    #[test]
    fn test_status_text_and_dump() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", http::HeaderValue::from_static("text/plain"));
        let response = HttpResponse::from_parts(
            StatusCode::NOT_FOUND,
            headers,
            Bytes::from_static(b"not found"),
            Method::GET,
            "https://example.com/".parse().unwrap(),
        );
        assert_eq!(response.status_text(), "404 Not Found");
        assert_eq!(
            response.dump(),
            "HTTP/1.1 404 Not Found\r\ncontent-type: text/plain\r\n\r\nnot found"
        );
    }

    #[test]
    fn test_json_accessor() {
        let item: Item = response(StatusCode::OK, r#"{"id":9}"#).json().unwrap();
        assert_eq!(item, Item { id: 9 });
    }
}
