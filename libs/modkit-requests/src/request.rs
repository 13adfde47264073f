//! The materialized request seen by interceptors and the transport.

use crate::auth::Auth;
use crate::body::EncodedBody;
use crate::config::TransportSecurity;
use crate::context::CallContext;
use crate::error::{HttpError, InvalidUriKind};
use crate::multimap::MultiMap;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, HeaderMap};
use http::{Method, Uri};
use http_body_util::Full;
use std::fmt;

/// Outgoing request, fully built.
///
/// Query parameters are already merged into the URL and the body is buffered.
/// Interceptors may rewrite any part of it, including the [`CallContext`],
/// before passing it on.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    body: Bytes,
    body_size: u64,
    context: CallContext,
}

impl Request {
    /// Empty-bodied request running under a background context
    #[must_use]
    pub fn new(method: Method, url: Uri) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            body_size: 0,
            context: CallContext::background(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    pub fn set_url(&mut self, url: Uri) {
        self.url = url;
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Buffered body bytes
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text; invalid UTF-8 is replaced
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Payload size. For multipart uploads this is the summed file size.
    #[must_use]
    pub fn body_size(&self) -> u64 {
        self.body_size
    }

    /// Replace the body; the size becomes the new body length
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.body_size = self.body.len() as u64;
    }

    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn set_context(&mut self, context: CallContext) {
        self.context = context;
    }

    /// Same request under another context
    #[must_use]
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// Wire-format rendering: request line, headers, blank line, body.
    #[must_use]
    pub fn dump(&self) -> String {
        RequestDump(self).to_string()
    }

    pub(crate) fn into_http(self) -> Result<(http::Request<Full<Bytes>>, CallContext), HttpError> {
        let mut request = http::Request::builder()
            .method(self.method)
            .uri(self.url)
            .body(Full::new(self.body))?;
        *request.headers_mut() = self.headers;
        Ok((request, self.context))
    }
}

struct RequestDump<'a>(&'a Request);

impl fmt::Display for RequestDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self.0;
        let target = request
            .url
            .path_and_query()
            .map_or("/", http::uri::PathAndQuery::as_str);
        write!(f, "{} {target} HTTP/1.1\r\n", request.method)?;
        if !request.headers.contains_key(HOST)
            && let Some(authority) = request.url.authority()
        {
            write!(f, "Host: {authority}\r\n")?;
        }
        write_headers(f, &request.headers)?;
        if !request.body.is_empty() && !request.headers.contains_key(CONTENT_LENGTH) {
            write!(f, "Content-Length: {}\r\n", request.body.len())?;
        }
        f.write_str("\r\n")?;
        f.write_str(&String::from_utf8_lossy(&request.body))
    }
}

pub fn write_headers(f: &mut fmt::Formatter<'_>, headers: &HeaderMap) -> fmt::Result {
    for (name, value) in headers {
        write!(
            f,
            "{name}: {}\r\n",
            String::from_utf8_lossy(value.as_bytes())
        )?;
    }
    Ok(())
}

/// Validate `url` and merge the encoded `params` into it.
///
/// A URL that already carries a literal `?` cannot be combined with
/// parameters; the two query sources are never merged.
pub fn target_url(
    url: &str,
    params: &MultiMap,
    security: TransportSecurity,
) -> Result<Uri, HttpError> {
    let merged;
    let url = if params.is_empty() {
        url
    } else {
        let before_fragment = url.split_once('#').map_or(url, |(base, _)| base);
        if before_fragment.contains('?') {
            return Err(HttpError::Usage(format!(
                "URL '{url}' already has a query string; pass either a literal query or parameters, not both"
            )));
        }
        let encoded = params.encode()?;
        merged = match url.split_once('#') {
            Some((base, fragment)) => format!("{base}?{encoded}#{fragment}"),
            None => format!("{url}?{encoded}"),
        };
        merged.as_str()
    };
    validate_url(url, security)
}

fn validate_url(url: &str, security: TransportSecurity) -> Result<Uri, HttpError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::ParseError,
            reason: e.to_string(),
        })?;

    if uri.authority().is_none() {
        return Err(HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    match uri.scheme_str() {
        Some("https") => Ok(uri),
        Some("http") => match security {
            TransportSecurity::AllowInsecureHttp => Ok(uri),
            TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            }),
        },
        Some(scheme) => Err(HttpError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        }),
        None => Err(HttpError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingScheme,
            reason: "missing scheme".to_owned(),
        }),
    }
}

/// Assemble the request: caller headers, then the body content type, then
/// the authorization header, each later step overwriting same-named values.
pub fn build(
    method: Method,
    url: Uri,
    mut headers: HeaderMap,
    body: EncodedBody,
    auth: Option<&Auth>,
) -> Result<Request, HttpError> {
    if let Some(content_type) = body.content_type {
        headers.insert(CONTENT_TYPE, content_type);
    }
    if let Some(auth) = auth {
        auth.apply(&mut headers)?;
    }
    Ok(Request {
        method,
        url,
        headers,
        body: body.bytes,
        body_size: body.size,
        context: CallContext::background(),
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::auth::AuthKind;
    use http::HeaderValue;
    use http::header::AUTHORIZATION;

    fn encoded(bytes: &'static [u8], content_type: Option<&'static str>) -> EncodedBody {
        EncodedBody {
            bytes: Bytes::from_static(bytes),
            content_type: content_type.map(HeaderValue::from_static),
            size: bytes.len() as u64,
        }
    }

    #[test]
    fn test_params_merged_into_url() {
        let params: MultiMap = [("key1", "value1"), ("key1", "value2"), ("q", "a b")]
            .into_iter()
            .collect();
        let uri = target_url(
            "https://example.com/get",
            &params,
            TransportSecurity::TlsOnly,
        )
        .unwrap();
        assert_eq!(
            uri.to_string(),
            "https://example.com/get?key1=value1&key1=value2&q=a+b"
        );
    }

    #[test]
    fn test_literal_query_without_params_is_kept() {
        let uri = target_url(
            "https://example.com/get?x=1",
            &MultiMap::new(),
            TransportSecurity::TlsOnly,
        )
        .unwrap();
        assert_eq!(uri.query(), Some("x=1"));
    }

    #[test]
    fn test_literal_query_with_params_is_usage_error() {
        let params: MultiMap = [("y", "2")].into_iter().collect();
        let err = target_url(
            "https://example.com/get?x=1",
            &params,
            TransportSecurity::TlsOnly,
        )
        .unwrap_err();
        assert!(matches!(err, HttpError::Usage(_)), "got {err:?}");
    }

    #[test]
    fn test_question_mark_in_fragment_is_not_a_query() {
        let params: MultiMap = [("a", "1")].into_iter().collect();
        let uri = target_url(
            "https://example.com/p#frag?x",
            &params,
            TransportSecurity::TlsOnly,
        )
        .unwrap();
        assert_eq!(uri.path(), "/p");
        assert_eq!(uri.query(), Some("a=1"));
    }

    #[test]
    fn test_http_rejected_when_tls_only() {
        let err = target_url("http://example.com", &MultiMap::new(), TransportSecurity::TlsOnly)
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidScheme { .. }));

        target_url(
            "http://example.com",
            &MultiMap::new(),
            TransportSecurity::AllowInsecureHttp,
        )
        .unwrap();
    }

    #[test]
    fn test_invalid_urls() {
        let err = target_url("/relative", &MultiMap::new(), TransportSecurity::TlsOnly)
            .unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUri {
                kind: InvalidUriKind::MissingAuthority,
                ..
            }
        ));

        let err = target_url("ftp://example.com/x", &MultiMap::new(), TransportSecurity::TlsOnly)
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidScheme { .. }));

        let err = target_url("ht tp://bad", &MultiMap::new(), TransportSecurity::TlsOnly)
            .unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidUri {
                kind: InvalidUriKind::ParseError,
                ..
            }
        ));
    }

    #[test]
    fn test_body_content_type_overrides_caller_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let request = build(
            Method::POST,
            "https://example.com".parse().unwrap(),
            headers,
            encoded(b"{}", Some("application/json")),
            None,
        )
        .unwrap();
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.text(), "{}");
        assert_eq!(request.body_size(), 2);
    }

    #[test]
    fn test_raw_body_keeps_caller_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let request = build(
            Method::POST,
            "https://example.com".parse().unwrap(),
            headers,
            encoded(b"hi", None),
            None,
        )
        .unwrap();
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_auth_applied_last() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer shadow"));
        let auth = Auth::basic("user", "pass");
        let request = build(
            Method::GET,
            "https://example.com".parse().unwrap(),
            headers,
            encoded(b"", None),
            Some(&auth),
        )
        .unwrap();
        let value = request.headers().get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(value.starts_with("Basic "), "got {value}");
    }

    #[test]
    fn test_unimplemented_auth_fails_build() {
        let auth = Auth::new(AuthKind::Proxy, "user", "pass");
        let err = build(
            Method::GET,
            "https://example.com".parse().unwrap(),
            HeaderMap::new(),
            encoded(b"", None),
            Some(&auth),
        )
        .unwrap_err();
        assert!(matches!(err, HttpError::NotImplemented(AuthKind::Proxy)));
    }

    #[test]
    fn test_dump_wire_format() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        let request = build(
            Method::POST,
            "https://example.com/post?a=1".parse().unwrap(),
            headers,
            encoded(b"payload", None),
            None,
        )
        .unwrap();
        assert_eq!(
            request.dump(),
            "POST /post?a=1 HTTP/1.1\r\nHost: example.com\r\nx-trace: abc\r\nContent-Length: 7\r\n\r\npayload"
        );
    }

    #[test]
    fn test_into_http_carries_parts() {
        let mut request = Request::new(Method::PUT, "https://example.com/x".parse().unwrap());
        request.headers_mut().insert("x-a", HeaderValue::from_static("1"));
        request.set_body("abc");
        let (http_request, _ctx) = request.into_http().unwrap();
        assert_eq!(*http_request.method(), Method::PUT);
        assert_eq!(http_request.uri(), "https://example.com/x");
        assert_eq!(http_request.headers().get("x-a").unwrap(), "1");
    }
}
