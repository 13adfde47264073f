//! Interceptors: middleware wrapped around the transport round trip.
//!
//! A chain is composed once, innermost link first, and shared behind an
//! `Arc`. Each invocation walks it through a by-value [`Next`], so an
//! interceptor can continue the call at most once; dropping `next` without
//! running it short-circuits the call and the interceptor must produce the
//! result itself.

use crate::error::HttpError;
use crate::request::Request;
use crate::response::HttpResponse;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Cross-cutting behavior around one call.
///
/// ```ignore
/// struct Signer;
///
/// #[async_trait::async_trait]
/// impl Interceptor for Signer {
///     async fn intercept(&self, mut request: Request, next: Next<'_>) -> Result<HttpResponse, HttpError> {
///         request.headers_mut().insert("x-signature", sign(request.bytes()));
///         next.run(request).await
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request, next: Next<'_>)
    -> Result<HttpResponse, HttpError>;
}

/// The innermost call of a chain: the round trip itself.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn call(&self, request: Request) -> Result<HttpResponse, HttpError>;
}

struct Link {
    interceptor: Arc<dyn Interceptor>,
    next: Option<Arc<Link>>,
}

/// Continuation handed to an interceptor: the rest of the chain plus the
/// round trip.
pub struct Next<'a> {
    link: Option<&'a Link>,
    terminal: &'a dyn Terminal,
}

impl Next<'_> {
    /// Continue the call with `request`
    ///
    /// # Errors
    ///
    /// Whatever the remaining interceptors or the round trip return.
    pub async fn run(self, request: Request) -> Result<HttpResponse, HttpError> {
        match self.link {
            Some(link) => {
                let next = Next {
                    link: link.next.as_deref(),
                    terminal: self.terminal,
                };
                link.interceptor.intercept(request, next).await
            }
            None => self.terminal.call(request).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("has_interceptor", &self.link.is_some())
            .finish_non_exhaustive()
    }
}

/// Ordered, immutable interceptor chain.
///
/// The first interceptor is outermost: it sees the request first and the
/// response last. Cloning is cheap and shares the composed links.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    head: Option<Arc<Link>>,
    len: usize,
}

impl InterceptorChain {
    /// Compose `interceptors` once, building the links from the innermost out.
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        let len = interceptors.len();
        let head = interceptors
            .into_iter()
            .rev()
            .fold(None, |next, interceptor| {
                Some(Arc::new(Link { interceptor, next }))
            });
        Self { head, len }
    }

    /// Chain with `interceptor` placed in front of every existing link.
    ///
    /// The existing links are shared, not copied; `self` is unchanged.
    #[must_use]
    pub fn with_outermost(&self, interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            head: Some(Arc::new(Link {
                interceptor,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Run `request` through the chain; an empty chain calls the terminal directly.
    pub(crate) async fn run(
        &self,
        request: Request,
        terminal: &dyn Terminal,
    ) -> Result<HttpResponse, HttpError> {
        Next {
            link: self.head.as_deref(),
            terminal,
        }
        .run(request)
        .await
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.len)
            .finish()
    }
}

/// Records each call in an `outgoing_http` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn intercept(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> Result<HttpResponse, HttpError> {
        let span = tracing::info_span!(
            "outgoing_http",
            http.method = %request.method(),
            http.url = %request.url(),
            http.request_body_size = request.body_size(),
            http.status_code = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        let result = next.run(request).instrument(span.clone()).await;
        match &result {
            Ok(response) => {
                span.record("http.status_code", response.status().as_u16());
            }
            Err(err) => {
                if let Some(status) = err.status() {
                    span.record("http.status_code", status.as_u16());
                }
                span.record("error", tracing::field::display(err));
                span.in_scope(|| tracing::debug!(error = %err, "outgoing request failed"));
            }
        }
        result
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use parking_lot::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        journal: Journal,
    }

    #[async_trait]
    impl Interceptor for Recorder {
        async fn intercept(
            &self,
            request: Request,
            next: Next<'_>,
        ) -> Result<HttpResponse, HttpError> {
            self.journal.lock().push(format!("{}(before)", self.name));
            let result = next.run(request).await;
            self.journal.lock().push(format!("{}(after)", self.name));
            result
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Interceptor for ShortCircuit {
        async fn intercept(
            &self,
            request: Request,
            _next: Next<'_>,
        ) -> Result<HttpResponse, HttpError> {
            Ok(HttpResponse::from_parts(
                StatusCode::ACCEPTED,
                HeaderMap::new(),
                Bytes::from_static(b"cached"),
                request.method().clone(),
                request.url().clone(),
            ))
        }
    }

    struct AddHeader;

    #[async_trait]
    impl Interceptor for AddHeader {
        async fn intercept(
            &self,
            mut request: Request,
            next: Next<'_>,
        ) -> Result<HttpResponse, HttpError> {
            request
                .headers_mut()
                .insert("x-added", http::HeaderValue::from_static("yes"));
            next.run(request).await
        }
    }

    struct Echo {
        journal: Journal,
    }

    #[async_trait]
    impl Terminal for Echo {
        async fn call(&self, request: Request) -> Result<HttpResponse, HttpError> {
            self.journal.lock().push("T".to_owned());
            let mut headers = HeaderMap::new();
            if let Some(value) = request.headers().get("x-added") {
                headers.insert("x-added", value.clone());
            }
            Ok(HttpResponse::from_parts(
                StatusCode::OK,
                headers,
                request.bytes().clone(),
                request.method().clone(),
                request.url().clone(),
            ))
        }
    }

    struct Failing;

    #[async_trait]
    impl Terminal for Failing {
        async fn call(&self, _request: Request) -> Result<HttpResponse, HttpError> {
            Err(HttpError::Cancelled)
        }
    }

    fn recorder(name: &'static str, journal: &Journal) -> Arc<dyn Interceptor> {
        Arc::new(Recorder {
            name,
            journal: Arc::clone(journal),
        })
    }

    fn request() -> Request {
        let mut request = Request::new(Method::POST, "https://example.com/x".parse().unwrap());
        request.set_body("ping");
        request
    }

    #[tokio::test]
    async fn test_onion_order() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(vec![recorder("A", &journal), recorder("B", &journal)]);
        let terminal = Echo {
            journal: Arc::clone(&journal),
        };

        chain.run(request(), &terminal).await.unwrap();

        assert_eq!(
            *journal.lock(),
            vec!["A(before)", "B(before)", "T", "B(after)", "A(after)"]
        );
    }

    #[tokio::test]
    async fn test_chain_is_reusable() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(vec![recorder("A", &journal)]);
        let terminal = Echo {
            journal: Arc::clone(&journal),
        };

        chain.run(request(), &terminal).await.unwrap();
        chain.run(request(), &terminal).await.unwrap();
        assert_eq!(journal.lock().len(), 6);
    }

    #[tokio::test]
    async fn test_empty_chain_matches_direct_call() {
        let journal = Journal::default();
        let terminal = Echo {
            journal: Arc::clone(&journal),
        };
        let chain = InterceptorChain::default();
        assert!(chain.is_empty());

        let via_chain = chain.run(request(), &terminal).await.unwrap();
        let direct = terminal.call(request()).await.unwrap();
        assert_eq!(via_chain.status(), direct.status());
        assert_eq!(via_chain.bytes(), direct.bytes());

        let via_chain = chain.run(request(), &Failing).await.unwrap_err();
        let direct = Failing.call(request()).await.unwrap_err();
        assert_eq!(via_chain.to_string(), direct.to_string());
    }

    #[tokio::test]
    async fn test_outermost_runs_first_and_shares_links() {
        let journal = Journal::default();
        let base = InterceptorChain::new(vec![recorder("client", &journal)]);
        let per_call = base.with_outermost(recorder("call", &journal));
        assert_eq!(base.len(), 1);
        assert_eq!(per_call.len(), 2);

        let terminal = Echo {
            journal: Arc::clone(&journal),
        };
        per_call.run(request(), &terminal).await.unwrap();
        assert_eq!(
            *journal.lock(),
            vec![
                "call(before)",
                "client(before)",
                "T",
                "client(after)",
                "call(after)"
            ]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_terminal() {
        let journal = Journal::default();
        let short_circuit: Arc<dyn Interceptor> = Arc::new(ShortCircuit);
        let chain = InterceptorChain::new(vec![short_circuit, recorder("B", &journal)]);
        let terminal = Echo {
            journal: Arc::clone(&journal),
        };

        let response = chain.run(request(), &terminal).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.text(), "cached");
        assert!(journal.lock().is_empty());
    }

    #[tokio::test]
    async fn test_interceptor_mutates_request() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(vec![Arc::new(AddHeader) as Arc<dyn Interceptor>]);
        let terminal = Echo {
            journal: Arc::clone(&journal),
        };
        let response = chain.run(request(), &terminal).await.unwrap();
        assert_eq!(response.headers().get("x-added").unwrap(), "yes");
    }

    #[tokio::test]
    async fn test_tracing_interceptor_passes_result_through() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(vec![Arc::new(TracingInterceptor) as Arc<dyn Interceptor>]);
        let terminal = Echo {
            journal: Arc::clone(&journal),
        };
        let response = chain.run(request(), &terminal).await.unwrap();
        assert_eq!(response.text(), "ping");

        let err = chain.run(request(), &Failing).await.unwrap_err();
        assert!(matches!(err, HttpError::Cancelled));
    }
}
