use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::context;
use crate::error::HttpError;
use crate::interceptor::{InterceptorChain, Terminal};
use crate::options::{RequestOption, RequestOptions};
use crate::request::{self, Request};
use crate::request_builder::RequestBuilder;
use crate::response::{self, HttpResponse, Outputs};
use crate::sink::Sink;
use crate::transport::{Transport, TransportSelector};
use async_trait::async_trait;
use http::Method;
use std::time::Duration;
use tower::ServiceExt;

/// HTTP client running calls through the request pipeline.
///
/// Each call resolves its options, encodes the body, builds the request, then
/// runs it through the client interceptor chain around a single round trip.
/// Non-2xx responses come back as [`HttpError::Status`] with the response
/// still attached.
///
/// # Thread Safety
///
/// `HttpClient` is `Clone + Send + Sync`. Clones share the pooled transport,
/// the composed interceptor chain and the per-host overrides; none of them is
/// modified after the client is built.
///
/// # Example
///
/// ```ignore
/// let items = Sink::<Vec<Item>>::new();
/// client
///     .get("https://example.com/api/items")
///     .param("page", "2")
///     .to_json(&items)
///     .send()
///     .await?;
/// let items = items.take().unwrap_or_default();
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    pub(crate) transports: TransportSelector,
    pub(crate) chain: InterceptorChain,
    pub(crate) default_timeout: Duration,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring the HTTP client
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Start a request with an arbitrary method.
    ///
    /// The URL must be absolute. Query parameters may be passed either as a
    /// literal query string in `url` or through options, not both.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, url.to_owned())
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    pub fn head(&self, url: &str) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Interceptors installed on this client, outermost first
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Default per-call timeout
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute one call.
    ///
    /// `options` are applied in order. Nothing touches the network until every
    /// option resolved, the body encoded and the request built.
    ///
    /// # Errors
    ///
    /// - usage and encoding errors before any network activity
    /// - [`HttpError::Transport`], [`HttpError::Timeout`] or
    ///   [`HttpError::Cancelled`] without a response
    /// - [`HttpError::Status`] / [`HttpError::Decode`] with the response attached
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        options: Vec<RequestOption>,
    ) -> Result<HttpResponse, HttpError> {
        let RequestOptions {
            headers,
            params,
            body,
            to_text,
            to_json,
            auth,
            timeout,
            cancellation,
            dump_request,
            dump_response,
            interceptor,
            disable_keep_alives,
            transport,
            ..
        } = RequestOptions::resolve(self.default_timeout, options)?;

        let target = request::target_url(url, &params, self.transport_security)?;
        let encoded = crate::body::encode(body).await?;
        let mut request = request::build(method, target, headers, encoded, auth.as_ref())?;

        if let Some(sink) = &dump_request {
            sink.put(request.dump());
        }

        // Cancels the call token when this call returns, on every path
        let (call_context, _guard) = context::derive(cancellation.as_ref(), timeout);
        request.set_context(call_context);

        let (transport, kind) =
            self.transports
                .select(transport, request.url(), disable_keep_alives);
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            transport = %kind,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "Executing request"
        );

        let round_trip = RoundTrip {
            transport,
            max_body_size: self.max_body_size,
            dump_response,
            outputs: Outputs {
                text: to_text,
                json: to_json,
            },
        };

        let result = match interceptor {
            Some(outermost) => {
                self.chain
                    .with_outermost(outermost)
                    .run(request, &round_trip)
                    .await
            }
            None => self.chain.run(request, &round_trip).await,
        };

        match &result {
            Ok(response) => tracing::debug!(status = %response.status(), "Request completed"),
            Err(err) => tracing::debug!(error = %err, "Request failed"),
        }
        result
    }
}

/// The innermost step of every call: one round trip plus classification.
struct RoundTrip {
    transport: Transport,
    max_body_size: usize,
    dump_response: Option<Sink<String>>,
    outputs: Outputs,
}

#[async_trait]
impl Terminal for RoundTrip {
    async fn call(&self, request: Request) -> Result<HttpResponse, HttpError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let (http_request, call_context) = request.into_http()?;
        let transport = self.transport.clone();

        let response = call_context
            .run(async move {
                let response = transport.oneshot(http_request).await?;
                response::read(response, method, url, self.max_body_size).await
            })
            .await?;

        if let Some(sink) = &self.dump_response {
            sink.put(response.dump());
        }
        response::classify(response, &self.outputs)
    }
}
