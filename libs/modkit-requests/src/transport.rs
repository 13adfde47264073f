//! Transports and the per-call transport selection.
//!
//! A [`Transport`] is any boxed tower service turning a buffered request into
//! a streaming response. The client builds one pooled transport up front and
//! only ever clones it; calls that disable keep-alive get a disposable
//! transport sharing the same connector but no pool.

use crate::config::{HttpClientConfig, PoolConfig, RedirectConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::{AuthForwardingRedirectPolicy, UserAgentLayer};
use crate::response::ResponseBody;
use crate::tls;
use bytes::Bytes;
use http::header::{CONNECTION, HeaderValue};
use http::{Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::FollowRedirectLayer;
use tower_http::set_header::SetRequestHeaderLayer;

/// The round-trip service a call is sent through.
pub type Transport =
    BoxCloneSyncService<http::Request<Full<Bytes>>, http::Response<ResponseBody>, HttpError>;

/// Box any compatible service into a [`Transport`].
#[must_use]
pub fn boxed_transport<S>(service: S) -> Transport
where
    S: Service<http::Request<Full<Bytes>>, Response = http::Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    BoxCloneSyncService::new(service)
}

/// Which transport a call ended up using
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Transport supplied with the call
    PerCall,
    /// Override registered on the client for the target host
    PerHost,
    /// Fresh, unpooled transport for a call with keep-alive disabled
    Disposable,
    /// The client's shared pooled transport
    Pooled,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerCall => "per-call",
            Self::PerHost => "per-host",
            Self::Disposable => "disposable",
            Self::Pooled => "pooled",
        })
    }
}

/// Connect step elapsed before the connection (including TLS) was ready
#[derive(Debug)]
pub struct HandshakeElapsed(Duration);

impl fmt::Display for HandshakeElapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection handshake timed out after {:?}", self.0)
    }
}

impl std::error::Error for HandshakeElapsed {}

/// Connector wrapper bounding the whole connect step, TLS handshake included.
#[derive(Debug, Clone)]
pub struct HandshakeTimeout<C> {
    inner: C,
    timeout: Duration,
}

impl<C> HandshakeTimeout<C> {
    pub(crate) fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<C> Service<Uri> for HandshakeTimeout<C>
where
    C: Service<Uri>,
    C::Future: Send + 'static,
    C::Error: Into<BoxError>,
{
    type Response = C::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<C::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let timeout = self.timeout;
        let connecting = self.inner.call(uri);
        Box::pin(async move {
            match tokio::time::timeout(timeout, connecting).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(Box::new(HandshakeElapsed(timeout)) as BoxError),
            }
        })
    }
}

type Connector = HandshakeTimeout<HttpsConnector<HttpConnector>>;

/// Builds transports sharing one connector.
#[derive(Clone)]
pub struct TransportFactory {
    connector: Connector,
    pool: PoolConfig,
    redirect: RedirectConfig,
    user_agent: UserAgentLayer,
}

impl TransportFactory {
    pub(crate) fn new(config: &HttpClientConfig) -> Result<Self, HttpError> {
        let https = build_https_connector(config.tls_roots, config.transport, config.pool.connect_timeout)?;
        Ok(Self {
            connector: HandshakeTimeout::new(https, config.pool.tls_handshake_timeout),
            pool: config.pool.clone(),
            redirect: config.redirect.clone(),
            user_agent: UserAgentLayer::try_new(&config.user_agent)?,
        })
    }

    /// The shared transport: pooled connections per the client pool settings.
    pub(crate) fn pooled(&self) -> Transport {
        let mut builder = Client::builder(TokioExecutor::new());
        builder
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(self.pool.max_idle_per_host);
        if let Some(idle_timeout) = self.pool.idle_timeout {
            builder.pool_idle_timeout(idle_timeout);
        }
        let client = builder.build::<_, Full<Bytes>>(self.connector.clone());
        self.stack(client)
    }

    /// A transport for one call: nothing is pooled and the server is asked to
    /// close the connection.
    pub(crate) fn disposable(&self) -> Transport {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build::<_, Full<Bytes>>(self.connector.clone());
        let client = ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::overriding(
                CONNECTION,
                HeaderValue::from_static("close"),
            ))
            .service(client);
        self.stack(client)
    }

    /// Request flow (outer → inner):
    ///   UserAgent → Decompression → FollowRedirect → hyper client
    fn stack<S, B>(&self, client: S) -> Transport
    where
        S: Service<http::Request<Full<Bytes>>, Response = Response<B>> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError> + Send + Sync,
    {
        let service = ServiceBuilder::new()
            .layer(self.user_agent.clone())
            .layer(DecompressionLayer::new())
            .layer(FollowRedirectLayer::with_policy(
                AuthForwardingRedirectPolicy::new(self.redirect.clone()),
            ))
            .service(client)
            .map_response(map_decompression_response)
            .map_err(map_transport_error);
        BoxCloneSyncService::new(service)
    }
}

/// Map the decompression response to our boxed response body type.
fn map_decompression_response<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError> + Send + Sync,
{
    let (parts, body) = response.into_parts();
    let boxed_body: ResponseBody = body.map_err(Into::into).boxed();
    Response::from_parts(parts, boxed_body)
}

fn map_transport_error<E: Into<BoxError>>(err: E) -> HttpError {
    let err = err.into();
    match err.downcast::<HttpError>() {
        Ok(http_err) => *http_err,
        Err(other) => HttpError::Transport(other),
    }
}

/// Build the HTTPS connector with the specified TLS root configuration.
///
/// `dial_timeout` bounds the TCP connect only; the TLS handshake is bounded
/// by the [`HandshakeTimeout`] wrapped around the result.
fn build_https_connector(
    tls_roots: TlsRootConfig,
    transport: TransportSecurity,
    dial_timeout: Duration,
) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(dial_timeout));

    let builder = match tls_roots {
        TlsRootConfig::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(tls::crypto_provider())
            .map_err(|e| HttpError::Tls(Box::new(e)))?,
        TlsRootConfig::Native => {
            let client_config =
                tls::native_roots_client_config().map_err(|e| HttpError::Tls(e.into()))?;
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(client_config)
        }
    };

    let connector = if transport == TransportSecurity::AllowInsecureHttp {
        builder.https_or_http().enable_all_versions().wrap_connector(http)
    } else {
        builder.https_only().enable_all_versions().wrap_connector(http)
    };
    Ok(connector)
}

/// Per-call transport selection.
///
/// Precedence: per-call override, per-host override, disposable transport
/// when keep-alive is disabled, then the shared pooled transport. The shared
/// transport is cloned, never modified.
#[derive(Clone)]
pub struct TransportSelector {
    pooled: Transport,
    factory: Option<TransportFactory>,
    per_host: Arc<HashMap<String, Transport>>,
}

impl TransportSelector {
    pub(crate) fn new(
        pooled: Transport,
        factory: Option<TransportFactory>,
        per_host: HashMap<String, Transport>,
    ) -> Self {
        Self {
            pooled,
            factory,
            per_host: Arc::new(per_host),
        }
    }

    pub(crate) fn select(
        &self,
        per_call: Option<Transport>,
        url: &Uri,
        disable_keep_alives: bool,
    ) -> (Transport, TransportKind) {
        if let Some(transport) = per_call {
            return (transport, TransportKind::PerCall);
        }
        if let Some(transport) = self.host_override(url) {
            return (transport.clone(), TransportKind::PerHost);
        }
        if disable_keep_alives {
            if let Some(factory) = &self.factory {
                return (factory.disposable(), TransportKind::Disposable);
            }
            tracing::debug!("keep-alive cannot be disabled on a custom client transport");
        }
        (self.pooled.clone(), TransportKind::Pooled)
    }

    /// Override registered for `host:port`, falling back to the bare host.
    fn host_override(&self, url: &Uri) -> Option<&Transport> {
        if self.per_host.is_empty() {
            return None;
        }
        url.authority()
            .and_then(|authority| self.per_host.get(&authority.as_str().to_ascii_lowercase()))
            .or_else(|| {
                url.host()
                    .and_then(|host| self.per_host.get(&host.to_ascii_lowercase()))
            })
    }
}

impl fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSelector")
            .field("custom_pooled", &self.factory.is_none())
            .field("per_host", &self.per_host.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt as _;

    /// Transport answering with a fixed body naming itself.
    fn named(name: &'static str) -> Transport {
        boxed_transport(tower::service_fn(move |_req: http::Request<Full<Bytes>>| async move {
            let body: ResponseBody = Full::new(Bytes::from_static(name.as_bytes()))
                .map_err(|never| match never {})
                .boxed();
            Ok::<_, HttpError>(
                Response::builder()
                    .status(StatusCode::OK)
                    .body(body)
                    .unwrap(),
            )
        }))
    }

    async fn answer(transport: Transport) -> String {
        let request = http::Request::builder()
            .uri("https://example.com/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = transport.oneshot(request).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn selector() -> TransportSelector {
        let config = HttpClientConfig {
            transport: TransportSecurity::AllowInsecureHttp,
            ..Default::default()
        };
        let factory = TransportFactory::new(&config).unwrap();
        let mut per_host = HashMap::new();
        per_host.insert("special.example.com".to_owned(), named("per-host"));
        per_host.insert("ported.example.com:8443".to_owned(), named("per-port"));
        TransportSelector::new(named("pooled"), Some(factory), per_host)
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_precedence() {
        let selector = selector();

        let (t, kind) = selector.select(Some(named("call")), &uri("https://special.example.com/"), true);
        assert_eq!(kind, TransportKind::PerCall);
        assert_eq!(answer(t).await, "call");

        let (t, kind) = selector.select(None, &uri("https://special.example.com/x"), true);
        assert_eq!(kind, TransportKind::PerHost);
        assert_eq!(answer(t).await, "per-host");

        let (_, kind) = selector.select(None, &uri("https://other.example.com/"), true);
        assert_eq!(kind, TransportKind::Disposable);

        let (t, kind) = selector.select(None, &uri("https://other.example.com/"), false);
        assert_eq!(kind, TransportKind::Pooled);
        assert_eq!(answer(t).await, "pooled");
    }

    #[tokio::test]
    async fn test_host_override_matches_port_then_host() {
        let selector = selector();
        let (t, kind) = selector.select(None, &uri("https://ported.example.com:8443/"), false);
        assert_eq!(kind, TransportKind::PerHost);
        assert_eq!(answer(t).await, "per-port");

        let (_, kind) = selector.select(None, &uri("https://ported.example.com/"), false);
        assert_eq!(kind, TransportKind::Pooled);

        let (_, kind) = selector.select(None, &uri("https://SPECIAL.example.com:9000/"), false);
        assert_eq!(kind, TransportKind::PerHost);
    }

    #[tokio::test]
    async fn test_custom_pooled_transport_ignores_keep_alive_flag() {
        let selector = TransportSelector::new(named("custom"), None, HashMap::new());
        let (t, kind) = selector.select(None, &uri("https://example.com/"), true);
        assert_eq!(kind, TransportKind::Pooled);
        assert_eq!(answer(t).await, "custom");
    }

    #[tokio::test]
    async fn test_handshake_timeout_elapses() {
        let slow = tower::service_fn(|_uri: Uri| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, std::io::Error>(())
        });
        let mut connector = HandshakeTimeout::new(slow, Duration::from_millis(20));
        let err = connector
            .ready()
            .await
            .unwrap()
            .call(uri("https://example.com/"))
            .await
            .unwrap_err();
        assert!(err.is::<HandshakeElapsed>());
    }

    #[test]
    fn test_transport_error_mapping_preserves_http_error() {
        let boxed: BoxError = Box::new(HttpError::Cancelled);
        assert!(matches!(map_transport_error(boxed), HttpError::Cancelled));

        let other: BoxError = "boom".into();
        assert!(matches!(map_transport_error(other), HttpError::Transport(_)));
    }
}
