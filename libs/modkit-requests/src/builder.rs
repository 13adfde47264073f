use crate::config::{HttpClientConfig, RedirectConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::interceptor::{Interceptor, InterceptorChain, TracingInterceptor};
use crate::transport::{Transport, TransportFactory, TransportSelector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builder for an [`HttpClient`].
///
/// [`HttpClient`]: crate::HttpClient
#[must_use]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Option<Transport>,
    host_transports: HashMap<String, Transport>,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a builder with a specific configuration
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            interceptors: Vec::new(),
            transport: None,
            host_transports: HashMap::new(),
        }
    }

    /// Default per-call timeout; `Duration::ZERO` disables it
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set transport security mode
    ///
    /// Use `TransportSecurity::AllowInsecureHttp` only for testing with mock servers.
    pub fn transport_security(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Allow plain `http://` URLs (for testing only)
    ///
    /// Equivalent to `.transport_security(TransportSecurity::AllowInsecureHttp)`.
    ///
    /// Only available in debug builds or with the `allow-insecure-http`
    /// feature enabled.
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "modkit_requests::security",
            "allow_insecure_http() called - HTTP traffic will NOT be encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Set the maximum number of redirects to follow
    ///
    /// `0` returns 3xx responses as they are.
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.redirect.max_redirects = max_redirects;
        self
    }

    pub fn redirect(mut self, config: RedirectConfig) -> Self {
        self.config.redirect = config;
        self
    }

    /// Idle connection timeout of the pooled transport; `None` keeps hyper's default
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool.idle_timeout = timeout;
        self
    }

    /// Maximum number of idle connections kept per host; `0` disables reuse
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool.max_idle_per_host = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool.connect_timeout = timeout;
        self
    }

    pub fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool.tls_handshake_timeout = timeout;
        self
    }

    /// Replace the pooled transport for every call of this client.
    ///
    /// Calls that disable keep-alive still go through this transport.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Route calls for `host` (or `host:port`) through `transport`
    pub fn host_transport(mut self, host: impl AsRef<str>, transport: Transport) -> Self {
        self.host_transports
            .insert(host.as_ref().to_ascii_lowercase(), transport);
        self
    }

    /// Append a client interceptor.
    ///
    /// The first interceptor added is the outermost one.
    pub fn with_interceptor(self, interceptor: impl Interceptor) -> Self {
        self.with_shared_interceptor(Arc::new(interceptor))
    }

    pub fn with_shared_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Wrap every call in an `outgoing_http` tracing span, outside all other interceptors
    pub fn trace_requests(mut self, enabled: bool) -> Self {
        self.config.trace_requests = enabled;
        self
    }

    /// Build the client.
    ///
    /// The pooled transport is created here, once; calls only clone it.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS initialization fails or the user agent is not
    /// a valid header value.
    pub fn build(self) -> Result<crate::HttpClient, HttpError> {
        let Self {
            config,
            mut interceptors,
            transport,
            host_transports,
        } = self;

        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                target: "modkit_requests::security",
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 plain http:// URLs will be accepted"
            );
        }

        let (pooled, factory) = match transport {
            Some(custom) => (custom, None),
            None => {
                let factory = TransportFactory::new(&config)?;
                (factory.pooled(), Some(factory))
            }
        };

        if config.trace_requests {
            interceptors.insert(0, Arc::new(TracingInterceptor));
        }
        let chain = InterceptorChain::new(interceptors);

        tracing::debug!(
            interceptors = chain.len(),
            host_overrides = host_transports.len(),
            custom_transport = factory.is_none(),
            "HTTP client built"
        );

        Ok(crate::HttpClient {
            transports: TransportSelector::new(pooled, factory, host_transports),
            chain,
            default_timeout: config.request_timeout,
            max_body_size: config.max_body_size,
            transport_security: config.transport,
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
