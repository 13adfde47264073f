use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("modkit-requests/", env!("CARGO_PKG_VERSION"));

/// Default per-call timeout applied when a call does not set its own
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection pool settings of the shared pooled transport.
///
/// These are fixed once the client is built; the transport selector only ever
/// clones the connector, it never changes the pool of a live client.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of idle connections kept per host (default: 32)
    ///
    /// `0` disables connection reuse for the pooled transport.
    pub max_idle_per_host: usize,

    /// How long an idle connection stays in the pool (default: 90 seconds)
    ///
    /// `None` keeps hyper-util's default.
    pub idle_timeout: Option<Duration>,

    /// TCP connect (dial) timeout (default: 30 seconds)
    pub connect_timeout: Duration,

    /// Timeout for the whole connect step including the TLS handshake (default: 10 seconds)
    pub tls_handshake_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 32,
            idle_timeout: Some(Duration::from_secs(90)),
            connect_timeout: Duration::from_secs(30),
            tls_handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration for redirect behavior
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// Maximum number of redirects to follow (default: 10)
    ///
    /// Set to `0` to disable redirect following entirely.
    pub max_redirects: usize,

    /// Re-attach the original `Authorization` header on redirected hops (default: true)
    pub forward_authorization: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            forward_authorization: true,
        }
    }
}

impl RedirectConfig {
    /// Create a configuration that disables redirect following
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_redirects: 0,
            ..Default::default()
        }
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
///
/// Controls whether the client enforces TLS or allows insecure HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections (for testing with mock servers only)
    AllowInsecureHttp,
}

/// Client-wide settings shared by every call made through one [`HttpClient`].
///
/// This replaces process-global defaults: each client owns its configuration
/// and the pipeline only ever reads it.
///
/// [`HttpClient`]: crate::HttpClient
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Default per-call timeout (default: 60 seconds)
    ///
    /// A call may override it with its own timeout. `Duration::ZERO` disables
    /// the deadline.
    pub request_timeout: Duration,

    /// Maximum response body size in bytes (default: 10 MB)
    pub max_body_size: usize,

    /// User-Agent header value, added when a request has none
    pub user_agent: String,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Connection pool settings
    pub pool: PoolConfig,

    /// Redirect policy
    pub redirect: RedirectConfig,

    /// Install the built-in tracing interceptor as the outermost client interceptor (default: false)
    pub trace_requests: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            max_body_size: 10 * 1024 * 1024, // 10 MB
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            pool: PoolConfig::default(),
            redirect: RedirectConfig::default(),
            trace_requests: false,
        }
    }
}

impl HttpClientConfig {
    /// Small footprint configuration: short timeout, small pool, 1 MB bodies
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024, // 1 MB
            pool: PoolConfig {
                max_idle_per_host: 8,
                idle_timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
