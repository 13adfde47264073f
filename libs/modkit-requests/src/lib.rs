#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Request execution pipeline for `ModKit`
//!
//! A call is described declaratively (method, URL and an ordered list of
//! options) and executed as one round trip:
//!
//! 1. options are folded into a per-call configuration, in order
//! 2. the active body variant is encoded and sets its content type
//! 3. the request is built: query parameters merged, auth header applied last
//! 4. the client interceptor chain runs around the round trip, under a
//!    cancellable, deadline-bound context
//! 5. the body is drained once and non-2xx statuses become
//!    [`HttpError::Status`], with the response still attached
//!
//! The transport underneath is a pooled hyper client over rustls with
//! transparent decompression and redirects that keep `Authorization`.
//!
//! # Example
//!
//! ```ignore
//! use modkit_requests::{HttpClient, Sink, opt};
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .trace_requests(true)
//!     .build()?;
//!
//! let user = Sink::<User>::new();
//! client
//!     .get("https://example.com/api/users/42")
//!     .header("accept", "application/json")
//!     .to_json(&user)
//!     .send()
//!     .await?;
//!
//! // The same call through the default client
//! modkit_requests::get(
//!     "https://example.com/api/users/42",
//!     vec![opt::to_json(&user)],
//! )
//! .await?;
//! ```

mod auth;
mod body;
mod builder;
mod client;
mod config;
mod context;
mod cookie;
mod default_client;
mod error;
mod interceptor;
mod layers;
mod multimap;
pub mod opt;
mod options;
mod request;
mod request_builder;
mod response;
pub mod security;
mod sink;
mod tls;
mod transport;

pub use auth::{Auth, AuthKind};
pub use body::BodyVariant;
pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig, PoolConfig, RedirectConfig,
    TlsRootConfig, TransportSecurity,
};
pub use context::CallContext;
pub use cookie::Cookie;
pub use default_client::{
    default_client, delete, get, head, patch, post, put, set_default_client,
};
pub use error::{HttpError, InvalidUriKind};
pub use interceptor::{Interceptor, InterceptorChain, Next, TracingInterceptor};
pub use layers::{AuthForwardingRedirectPolicy, UserAgentLayer, UserAgentService};
pub use multimap::MultiMap;
pub use options::{RequestOption, RequestOptions};
pub use request::Request;
pub use request_builder::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
pub use sink::Sink;
pub use transport::{Transport, TransportKind, boxed_transport};

pub use async_trait::async_trait;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
pub use tokio_util::sync::CancellationToken;
