//! Process-wide default client behind the module-level request functions.
//!
//! The default client is created lazily with [`HttpClientConfig::default`]
//! unless the application installs its own with [`set_default_client`] first.
//!
//! [`HttpClientConfig::default`]: crate::HttpClientConfig

use crate::client::HttpClient;
use crate::error::HttpError;
use crate::options::RequestOption;
use crate::response::HttpResponse;
use http::Method;
use std::sync::OnceLock;

static DEFAULT_CLIENT: OnceLock<HttpClient> = OnceLock::new();

/// Install `client` as the process-wide default.
///
/// # Errors
///
/// Returns `client` back when a default client already exists.
pub fn set_default_client(client: HttpClient) -> Result<(), HttpClient> {
    DEFAULT_CLIENT.set(client)
}

/// The process-wide default client, created on first use
///
/// # Errors
///
/// Returns an error if the default client cannot be built (TLS initialization).
pub fn default_client() -> Result<&'static HttpClient, HttpError> {
    if let Some(client) = DEFAULT_CLIENT.get() {
        return Ok(client);
    }
    let client = HttpClient::new()?;
    // A concurrent first use may win the race; its client is returned then
    Ok(DEFAULT_CLIENT.get_or_init(|| client))
}

async fn execute(
    method: Method,
    url: &str,
    options: Vec<RequestOption>,
) -> Result<HttpResponse, HttpError> {
    default_client()?.execute(method, url, options).await
}

/// `GET` through the default client
///
/// # Errors
///
/// See [`HttpClient::execute`].
pub async fn get(url: &str, options: Vec<RequestOption>) -> Result<HttpResponse, HttpError> {
    execute(Method::GET, url, options).await
}

/// `POST` through the default client
///
/// # Errors
///
/// See [`HttpClient::execute`].
pub async fn post(url: &str, options: Vec<RequestOption>) -> Result<HttpResponse, HttpError> {
    execute(Method::POST, url, options).await
}

/// `PUT` through the default client
///
/// # Errors
///
/// See [`HttpClient::execute`].
pub async fn put(url: &str, options: Vec<RequestOption>) -> Result<HttpResponse, HttpError> {
    execute(Method::PUT, url, options).await
}

/// `PATCH` through the default client
///
/// # Errors
///
/// See [`HttpClient::execute`].
pub async fn patch(url: &str, options: Vec<RequestOption>) -> Result<HttpResponse, HttpError> {
    execute(Method::PATCH, url, options).await
}

/// `DELETE` through the default client
///
/// # Errors
///
/// See [`HttpClient::execute`].
pub async fn delete(url: &str, options: Vec<RequestOption>) -> Result<HttpResponse, HttpError> {
    execute(Method::DELETE, url, options).await
}

/// `HEAD` through the default client
///
/// # Errors
///
/// See [`HttpClient::execute`].
pub async fn head(url: &str, options: Vec<RequestOption>) -> Result<HttpResponse, HttpError> {
    execute(Method::HEAD, url, options).await
}
