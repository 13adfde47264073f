use crate::error::HttpError;
use http::header::USER_AGENT;
use http::{HeaderValue, Request};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Adds the client's User-Agent to requests that do not carry one.
#[derive(Debug, Clone)]
pub struct UserAgentLayer {
    value: HeaderValue,
}

impl UserAgentLayer {
    #[must_use]
    pub fn new(value: HeaderValue) -> Self {
        Self { value }
    }

    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if `user_agent` is not a valid header value
    pub fn try_new(user_agent: &str) -> Result<Self, HttpError> {
        Ok(Self::new(HeaderValue::from_str(user_agent)?))
    }
}

impl<S> Layer<S> for UserAgentLayer {
    type Service = UserAgentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UserAgentService {
            inner,
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserAgentService<S> {
    inner: S,
    value: HeaderValue,
}

impl<S, B> Service<Request<B>> for UserAgentService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.headers_mut()
            .entry(USER_AGENT)
            .or_insert_with(|| self.value.clone());
        self.inner.call(req)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{ServiceExt, service_fn};

    async fn seen_user_agent(req: Request<()>) -> Option<HeaderValue> {
        let svc = UserAgentLayer::try_new("modkit-requests/test")
            .unwrap()
            .layer(service_fn(|req: Request<()>| async move {
                Ok::<_, Infallible>(req.headers().get(USER_AGENT).cloned())
            }));
        svc.oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_user_agent_added_when_missing() {
        let req = Request::builder().uri("https://example.com").body(()).unwrap();
        assert_eq!(seen_user_agent(req).await.unwrap(), "modkit-requests/test");
    }

    #[tokio::test]
    async fn test_caller_user_agent_kept() {
        let req = Request::builder()
            .uri("https://example.com")
            .header(USER_AGENT, "custom/2.0")
            .body(())
            .unwrap();
        assert_eq!(seen_user_agent(req).await.unwrap(), "custom/2.0");
    }

    #[test]
    fn test_invalid_value_rejected() {
        assert!(matches!(
            UserAgentLayer::try_new("bad\x00agent"),
            Err(HttpError::InvalidHeaderValue(_))
        ));
    }
}
