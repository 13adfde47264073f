//! Redirect policy that keeps the caller's credentials across hops.
//!
//! `FollowRedirect` rebuilds every redirected request from the original
//! headers. This policy pins the `Authorization` value seen on the first hop
//! and re-attaches it to each later hop, or strips it when forwarding is
//! disabled.

use crate::config::RedirectConfig;
use http::header::{AUTHORIZATION, HeaderValue};
use http::Request;
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

#[derive(Debug, Clone)]
pub struct AuthForwardingRedirectPolicy {
    config: RedirectConfig,
    /// Redirects followed so far (a fresh clone is used per call)
    redirect_count: usize,
    /// Requests issued so far, the original one included
    hops: usize,
    authorization: Option<HeaderValue>,
}

impl AuthForwardingRedirectPolicy {
    #[must_use]
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config,
            redirect_count: 0,
            hops: 0,
            authorization: None,
        }
    }
}

impl<B: Clone, E> Policy<B, E> for AuthForwardingRedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        self.redirect_count += 1;
        if self.redirect_count > self.config.max_redirects {
            tracing::debug!(
                count = self.redirect_count,
                max = self.config.max_redirects,
                "Redirect limit reached"
            );
            return Ok(Action::Stop);
        }

        tracing::debug!(
            status = %attempt.status(),
            from = %attempt.previous(),
            to = %attempt.location(),
            "Following redirect"
        );
        Ok(Action::Follow)
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        self.hops += 1;
        if self.hops == 1 {
            self.authorization = request.headers().get(AUTHORIZATION).cloned();
            return;
        }

        let headers = request.headers_mut();
        match (&self.authorization, self.config.forward_authorization) {
            (Some(value), true) => {
                headers.insert(AUTHORIZATION, value.clone());
            }
            (_, false) => {
                if headers.remove(AUTHORIZATION).is_some() {
                    tracing::debug!("Stripped Authorization header on redirect");
                }
            }
            (None, true) => {}
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        // 307/308 redirects resend the original body
        Some(body.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn request(auth: Option<&'static str>) -> Request<()> {
        let mut builder = Request::builder().uri("https://example.com/");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap()
    }

    fn on_request(policy: &mut AuthForwardingRedirectPolicy, request: &mut Request<()>) {
        <AuthForwardingRedirectPolicy as Policy<(), ()>>::on_request(policy, request);
    }

    #[test]
    fn test_reattaches_authorization() {
        let mut policy = AuthForwardingRedirectPolicy::new(RedirectConfig::default());
        on_request(&mut policy, &mut request(Some("Basic abc")));

        let mut hop = request(None);
        on_request(&mut policy, &mut hop);
        assert_eq!(hop.headers().get(AUTHORIZATION).unwrap(), "Basic abc");
    }

    #[test]
    fn test_strips_authorization_when_disabled() {
        let config = RedirectConfig {
            forward_authorization: false,
            ..Default::default()
        };
        let mut policy = AuthForwardingRedirectPolicy::new(config);
        on_request(&mut policy, &mut request(Some("Basic abc")));

        let mut hop = request(Some("Basic abc"));
        on_request(&mut policy, &mut hop);
        assert!(hop.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_first_hop_untouched() {
        let mut policy = AuthForwardingRedirectPolicy::new(RedirectConfig {
            forward_authorization: false,
            ..Default::default()
        });
        let mut first = request(Some("Basic abc"));
        on_request(&mut policy, &mut first);
        assert_eq!(first.headers().get(AUTHORIZATION).unwrap(), "Basic abc");
    }

    #[test]
    fn test_no_authorization_to_forward() {
        let mut policy = AuthForwardingRedirectPolicy::new(RedirectConfig::default());
        on_request(&mut policy, &mut request(None));

        let mut hop = request(None);
        on_request(&mut policy, &mut hop);
        assert!(hop.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_policy_new() {
        let policy = AuthForwardingRedirectPolicy::new(RedirectConfig::disabled());
        assert_eq!(policy.redirect_count, 0);
        assert_eq!(policy.hops, 0);
        assert!(policy.authorization.is_none());
    }
}
