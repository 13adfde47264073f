use crate::error::HttpError;
use base64::{Engine as _, engine::general_purpose};
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::fmt;
use zeroize::Zeroizing;

/// Authentication schemes a call can request.
///
/// Only [`AuthKind::Basic`] is implemented. `Proxy` and `Digest` are accepted
/// by the option surface but the call fails with
/// [`HttpError::NotImplemented`] before anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthKind {
    Basic,
    Proxy,
    Digest,
}

/// Authentication descriptor: scheme plus credentials.
#[derive(Clone)]
pub struct Auth {
    kind: AuthKind,
    username: String,
    password: Zeroizing<String>,
}

impl Auth {
    #[must_use]
    pub fn new(kind: AuthKind, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind,
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// HTTP Basic credentials
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(AuthKind::Basic, username, password)
    }

    #[must_use]
    pub fn kind(&self) -> AuthKind {
        self.kind
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Write the authorization header, replacing any value set earlier.
    pub(crate) fn apply(&self, headers: &mut HeaderMap) -> Result<(), HttpError> {
        match self.kind {
            AuthKind::Basic => {
                let credentials = Zeroizing::new(format!("{}:{}", self.username, &*self.password));
                let encoded =
                    Zeroizing::new(general_purpose::STANDARD.encode(credentials.as_bytes()));
                let mut value = HeaderValue::from_str(&format!("Basic {}", &*encoded))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                Ok(())
            }
            kind @ (AuthKind::Proxy | AuthKind::Digest) => Err(HttpError::NotImplemented(kind)),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let mut headers = HeaderMap::new();
        Auth::basic("test-client", "test-secret")
            .apply(&mut headers)
            .unwrap();

        let expected = format!(
            "Basic {}",
            general_purpose::STANDARD.encode("test-client:test-secret")
        );
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), expected.as_str());
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_basic_auth_overwrites_existing_header() {
        let mut headers = HeaderMap::new();
        headers.append(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        headers.append(AUTHORIZATION, HeaderValue::from_static("Bearer stale-2"));

        Auth::basic("user", "pass").apply(&mut headers).unwrap();

        let values: Vec<_> = headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert!(values[0].to_str().unwrap().starts_with("Basic "));
    }

    #[test]
    fn test_unimplemented_kinds_fail() {
        for kind in [AuthKind::Proxy, AuthKind::Digest] {
            let mut headers = HeaderMap::new();
            let err = Auth::new(kind, "user", "pass")
                .apply(&mut headers)
                .unwrap_err();
            assert!(matches!(err, HttpError::NotImplemented(k) if k == kind));
            assert!(headers.is_empty());
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Auth::basic("user", "hunter2"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
