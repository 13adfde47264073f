use http::HeaderMap;
use http::header::SET_COOKIE;
use std::collections::HashMap;

/// One cookie parsed from a `Set-Cookie` response header.
///
/// Only the attributes a caller typically inspects are kept. `expires` is the
/// raw attribute text; nothing here acts on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<String>,
    pub max_age: Option<i64>,
    pub same_site: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// Parse one `Set-Cookie` value; `None` when it has no `name=value` pair.
    pub(crate) fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_owned(),
            value: value.trim().trim_matches('"').to_owned(),
            ..Default::default()
        };

        for part in parts {
            let part = part.trim();
            match part.split_once('=') {
                Some((key, val)) => {
                    let val = val.trim();
                    match key.trim().to_ascii_lowercase().as_str() {
                        "path" => cookie.path = Some(val.to_owned()),
                        "domain" => cookie.domain = Some(val.trim_start_matches('.').to_owned()),
                        "expires" => cookie.expires = Some(val.to_owned()),
                        "max-age" => cookie.max_age = val.parse().ok(),
                        "samesite" => cookie.same_site = Some(normalize_same_site(val)),
                        _ => {}
                    }
                }
                None => {
                    if part.eq_ignore_ascii_case("secure") {
                        cookie.secure = true;
                    } else if part.eq_ignore_ascii_case("httponly") {
                        cookie.http_only = true;
                    }
                }
            }
        }
        Some(cookie)
    }
}

fn normalize_same_site(value: &str) -> String {
    if value.eq_ignore_ascii_case("lax") {
        "Lax".to_owned()
    } else if value.eq_ignore_ascii_case("strict") {
        "Strict".to_owned()
    } else if value.eq_ignore_ascii_case("none") {
        "None".to_owned()
    } else {
        value.to_owned()
    }
}

/// Cookies from every `Set-Cookie` header, keyed by name. A later header
/// with the same name replaces an earlier one.
pub fn parse_set_cookies(headers: &HeaderMap) -> HashMap<String, Cookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(Cookie::parse)
        .map(|cookie| (cookie.name.clone(), cookie))
        .collect()
}
