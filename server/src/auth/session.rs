//! Moves session tokens between the `auth_token` cookie and the token service.
//!
//! The transport never looks inside a token. Setting and clearing use the
//! exact same attribute set; browsers will not drop a cookie whose `Path` or
//! `SameSite` differ from the one they hold.

use std::fmt;
use std::time::Duration;

use anyhow::{Result, anyhow};
use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use tracing::debug;

use shared::types::Environment;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Duration,
    pub path: &'static str,
}

impl CookieAttributes {
    /// Production: `Secure` + `SameSite=Strict`. Otherwise plain HTTP works
    /// and `SameSite=Lax`.
    pub fn for_environment(env: Environment, max_age: Duration) -> Self {
        let production = env.is_production();
        Self {
            http_only: true,
            secure: production,
            same_site: if production { SameSite::Strict } else { SameSite::Lax },
            max_age,
            path: "/",
        }
    }

    fn render(&self, name: &str, value: &str, max_age: Duration) -> String {
        let mut cookie = format!("{}={}", name, value);
        cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        cookie.push_str(&format!("; Path={}", self.path));
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site));
        cookie
    }
}

#[derive(Debug, Clone)]
pub struct SessionTransport {
    attributes: CookieAttributes,
}

impl SessionTransport {
    pub fn new(attributes: CookieAttributes) -> Self {
        Self { attributes }
    }

    /// Append a `Set-Cookie` carrying `token`.
    pub fn attach(&self, headers: &mut HeaderMap, token: &str) -> Result<()> {
        let cookie = self
            .attributes
            .render(AUTH_COOKIE, token, self.attributes.max_age);
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| anyhow!("Invalid session cookie value: {}", e))?;
        headers.append(SET_COOKIE, value);
        debug!("Attached session cookie");
        Ok(())
    }

    /// Append a `Set-Cookie` that expires the session cookie immediately.
    pub fn clear(&self, headers: &mut HeaderMap) -> Result<()> {
        let cookie = self.attributes.render(AUTH_COOKIE, "", Duration::ZERO);
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| anyhow!("Invalid clearing cookie value: {}", e))?;
        headers.append(SET_COOKIE, value);
        debug!("Cleared session cookie");
        Ok(())
    }

    /// Raw token from the request's `Cookie` header(s), if any. An empty
    /// value counts as absent.
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                (name.trim() == AUTH_COOKIE).then(|| value.trim().to_string())
            })
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    fn set_cookie_lines(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    /// Minimal browser jar: applies `Set-Cookie` lines and replays a
    /// `Cookie` header.
    fn replay(set_cookies: &[String]) -> HeaderMap {
        let mut jar: Vec<(String, String)> = Vec::new();
        for line in set_cookies {
            let mut parts = line.split(';');
            let (name, value) = parts.next().unwrap().split_once('=').unwrap();
            let expired = parts.any(|p| p.trim() == "Max-Age=0");
            jar.retain(|(n, _)| n != name);
            if !expired {
                jar.push((name.to_string(), value.to_string()));
            }
        }
        let mut headers = HeaderMap::new();
        if !jar.is_empty() {
            let line = jar
                .iter()
                .map(|(n, v)| format!("{}={}", n, v))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert(COOKIE, HeaderValue::from_str(&line).unwrap());
        }
        headers
    }

    #[test]
    fn production_attributes_are_strict_and_secure() {
        let a = CookieAttributes::for_environment(Environment::Production, DAY);
        assert!(a.http_only && a.secure);
        assert_eq!(a.same_site, SameSite::Strict);
        assert_eq!(a.path, "/");
    }

    #[test]
    fn development_attributes_are_lax() {
        let a = CookieAttributes::for_environment(Environment::Development, DAY);
        assert!(a.http_only);
        assert!(!a.secure);
        assert_eq!(a.same_site, SameSite::Lax);
    }

    #[test]
    fn attach_writes_all_attributes() {
        let t = SessionTransport::new(CookieAttributes::for_environment(
            Environment::Production,
            DAY,
        ));
        let mut headers = HeaderMap::new();
        t.attach(&mut headers, "abc.def.ghi").unwrap();
        assert_eq!(
            set_cookie_lines(&headers),
            vec!["auth_token=abc.def.ghi; Max-Age=86400; Path=/; HttpOnly; Secure; SameSite=Strict"]
        );
    }

    #[test]
    fn clear_uses_same_attributes_with_zero_max_age() {
        let t = SessionTransport::new(CookieAttributes::for_environment(
            Environment::Production,
            DAY,
        ));
        let mut headers = HeaderMap::new();
        t.clear(&mut headers).unwrap();
        assert_eq!(
            set_cookie_lines(&headers),
            vec!["auth_token=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=Strict"]
        );
    }

    #[test]
    fn extract_finds_cookie_among_others() {
        let t = SessionTransport::new(CookieAttributes::for_environment(
            Environment::Development,
            DAY,
        ));
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; auth_token=tok123; lang=en"),
        );
        assert_eq!(t.extract(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn extract_without_cookie_is_none() {
        let t = SessionTransport::new(CookieAttributes::for_environment(
            Environment::Development,
            DAY,
        ));
        assert!(t.extract(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("auth_token_old=x"));
        assert!(t.extract(&headers).is_none());
    }

    #[test]
    fn attach_then_clear_leaves_jar_empty() {
        let t = SessionTransport::new(CookieAttributes::for_environment(
            Environment::Development,
            DAY,
        ));
        let mut headers = HeaderMap::new();
        t.attach(&mut headers, "tok").unwrap();
        assert_eq!(t.extract(&replay(&set_cookie_lines(&headers))).as_deref(), Some("tok"));

        t.clear(&mut headers).unwrap();
        assert!(t.extract(&replay(&set_cookie_lines(&headers))).is_none());
    }
}
