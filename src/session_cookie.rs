//! The `token` session cookie.
//!
//! Both services issue it with the same attributes. At the edge the value is
//! opaque: it is copied byte for byte from the backend's `Set-Cookie` and
//! re-issued under the edge's own cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::RuntimeMode;

pub const SESSION_COOKIE: &str = "token";
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy)]
pub struct SessionCookiePolicy {
    secure: bool,
}

impl SessionCookiePolicy {
    pub fn new(mode: RuntimeMode) -> Self {
        Self {
            secure: mode.is_production(),
        }
    }

    pub fn issue(&self, value: impl Into<String>) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value.into()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::days(SESSION_MAX_AGE_DAYS))
            .path("/")
            .build()
    }

    /// Expired, empty `token` cookie.
    ///
    /// Added to the jar rather than removed from it, so the `Set-Cookie` is
    /// sent even when the request carried no session.
    pub fn removal(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .path("/")
            .build()
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal())
    }

    pub fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(SESSION_COOKIE)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_attributes() {
        let cookie = SessionCookiePolicy::new(RuntimeMode::Development).issue("abc123");
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604_800)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_secure_in_production() {
        let cookie = SessionCookiePolicy::new(RuntimeMode::Production).issue("abc123");
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_clear_always_emits_expired_cookie() {
        let policy = SessionCookiePolicy::new(RuntimeMode::Development);
        let jar = policy.clear(CookieJar::new());
        let cookie = jar.get("token").unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_token_from_jar() {
        let policy = SessionCookiePolicy::new(RuntimeMode::Development);
        let jar = CookieJar::new().add(Cookie::new("token", "xyz"));
        assert_eq!(policy.token(&jar), Some("xyz"));

        let jar = CookieJar::new().add(Cookie::new("token", ""));
        assert_eq!(policy.token(&jar), None);
    }
}
