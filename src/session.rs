// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookies carrying the token pair.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::time::Duration;

use crate::services::TokenPair;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn seconds(ttl: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

/// Store both tokens, each cookie living as long as its token.
pub fn attach(
    jar: CookieJar,
    pair: &TokenPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        pair.access_token.clone(),
        seconds(access_ttl),
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        pair.refresh_token.clone(),
        seconds(refresh_ttl),
        secure,
    ))
}

/// Expire both cookies.
///
/// Emitted unconditionally, even when the request carried no cookies, so a
/// client authenticated by bearer header is still told to drop them.
pub fn clear(jar: CookieJar, secure: bool) -> CookieJar {
    let expired = |name| {
        let mut cookie = session_cookie(name, String::new(), time::Duration::ZERO, secure);
        cookie.set_expires(time::OffsetDateTime::UNIX_EPOCH);
        cookie
    };
    jar.add(expired(ACCESS_COOKIE)).add(expired(REFRESH_COOKIE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn test_attach_sets_both_cookies() {
        let jar = attach(
            CookieJar::new(),
            &pair(),
            Duration::from_secs(900),
            Duration::from_secs(864_000),
            true,
        );

        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "access");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(time::Duration::seconds(900)));

        let refresh = jar.get(REFRESH_COOKIE).unwrap();
        assert_eq!(refresh.value(), "refresh");
        assert_eq!(refresh.max_age(), Some(time::Duration::seconds(864_000)));
    }

    #[test]
    fn test_insecure_cookies_for_local_dev() {
        let jar = attach(
            CookieJar::new(),
            &pair(),
            Duration::from_secs(1),
            Duration::from_secs(1),
            false,
        );
        assert_eq!(jar.get(ACCESS_COOKIE).unwrap().secure(), Some(false));
    }

    #[test]
    fn test_clear_expires_cookies() {
        let jar = clear(CookieJar::new(), true);

        for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
            assert_eq!(cookie.path(), Some("/"));
        }
    }
}
