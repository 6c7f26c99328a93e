//! Cookie and header parsing/building for authentication.

use axum::http::{HeaderMap, header};

use crate::jwt::IssuedToken;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Non-HttpOnly flag cookie so client-side code can tell it is logged in.
pub const LOGGED_IN_COOKIE_NAME: &str = "logged_in";

/// Extract a cookie value from the Cookie header. Empty values count as absent.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn build_cookie(name: &str, value: &str, max_age: u64, http_only: bool, secure: bool) -> String {
    let http_only = if http_only { "; HttpOnly" } else { "" };
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}{}; SameSite=Lax; Path=/; Max-Age={}{}",
        name, value, http_only, max_age, secure
    )
}

/// Set-Cookie values for a freshly issued access token (plus refresh token on login).
pub fn session_cookies(
    access: &IssuedToken,
    refresh: Option<&IssuedToken>,
    secure: bool,
) -> Vec<String> {
    let mut cookies = vec![
        build_cookie(
            ACCESS_COOKIE_NAME,
            &access.token,
            access.max_age,
            true,
            secure,
        ),
        build_cookie(LOGGED_IN_COOKIE_NAME, "true", access.max_age, false, secure),
    ];
    if let Some(refresh) = refresh {
        cookies.push(build_cookie(
            REFRESH_COOKIE_NAME,
            &refresh.token,
            refresh.max_age,
            true,
            secure,
        ));
    }
    cookies
}

/// Set-Cookie values that expire all client-held auth cookies.
pub fn cleared_cookies(secure: bool) -> [String; 3] {
    [
        build_cookie(ACCESS_COOKIE_NAME, "", 0, true, secure),
        build_cookie(REFRESH_COOKIE_NAME, "", 0, true, secure),
        build_cookie(LOGGED_IN_COOKIE_NAME, "", 0, false, secure),
    ]
}
