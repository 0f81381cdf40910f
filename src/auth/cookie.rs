use axum::http::{header, HeaderMap};

/// Name of the session cookie set on login and OAuth sign-in.
pub const SESSION_COOKIE: &str = "session_token";

/// Pull the session token out of a request's `Cookie` header, if present.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_value(raw, SESSION_COOKIE)
}

fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name && !v.is_empty()).then(|| v.to_string())
    })
}

/// `Set-Cookie` value issuing a session credential. HttpOnly keeps it away
/// from page scripts; Max-Age mirrors the server-side session TTL.
pub fn set_session_cookie(token: &str, ttl_hours: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl_hours * 3600
    )
}

/// `Set-Cookie` value revoking the session credential.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Name of the short-lived cookie carrying the OAuth `state` nonce between
/// the consent redirect and the provider callback.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// How long the state cookie lives. Generous for a consent screen, far too
/// short for a replay.
const OAUTH_STATE_TTL_SECS: i64 = 600;

pub fn oauth_state_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_value(raw, OAUTH_STATE_COOKIE)
}

pub fn set_oauth_state_cookie(state: &str) -> String {
    format!(
        "{OAUTH_STATE_COOKIE}={state}; Path=/; HttpOnly; SameSite=Lax; Max-Age={OAUTH_STATE_TTL_SECS}"
    )
}

pub fn clear_oauth_state_cookie() -> String {
    format!("{OAUTH_STATE_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_session_token_among_other_cookies() {
        let headers = headers_with_cookie("theme=dark; session_token=abc123; lang=en");
        assert_eq!(session_token_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        assert_eq!(session_token_from_headers(&HeaderMap::new()), None);
        let headers = headers_with_cookie("session_token=");
        assert_eq!(session_token_from_headers(&headers), None);
        let headers = headers_with_cookie("other=value");
        assert_eq!(session_token_from_headers(&headers), None);
    }

    #[test]
    fn set_cookie_carries_ttl_and_flags() {
        let value = set_session_cookie("tok", 168);
        assert!(value.starts_with("session_token=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains(&format!("Max-Age={}", 168 * 3600)));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = clear_session_cookie();
        assert!(value.contains("Max-Age=0"));
        assert!(value.starts_with("session_token=;"));
    }

    #[test]
    fn oauth_state_cookie_round_trips() {
        let value = set_oauth_state_cookie("nonce123");
        assert!(value.starts_with("oauth_state=nonce123;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=600"));

        let headers = headers_with_cookie("session_token=abc; oauth_state=nonce123");
        assert_eq!(oauth_state_from_headers(&headers).as_deref(), Some("nonce123"));
        assert_eq!(oauth_state_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn clear_oauth_state_cookie_expires_immediately() {
        let value = clear_oauth_state_cookie();
        assert!(value.starts_with("oauth_state=;"));
        assert!(value.contains("Max-Age=0"));
    }
}
