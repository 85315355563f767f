use crate::application_port::SessionError;
use crate::domain_model::{AuthToken, RefreshToken, SessionTokens};
use crate::settings;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use warp::http::{HeaderMap, HeaderName, HeaderValue, header};

pub const AUTH_COOKIE: &str = "AuthToken";
pub const REFRESH_COOKIE: &str = "RefreshToken";
pub const AUTH_FIELD: &str = "Auth_Token";
pub const REFRESH_FIELD: &str = "Refresh_Token";
pub const CSRF_FIELD: &str = "X-CSRF-Token";

const CSRF_HEADER: &str = "x-csrf-token";
const AUTH_EXPIRY_HEADER: &str = "auth-expiry";
const REFRESH_EXPIRY_HEADER: &str = "refresh-expiry";
const AUTH_FIELD_HEADER: &str = "auth_token";
const REFRESH_FIELD_HEADER: &str = "refresh_token";

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Cookies,
    Bearer,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub secure_cookies: bool,
}

impl TransportConfig {
    pub fn from_settings(auth: &settings::Auth) -> Self {
        Self {
            mode: if auth.bearer_tokens {
                TransportMode::Bearer
            } else {
                TransportMode::Cookies
            },
            secure_cookies: !auth.dev_env,
        }
    }
}

/// The parts of a request the transport reads.
pub struct RequestParts<'a> {
    pub headers: &'a HeaderMap,
    pub query: &'a str,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedCredentials {
    pub auth_token: Option<AuthToken>,
    pub refresh_token: Option<RefreshToken>,
    /// Empty when none was presented.
    pub csrf_secret: String,
}

#[derive(Debug, Default, Deserialize)]
struct BearerTokens {
    #[serde(rename = "Auth_Token", default)]
    auth_token: String,
    #[serde(rename = "Refresh_Token", default)]
    refresh_token: String,
}

pub fn extract_credentials(
    mode: TransportMode,
    parts: &RequestParts<'_>,
) -> Result<PresentedCredentials, SessionError> {
    let (auth_token, refresh_token) = match mode {
        TransportMode::Cookies => (
            cookie(parts.headers, AUTH_COOKIE).map(str::to_string),
            cookie(parts.headers, REFRESH_COOKIE).map(str::to_string),
        ),
        TransportMode::Bearer if has_content_type(parts.headers, "application/json") => {
            let tokens: BearerTokens = serde_json::from_slice(parts.body).map_err(|e| {
                SessionError::InternalError(format!("decoding bearer tokens json: {}", e))
            })?;
            (Some(tokens.auth_token), Some(tokens.refresh_token))
        }
        TransportMode::Bearer => (
            form_value(parts, AUTH_FIELD),
            form_value(parts, REFRESH_FIELD),
        ),
    };

    Ok(PresentedCredentials {
        auth_token: auth_token.filter(|t| !t.is_empty()).map(AuthToken),
        refresh_token: refresh_token.filter(|t| !t.is_empty()).map(RefreshToken),
        csrf_secret: csrf_secret(parts),
    })
}

/// Form field, then `X-CSRF-Token` header, then `Authorization: Basic <secret>`.
pub fn csrf_secret(parts: &RequestParts<'_>) -> String {
    if let Some(secret) = form_value(parts, CSRF_FIELD).filter(|s| !s.is_empty()) {
        return secret;
    }
    if let Some(secret) = header_str(parts.headers, CSRF_HEADER).filter(|s| !s.is_empty()) {
        return secret.to_string();
    }
    header_str(parts.headers, header::AUTHORIZATION)
        .unwrap_or_default()
        .replacen("Basic", "", 1)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn has_content_type(headers: &HeaderMap, expected: &str) -> bool {
    header_str(headers, header::CONTENT_TYPE)
        .and_then(|v| v.split(';').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

// Urlencoded body fields first, then the query string.
fn form_value(parts: &RequestParts<'_>, name: &str) -> Option<String> {
    let body = has_content_type(parts.headers, "application/x-www-form-urlencoded")
        .then_some(parts.body);
    body.into_iter()
        .chain(std::iter::once(parts.query.as_bytes()))
        .flat_map(url::form_urlencoded::parse)
        .find(|(key, _)| key.as_ref() == name)
        .map(|(_, value)| value.into_owned())
}

/// Headers to write onto a response.
#[derive(Debug, Clone, Default)]
pub struct ResponseDirectives {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseDirectives {
    /// Hand a fresh or refreshed session back to the client.
    pub fn issue(config: &TransportConfig, tokens: &SessionTokens) -> Result<Self, SessionError> {
        let mut directives = ResponseDirectives::default();
        match config.mode {
            TransportMode::Cookies => {
                directives.set_cookie(
                    config,
                    AUTH_COOKIE,
                    &tokens.auth_token.0,
                    tokens.auth_token_expires_at,
                )?;
                directives.set_cookie(
                    config,
                    REFRESH_COOKIE,
                    &tokens.refresh_token.0,
                    tokens.refresh_token_expires_at,
                )?;
            }
            TransportMode::Bearer => {
                directives.push(AUTH_FIELD_HEADER, &tokens.auth_token.0)?;
                directives.push(REFRESH_FIELD_HEADER, &tokens.refresh_token.0)?;
            }
        }
        directives.push(CSRF_HEADER, tokens.csrf_secret.as_str())?;
        directives.push(
            AUTH_EXPIRY_HEADER,
            &tokens.auth_token_expires_at.timestamp().to_string(),
        )?;
        directives.push(
            REFRESH_EXPIRY_HEADER,
            &tokens.refresh_token_expires_at.timestamp().to_string(),
        )?;
        Ok(directives)
    }

    /// Expire cookies or blank the bearer fields, and blank the secret.
    pub fn nullify(config: &TransportConfig, now: DateTime<Utc>) -> Self {
        let past = now - Duration::hours(1000);
        let mut directives = ResponseDirectives::default();
        // Every value below is plain ASCII, so none of these can fail.
        let _ = match config.mode {
            TransportMode::Cookies => directives
                .set_cookie(config, AUTH_COOKIE, "", past)
                .and_then(|_| directives.set_cookie(config, REFRESH_COOKIE, "", past)),
            TransportMode::Bearer => directives
                .push(AUTH_FIELD_HEADER, "")
                .and_then(|_| directives.push(REFRESH_FIELD_HEADER, "")),
        };
        let _ = directives.push(CSRF_HEADER, "");
        let _ = directives.push(AUTH_EXPIRY_HEADER, &past.timestamp().to_string());
        let _ = directives.push(REFRESH_EXPIRY_HEADER, &past.timestamp().to_string());
        directives
    }

    pub fn headers(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(name, value)| (name, value))
    }

    pub fn apply(&self, response: &mut warp::reply::Response) {
        let target = response.headers_mut();
        for (name, value) in &self.headers {
            if *name == header::SET_COOKIE {
                target.append(name.clone(), value.clone());
            } else {
                target.insert(name.clone(), value.clone());
            }
        }
    }

    fn push(&mut self, name: &'static str, value: &str) -> Result<(), SessionError> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            SessionError::InternalError(format!("invalid {} header value: {}", name, e))
        })?;
        self.headers.push((HeaderName::from_static(name), value));
        Ok(())
    }

    fn set_cookie(
        &mut self,
        config: &TransportConfig,
        name: &str,
        value: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let cookie = format!(
            "{}={}; Path=/; Expires={}; HttpOnly{}",
            name,
            value,
            expires.format(COOKIE_DATE_FORMAT),
            if config.secure_cookies { "; Secure" } else { "" },
        );
        self.push("set-cookie", &cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::CsrfSecret;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn parts<'a>(headers: &'a HeaderMap, query: &'a str, body: &'a [u8]) -> RequestParts<'a> {
        RequestParts {
            headers,
            query,
            body,
        }
    }

    fn tokens() -> SessionTokens {
        SessionTokens {
            auth_token: AuthToken("a.b.c".to_string()),
            refresh_token: RefreshToken("d.e.f".to_string()),
            csrf_secret: CsrfSecret("s3cr3t".to_string()),
            auth_token_expires_at: DateTime::<Utc>::from_timestamp(1_700_000_900, 0).unwrap(),
            refresh_token_expires_at: DateTime::<Utc>::from_timestamp(1_700_259_200, 0).unwrap(),
        }
    }

    #[test]
    fn cookies_are_read_by_name() {
        let h = headers(&[
            ("cookie", "theme=dark; AuthToken=aaa"),
            ("cookie", "RefreshToken=rrr"),
            ("x-csrf-token", "csrf"),
        ]);
        let credentials = extract_credentials(TransportMode::Cookies, &parts(&h, "", b"")).unwrap();
        assert_eq!(credentials.auth_token, Some(AuthToken("aaa".into())));
        assert_eq!(credentials.refresh_token, Some(RefreshToken("rrr".into())));
        assert_eq!(credentials.csrf_secret, "csrf");
    }

    #[test]
    fn missing_cookies_are_none() {
        let h = headers(&[("cookie", "AuthToken=")]);
        let credentials = extract_credentials(TransportMode::Cookies, &parts(&h, "", b"")).unwrap();
        assert_eq!(credentials.auth_token, None);
        assert_eq!(credentials.refresh_token, None);
        assert_eq!(credentials.csrf_secret, "");
    }

    #[test]
    fn bearer_json_body() {
        let h = headers(&[("content-type", "application/json; charset=utf-8")]);
        let body = br#"{"Auth_Token":"aaa","Refresh_Token":"rrr","other":1}"#;
        let credentials =
            extract_credentials(TransportMode::Bearer, &parts(&h, "X-CSRF-Token=q", body)).unwrap();
        assert_eq!(credentials.auth_token, Some(AuthToken("aaa".into())));
        assert_eq!(credentials.refresh_token, Some(RefreshToken("rrr".into())));
        assert_eq!(credentials.csrf_secret, "q");
    }

    #[test]
    fn bearer_json_that_does_not_decode_is_internal() {
        let h = headers(&[("content-type", "application/json")]);
        let result = extract_credentials(TransportMode::Bearer, &parts(&h, "", b"{not json"));
        assert!(matches!(result, Err(SessionError::InternalError(_))));
    }

    #[test]
    fn bearer_form_body_wins_over_query() {
        let h = headers(&[("content-type", "application/x-www-form-urlencoded")]);
        let body = b"Auth_Token=body-auth&Refresh_Token=body-refresh";
        let credentials = extract_credentials(
            TransportMode::Bearer,
            &parts(&h, "Auth_Token=query-auth", body),
        )
        .unwrap();
        assert_eq!(credentials.auth_token, Some(AuthToken("body-auth".into())));
        assert_eq!(credentials.refresh_token, Some(RefreshToken("body-refresh".into())));
    }

    #[test]
    fn bearer_fields_fall_back_to_query() {
        let h = HeaderMap::new();
        let credentials = extract_credentials(
            TransportMode::Bearer,
            &parts(&h, "Auth_Token=qa&Refresh_Token=qr", b""),
        )
        .unwrap();
        assert_eq!(credentials.auth_token, Some(AuthToken("qa".into())));
        assert_eq!(credentials.refresh_token, Some(RefreshToken("qr".into())));
    }

    #[test]
    fn csrf_precedence() {
        let form = headers(&[
            ("content-type", "application/x-www-form-urlencoded"),
            ("x-csrf-token", "from-header"),
            ("authorization", "Basic from-basic"),
        ]);
        assert_eq!(csrf_secret(&parts(&form, "", b"X-CSRF-Token=from-form")), "from-form");
        assert_eq!(csrf_secret(&parts(&form, "", b"")), "from-header");

        let basic = headers(&[("authorization", "Basic  from-basic ")]);
        assert_eq!(csrf_secret(&parts(&basic, "", b"")), "from-basic");

        let none = HeaderMap::new();
        assert_eq!(csrf_secret(&parts(&none, "", b"")), "");
    }

    #[test]
    fn form_fields_in_a_json_body_are_ignored() {
        let h = headers(&[("content-type", "application/json")]);
        assert_eq!(csrf_secret(&parts(&h, "", b"X-CSRF-Token=x")), "");
    }

    #[test]
    fn issue_sets_cookies_and_hints() {
        let config = TransportConfig {
            mode: TransportMode::Cookies,
            secure_cookies: true,
        };
        let directives = ResponseDirectives::issue(&config, &tokens()).unwrap();
        let mut response = warp::reply::Response::new(Default::default());
        directives.apply(&mut response);
        let h = response.headers();

        let cookies: Vec<_> = h
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(
            cookies[0],
            "AuthToken=a.b.c; Path=/; Expires=Tue, 14 Nov 2023 22:28:20 GMT; HttpOnly; Secure"
        );
        assert!(cookies[1].starts_with("RefreshToken=d.e.f; "));
        assert_eq!(h["x-csrf-token"], "s3cr3t");
        assert_eq!(h["auth-expiry"], "1700000900");
        assert_eq!(h["refresh-expiry"], "1700259200");
    }

    #[test]
    fn dev_cookies_are_not_secure() {
        let config = TransportConfig {
            mode: TransportMode::Cookies,
            secure_cookies: false,
        };
        let directives = ResponseDirectives::issue(&config, &tokens()).unwrap();
        assert!(
            directives
                .headers()
                .filter(|(name, _)| *name == header::SET_COOKIE)
                .all(|(_, value)| !value.to_str().unwrap().contains("Secure"))
        );
    }

    #[test]
    fn bearer_issue_echoes_fields_in_headers() {
        let config = TransportConfig {
            mode: TransportMode::Bearer,
            secure_cookies: true,
        };
        let directives = ResponseDirectives::issue(&config, &tokens()).unwrap();
        let mut response = warp::reply::Response::new(Default::default());
        directives.apply(&mut response);
        let h = response.headers();
        assert_eq!(h["auth_token"], "a.b.c");
        assert_eq!(h["refresh_token"], "d.e.f");
        assert!(h.get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn nullify_expires_everything() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let config = TransportConfig {
            mode: TransportMode::Cookies,
            secure_cookies: false,
        };
        let mut response = warp::reply::Response::new(Default::default());
        ResponseDirectives::nullify(&config, now).apply(&mut response);
        let h = response.headers();

        let past = (now - Duration::hours(1000)).timestamp().to_string();
        assert_eq!(h.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(
            h.get_all(header::SET_COOKIE)
                .iter()
                .all(|v| v.to_str().unwrap().contains("=; Path=/"))
        );
        assert_eq!(h["x-csrf-token"], "");
        assert_eq!(h["auth-expiry"], past.as_str());
        assert_eq!(h["refresh-expiry"], past.as_str());
    }
}
