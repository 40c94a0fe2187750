// src/services/session.rs

//! Portal session client.
//!
//! The portal has no API: login is a form POST whose outcome is encoded in
//! the redirect `Location`, and the session is a `PHPSESSID` cookie that the
//! server may renew on any response. The client therefore never follows
//! redirects, inspects `Location` itself, and keeps the current token behind
//! explicit accessors so no session state leaks anywhere else.

use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::header::{HeaderMap, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::error::{AppError, AuthFailure, Result};
use crate::models::PortalConfig;
use crate::utils::iso_to_ddmmyyyy;

const LOGIN_PATH: &str = "/control.php";
const WEEK_PAGE_PATH: &str = "/mostraralumno.php";

static SESSION_COOKIE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PHPSESSID=([^;]+)").expect("valid regex"));
static LOGIN_ERROR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"index\.php\?error_login=(\d)").expect("valid regex"));

/// Portal role selector submitted with the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A — alumno (student)
    Student,
    /// P — profesor
    Teacher,
    /// D — direccion
    Management,
    /// E — educador
    Educator,
}

impl Role {
    /// The single-letter code the portal expects in `opcion_rol`.
    pub fn code(self) -> &'static str {
        match self {
            Role::Student => "A",
            Role::Teacher => "P",
            Role::Management => "D",
            Role::Educator => "E",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Role::Student),
            "P" => Ok(Role::Teacher),
            "D" => Ok(Role::Management),
            "E" => Ok(Role::Educator),
            other => Err(AppError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// How the portal answered a login POST, judged from the redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginDisposition {
    Success,
    Failure(AuthFailure),
}

/// Session-authenticated HTTP client for the attendance portal.
pub struct SessionClient {
    client: Client,
    base_url: String,
    session: Mutex<Option<String>>,
}

impl SessionClient {
    /// Create a client for the given portal. Redirects are never followed so
    /// that `Location` can be inspected.
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session: Mutex::new(None),
        })
    }

    /// Current session token, if any.
    pub fn session(&self) -> Option<String> {
        self.session.lock().expect("session lock").clone()
    }

    /// Replace the session token (e.g. with one restored from disk).
    pub fn set_session(&self, token: Option<String>) {
        *self.session.lock().expect("session lock") = token;
    }

    /// Submit the login form and interpret the redirect target.
    ///
    /// On success the renewed session token is stored and returned; the three
    /// known failure redirects map to their [`AuthFailure`] kinds, anything
    /// else to `UnrecognizedResponse`. Auth failures are never retried.
    pub async fn authenticate(
        &self,
        role: Role,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let form = [
            ("opcion_rol", role.code()),
            ("usuario", username),
            ("contrasena", password),
        ];

        let response = self
            .client
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .form(&form)
            .send()
            .await?;

        let headers = response.headers().clone();
        self.absorb_renewed_session(&headers);

        let location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        log::debug!("login redirect: {:?}", location);

        match classify_login_redirect(location) {
            LoginDisposition::Success => self
                .session()
                .ok_or(AppError::Auth(AuthFailure::UnrecognizedResponse)),
            LoginDisposition::Failure(kind) => Err(AppError::Auth(kind)),
        }
    }

    /// Fetch the week page, selecting a week by its Monday when given.
    ///
    /// Without a date the portal serves the current week (plain GET); with
    /// one, the week selector form is POSTed. A renewed session cookie on the
    /// response replaces the stored token so later calls keep working.
    pub async fn fetch_week_page(&self, monday: Option<NaiveDate>) -> Result<String> {
        let url = format!("{}{}", self.base_url, WEEK_PAGE_PATH);
        let mut request = match monday {
            Some(date) => self.client.post(&url).form(&[
                ("mifecha", iso_to_ddmmyyyy(date)),
                ("envio", "Elegir".to_string()),
            ]),
            None => self.client.get(&url),
        };

        if let Some(token) = self.session() {
            request = request.header(COOKIE, format!("PHPSESSID={token}"));
        }

        let response = request.send().await?;
        self.absorb_renewed_session(response.headers());

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            log::warn!("week page redirected ({status}): {location}");
        }

        Ok(response.text().await?)
    }

    /// Store a renewed `PHPSESSID` if the response carried one.
    ///
    /// Any worker may observe a renewal; last-write-wins is fine because the
    /// upstream issues monotonically fresh tokens.
    fn absorb_renewed_session(&self, headers: &HeaderMap) {
        if let Some(token) = extract_session_token(headers) {
            *self.session.lock().expect("session lock") = Some(token);
        }
    }
}

/// Pull a `PHPSESSID` value from any `Set-Cookie` header.
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            SESSION_COOKIE_RE
                .captures(cookie)
                .map(|c| c[1].to_string())
        })
}

/// Map a login redirect target to success or a failure kind.
fn classify_login_redirect(location: &str) -> LoginDisposition {
    if location.contains("aplicacion.php") {
        return LoginDisposition::Success;
    }
    match LOGIN_ERROR_RE.captures(location) {
        Some(c) => {
            let code = c[1].parse::<u8>().unwrap_or(0);
            LoginDisposition::Failure(AuthFailure::from_code(code))
        }
        None => LoginDisposition::Failure(AuthFailure::UnrecognizedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn success_redirect_is_recognized() {
        assert_eq!(
            classify_login_redirect("https://faltas.cebanc.com/aplicacion.php"),
            LoginDisposition::Success
        );
    }

    #[test]
    fn error_codes_map_to_failure_kinds() {
        assert_eq!(
            classify_login_redirect("index.php?error_login=1"),
            LoginDisposition::Failure(AuthFailure::InvalidUser)
        );
        assert_eq!(
            classify_login_redirect("index.php?error_login=2"),
            LoginDisposition::Failure(AuthFailure::WrongPassword)
        );
        assert_eq!(
            classify_login_redirect("index.php?error_login=3"),
            LoginDisposition::Failure(AuthFailure::RoleNotAllowed)
        );
    }

    #[test]
    fn unknown_redirect_is_unrecognized() {
        assert_eq!(
            classify_login_redirect(""),
            LoginDisposition::Failure(AuthFailure::UnrecognizedResponse)
        );
        assert_eq!(
            classify_login_redirect("somewhere/else.php"),
            LoginDisposition::Failure(AuthFailure::UnrecognizedResponse)
        );
    }

    #[test]
    fn wrong_password_sets_no_session() {
        // error_login=2 with no Set-Cookie: the token holder must stay empty
        let client = SessionClient::new(&PortalConfig::default()).unwrap();
        let headers = HeaderMap::new();
        client.absorb_renewed_session(&headers);
        assert_eq!(client.session(), None);
        assert_eq!(
            classify_login_redirect("index.php?error_login=2"),
            LoginDisposition::Failure(AuthFailure::WrongPassword)
        );
    }

    #[test]
    fn session_token_extracted_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("PHPSESSID=abc123; path=/; HttpOnly"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));

        let mut other = HeaderMap::new();
        other.append(SET_COOKIE, HeaderValue::from_static("lang=es; path=/"));
        assert_eq!(extract_session_token(&other), None);
    }

    #[test]
    fn role_codes_round_trip() {
        for (s, role) in [
            ("A", Role::Student),
            ("p", Role::Teacher),
            ("D", Role::Management),
            ("e", Role::Educator),
        ] {
            assert_eq!(s.parse::<Role>().unwrap(), role);
            assert_eq!(role.code(), s.to_ascii_uppercase());
        }
        assert!("X".parse::<Role>().is_err());
    }
}
