use sha2::{Digest, Sha256};

use crate::config::ConsoleSettings;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "ipd_session";
pub const OPERATOR_COOKIE: &str = "ipd_operator";
pub const THEME_COOKIE: &str = "ipd_theme";

/// Lowercase hex SHA-256 of `input`.
pub fn digest_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn digest_matches(input: &str, expected_hex: &str) -> bool {
    digest_hex(input) == expected_hex.trim().to_lowercase()
}

/// Check the shared console password and pick the display identity.
///
/// Returns the operator name the session will run as.
pub fn authenticate_operator(
    settings: &ConsoleSettings,
    operator: &str,
    password: &str,
) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::validation("password", "Password is required"));
    }
    if !digest_matches(password, &settings.shared_password_sha256) {
        return Err(AppError::Auth("Invalid password".into()));
    }
    Ok(settings.resolve_operator(operator))
}

/// Check the passcode guarding the protected chat.
pub fn verify_chat_passcode(settings: &ConsoleSettings, passcode: &str) -> Result<(), AppError> {
    if passcode.is_empty() {
        return Err(AppError::validation("passcode", "Passcode is required"));
    }
    if !digest_matches(passcode, &settings.chat_passcode_sha256) {
        return Err(AppError::Auth("Incorrect passcode".into()));
    }
    Ok(())
}

#[cfg(feature = "server")]
mod handlers {
    use axum::extract::State;
    use axum::Json;
    use axum_extra::extract::cookie::{Cookie, SameSite};
    use axum_extra::extract::CookieJar;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::app::AppState;
    use crate::auth::models::{LoginRequest, LoginResponse, SessionInfo, Theme};
    use crate::auth::session::{ConsoleSession, CurrentSession};

    fn cookie(name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }

    /// `POST /api/auth/login`
    ///
    /// On success, opens a console session and sets the session and
    /// operator cookies. An empty operator falls back to the remembered one.
    pub async fn login_handler(
        State(state): State<AppState>,
        jar: CookieJar,
        Json(req): Json<LoginRequest>,
    ) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
        let requested = if req.operator.trim().is_empty() {
            jar.get(OPERATOR_COOKIE)
                .map(|c| c.value().to_string())
                .unwrap_or_default()
        } else {
            req.operator
        };

        let operator = authenticate_operator(&state.settings, &requested, &req.password)?;

        if let Some(previous) = jar.get(SESSION_COOKIE) {
            state.sessions.remove(previous.value());
        }
        // A browser closed without signing out leaves its session behind.
        let stale = state.sessions.remove_operator(&operator);
        if stale > 0 {
            tracing::info!("Closed {} earlier session(s) of {}", stale, operator);
        }

        let session = state.sessions.insert(ConsoleSession::open(
            operator.clone(),
            state.mention_repo.clone(),
        ))?;
        tracing::info!("Operator {} signed in", operator);

        let jar = jar
            .add(cookie(SESSION_COOKIE, session.token().to_string()))
            .add(cookie(OPERATOR_COOKIE, operator.clone()));

        Ok((
            jar,
            Json(LoginResponse {
                message: "Login successful".to_string(),
                operator,
            }),
        ))
    }

    /// `GET /api/auth/me`
    pub async fn me_handler(CurrentSession(session): CurrentSession) -> Json<SessionInfo> {
        Json(SessionInfo {
            operator: session.operator().to_string(),
            message: format!("Welcome back, {}!", session.operator()),
            chat_unlocked: session.chat_unlocked(),
        })
    }

    /// `POST /api/auth/logout`
    ///
    /// Closes the session and clears its cookie. Operator and theme cookies
    /// stay.
    pub async fn logout_handler(State(state): State<AppState>, jar: CookieJar) -> CookieJar {
        if let Some(token) = jar.get(SESSION_COOKIE) {
            state.sessions.remove(token.value());
        }

        let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").removal().build();
        jar.remove(cookie)
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct ThemeRequest {
        #[serde(default)]
        pub theme: Option<Theme>,
    }

    #[derive(Debug, Serialize)]
    pub struct ThemeResponse {
        pub theme: Theme,
    }

    /// `POST /api/preferences/theme`
    ///
    /// Sets the given theme, or toggles the stored one when none is given.
    pub async fn theme_handler(
        jar: CookieJar,
        Json(req): Json<ThemeRequest>,
    ) -> (CookieJar, Json<ThemeResponse>) {
        let theme = req.theme.unwrap_or_else(|| {
            jar.get(THEME_COOKIE)
                .and_then(|c| Theme::from_str_ci(c.value()))
                .unwrap_or_default()
                .toggle()
        });

        let jar = jar.add(cookie(THEME_COOKIE, theme.to_string()));
        (jar, Json(ThemeResponse { theme }))
    }
}

#[cfg(feature = "server")]
pub use handlers::*;
