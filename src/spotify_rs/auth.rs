use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use url::Url;

use crate::spotify_rs::types::{OAuthSession, SpotifyAuthResponse, SpotifyTokenResponse};

const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Reading the target playlist and changing its contents.
pub const SPOTIFY_SCOPES: [&str; 3] = [
    "playlist-modify-public",
    "playlist-modify-private",
    "playlist-read-private",
];

/// Generate a random string from the URL safe alphabet
fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            const CHARSET: &[u8] =
                b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
            CHARSET[rng.random_range(0..CHARSET.len())] as char
        })
        .collect()
}

/// Generate a random state parameter for CSRF protection
fn generate_state() -> String {
    generate_random_string(16)
}

fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// Initiate the Spotify authorization code flow.
/// Returns the authorization URL and the session needed to verify the callback.
pub fn initiate_oauth(client_id: &str, redirect_uri: &str) -> (SpotifyAuthResponse, OAuthSession) {
    let state = generate_state();
    let scope = SPOTIFY_SCOPES.join(" ");

    let auth_url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&state={}&scope={}",
        SPOTIFY_AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&state),
        urlencoding::encode(&scope)
    );

    let session = OAuthSession { state };

    let response = SpotifyAuthResponse { auth_url };

    (response, session)
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Spotify denied the authorization: {0}")]
    Denied(String),
    #[error("Callback URL has no `code` parameter")]
    MissingCode,
    #[error("Callback state does not match the authorization request")]
    StateMismatch,
}

/// Extract the authorization code from the URL Spotify redirected the browser to.
pub fn parse_callback_url(callback: &str, session: &OAuthSession) -> Result<String, CallbackError> {
    let url = Url::parse(callback.trim())?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(CallbackError::Denied(error.clone()));
    }
    if params.get("state") != Some(&session.state) {
        return Err(CallbackError::StateMismatch);
    }
    params.get("code").cloned().ok_or(CallbackError::MissingCode)
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeCodeForTokenError {
    #[error("Invalid code: {reason}")]
    InvalidCode { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response")]
    FailedToParseResponse(reqwest::Error),
}

/// Exchange authorization code for access token
/// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
pub async fn exchange_code_for_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    code: &str,
    // Must be the exact redirect URI used to initiate the flow
    redirect_uri: &str,
) -> Result<SpotifyTokenResponse, ExchangeCodeForTokenError> {
    let mut params = HashMap::new();
    params.insert("grant_type", "authorization_code");
    params.insert("code", code);
    params.insert("redirect_uri", redirect_uri);

    let response = client
        .post(SPOTIFY_TOKEN_URL)
        // x-www-form-urlencoded, as required by spotify
        .form(&params)
        .header("Authorization", basic_auth_header(client_id, client_secret))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ExchangeCodeForTokenError::InvalidCode {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToParseResponse)
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("Invalid refresh token: {reason}")]
    InvalidRefreshToken { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Refresh an access token using a refresh token
pub async fn refresh_access_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<SpotifyTokenResponse, RefreshTokenError> {
    let mut params = HashMap::new();
    params.insert("grant_type", "refresh_token");
    params.insert("refresh_token", refresh_token);

    let response = client
        .post(SPOTIFY_TOKEN_URL)
        .form(&params)
        .header("Authorization", basic_auth_header(client_id, client_secret))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(RefreshTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(RefreshTokenError::InvalidRefreshToken {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(RefreshTokenError::FailedToParseResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(state: &str) -> OAuthSession {
        OAuthSession {
            state: state.to_string(),
        }
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state();
        assert_eq!(state.len(), 16);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()
            || c == '-'
            || c == '.'
            || c == '_'
            || c == '~'));
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("id:secret")
        assert_eq!(basic_auth_header("id", "secret"), "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn test_initiate_oauth() {
        let client_id = "test_client_id";
        let redirect_uri = "http://localhost:8888/callback";
        let (response, session) = initiate_oauth(client_id, redirect_uri);

        assert!(response.auth_url.starts_with(SPOTIFY_AUTH_URL));
        assert!(response.auth_url.contains(client_id));
        assert!(response.auth_url.contains("response_type=code"));
        assert!(
            response
                .auth_url
                .contains("scope=playlist-modify-public%20playlist-modify-private")
        );
        assert!(
            response
                .auth_url
                .contains("redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback")
        );
        assert!(
            response
                .auth_url
                .contains(&format!("state={}", session.state))
        );
    }

    #[test]
    fn test_parse_callback_url() {
        let code = parse_callback_url(
            "http://localhost:8888/callback?code=AQD123&state=abc",
            &session("abc"),
        )
        .unwrap();
        assert_eq!(code, "AQD123");
    }

    #[test]
    fn test_parse_callback_url_rejects_wrong_state() {
        let err = parse_callback_url(
            "http://localhost:8888/callback?code=AQD123&state=evil",
            &session("abc"),
        )
        .unwrap_err();
        assert!(matches!(err, CallbackError::StateMismatch));
    }

    #[test]
    fn test_parse_callback_url_denied() {
        let err = parse_callback_url(
            "http://localhost:8888/callback?error=access_denied&state=abc",
            &session("abc"),
        )
        .unwrap_err();
        assert!(matches!(err, CallbackError::Denied(reason) if reason == "access_denied"));
    }

    #[test]
    fn test_parse_callback_url_missing_code() {
        let err = parse_callback_url("http://localhost:8888/callback?state=abc", &session("abc"))
            .unwrap_err();
        assert!(matches!(err, CallbackError::MissingCode));
    }

    #[test]
    fn test_parse_callback_url_garbage() {
        assert!(matches!(
            parse_callback_url("not a url", &session("abc")),
            Err(CallbackError::InvalidUrl(_))
        ));
    }
}
