// Yahoo OAuth2 refresh-token grant and an authenticated smoke test.

use serde::Deserialize;
use tracing::info;

use dugout_core::config::CredentialsConfig;

use crate::error::FetchError;

const TOKEN_URL: &str = "https://api.login.yahoo.com/oauth2/get_token";
const GAMES_URL: &str =
    "https://fantasysports.yahooapis.com/fantasy/v2/users;use_login=1/games;game_codes=mlb?format=json";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Exchange the stored refresh token for a fresh access token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    credentials: &CredentialsConfig,
) -> Result<TokenResponse, FetchError> {
    if !credentials.has_yahoo_oauth() {
        return Err(FetchError::MissingCredentials);
    }
    let (Some(id), Some(secret), Some(refresh)) = (
        credentials.yahoo_client_id.as_deref(),
        credentials.yahoo_client_secret.as_deref(),
        credentials.yahoo_refresh_token.as_deref(),
    ) else {
        return Err(FetchError::MissingCredentials);
    };

    let resp = http
        .post(TOKEN_URL)
        .basic_auth(id, Some(secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("redirect_uri", "oob"),
            ("refresh_token", refresh),
        ])
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: TOKEN_URL.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Auth(format!("HTTP {status}: {body}")));
    }

    let token: TokenResponse = resp.json().await.map_err(|source| FetchError::Http {
        url: TOKEN_URL.to_string(),
        source,
    })?;
    info!(
        "refreshed Yahoo access token (expires in {}s)",
        token.expires_in.unwrap_or_default()
    );
    Ok(token)
}

/// Refresh a token and call the fantasy API with it. Returns the raw JSON
/// body of the user's MLB games.
pub async fn check_auth(
    http: &reqwest::Client,
    credentials: &CredentialsConfig,
) -> Result<serde_json::Value, FetchError> {
    let token = refresh_access_token(http, credentials).await?;
    let resp = http
        .get(GAMES_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: GAMES_URL.to_string(),
            source,
        })?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            url: GAMES_URL.to_string(),
            status: resp.status().as_u16(),
        });
    }
    resp.json().await.map_err(|source| FetchError::Http {
        url: GAMES_URL.to_string(),
        source,
    })
}
