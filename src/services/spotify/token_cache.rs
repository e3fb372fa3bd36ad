use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

use crate::spotify_rs::types::SpotifyTokenResponse;

/// Tokens are refreshed this many seconds before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

impl StoredToken {
    /// Build from a token endpoint response. Refresh responses may omit the
    /// refresh token, in which case `previous_refresh_token` is kept.
    pub fn from_response(
        response: SpotifyTokenResponse,
        previous_refresh_token: Option<&str>,
        now: i64,
    ) -> Result<Self> {
        let refresh_token = response
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string))
            .ok_or(color_eyre::eyre::eyre!("Spotify did not return a refresh token"))?;
        Ok(Self {
            access_token: response.access_token,
            refresh_token,
            expires_at: now + response.expires_in as i64,
        })
    }

    pub fn needs_refresh(&self, now: i64) -> bool {
        now + REFRESH_MARGIN_SECS >= self.expires_at
    }
}

/// JSON file holding the last token, so the interactive login happens once.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .wrap_err(format!("Failed to read token cache {}", self.path.display()))?;
        let token = serde_json::from_str(&contents)
            .wrap_err(format!("Failed to parse token cache {}", self.path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, contents)
            .wrap_err(format!("Failed to write token cache {}", self.path.display()))?;
        Ok(())
    }
}
