use color_eyre::eyre::{Result, WrapErr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::config::SpotifyConfig;
use crate::ports::spotify::{CatalogTrack, PlaylistPage, SpotifyClient};
use crate::services::spotify::token_cache::{StoredToken, TokenCache};
use crate::spotify_rs::auth::{
    exchange_code_for_token, initiate_oauth, parse_callback_url, refresh_access_token,
};
use crate::spotify_rs::client::SpotifyClient as SpotifyApi;
use crate::spotify_rs::types::{SpotifyPlaylistItem, SpotifyUser};

#[derive(Debug, Clone)]
pub struct SpotifyApiCredentials {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyApiCredentials {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn from_config(config: &SpotifyConfig) -> Self {
        Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.redirect_uri.clone(),
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

/// Production [`SpotifyClient`]: owns the OAuth token, refreshes it before
/// expiry and persists it to the token cache.
pub struct SpotifyHttpAdapter {
    http: reqwest::Client,
    credentials: SpotifyApiCredentials,
    cache: TokenCache,
    token: Mutex<StoredToken>,
}

impl SpotifyHttpAdapter {
    /// Reuse the cached token, or run the interactive login when there is none.
    pub async fn connect(credentials: SpotifyApiCredentials, cache: TokenCache) -> Result<Self> {
        let http = reqwest::Client::new();
        let token = match cache.load()? {
            Some(token) => {
                log::debug!("Using cached Spotify token from {}", cache.path().display());
                token
            }
            None => {
                log::info!("No cached Spotify token, starting authorization");
                authorize_interactive(&http, &credentials, &cache).await?
            }
        };
        Ok(Self {
            http,
            credentials,
            cache,
            token: Mutex::new(token),
        })
    }

    /// Always run the interactive login and overwrite the cached token.
    pub async fn authorize(credentials: SpotifyApiCredentials, cache: TokenCache) -> Result<Self> {
        let http = reqwest::Client::new();
        let token = authorize_interactive(&http, &credentials, &cache).await?;
        Ok(Self {
            http,
            credentials,
            cache,
            token: Mutex::new(token),
        })
    }

    /// API client carrying a valid access token
    async fn api(&self) -> Result<SpotifyApi> {
        let mut token = self.token.lock().await;
        let now = chrono::Utc::now().timestamp();
        if token.needs_refresh(now) {
            log::debug!("Refreshing Spotify access token");
            let response = refresh_access_token(
                &self.http,
                self.credentials.client_id(),
                self.credentials.client_secret(),
                &token.refresh_token,
            )
            .await
            .wrap_err("Failed to refresh Spotify access token")?;
            let refreshed = StoredToken::from_response(response, Some(&token.refresh_token), now)?;
            if let Err(e) = self.cache.save(&refreshed) {
                log::warn!("Failed to persist refreshed token: {:#}", e);
            }
            *token = refreshed;
        }
        Ok(SpotifyApi::new(self.http.clone(), token.access_token.clone()))
    }

    pub async fn current_user(&self) -> Result<SpotifyUser> {
        self.api().await?.get_current_user().await
    }
}

async fn authorize_interactive(
    http: &reqwest::Client,
    credentials: &SpotifyApiCredentials,
    cache: &TokenCache,
) -> Result<StoredToken> {
    let (auth, session) = initiate_oauth(credentials.client_id(), &credentials.redirect_uri);

    println!("Open this URL in a browser and authorize access:");
    println!();
    println!("  {}", auth.auth_url);
    println!();
    println!("Then paste the URL you were redirected to:");

    let mut callback = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut callback)
        .await
        .wrap_err("Failed to read the redirect URL")?;

    let code = parse_callback_url(&callback, &session)?;
    let response = exchange_code_for_token(
        http,
        credentials.client_id(),
        credentials.client_secret(),
        &code,
        &credentials.redirect_uri,
    )
    .await?;
    let token = StoredToken::from_response(response, None, chrono::Utc::now().timestamp())?;
    cache.save(&token)?;
    log::info!("Spotify token cached at {}", cache.path().display());
    Ok(token)
}

#[async_trait::async_trait]
impl SpotifyClient for SpotifyHttpAdapter {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        let tracks = self.api().await?.search_tracks(query, limit).await?;
        Ok(tracks
            .into_iter()
            .map(|track| CatalogTrack {
                id: track.id,
                name: track.name,
                artists: track.artists.into_iter().map(|a| a.name).collect(),
            })
            .collect())
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<PlaylistPage> {
        let page = self
            .api()
            .await?
            .get_playlist_tracks_page(playlist_id, cursor.as_deref())
            .await?;
        Ok(PlaylistPage {
            track_ids: page
                .items
                .into_iter()
                .map(SpotifyPlaylistItem::track_id)
                .collect(),
            next: page.next,
        })
    }

    async fn remove_all_occurrences(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let snapshot_id = self
            .api()
            .await?
            .remove_all_occurrences(playlist_id, track_id)
            .await?;
        log::debug!("Playlist snapshot after removal: {}", snapshot_id);
        Ok(())
    }

    async fn insert_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
        position: u32,
    ) -> Result<()> {
        let snapshot_id = self
            .api()
            .await?
            .add_tracks(playlist_id, track_ids, position)
            .await?;
        log::debug!("Playlist snapshot after insert: {}", snapshot_id);
        Ok(())
    }
}
