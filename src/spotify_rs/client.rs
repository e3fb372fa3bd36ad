use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;

use crate::spotify_rs::types::{
    AddTracksRequest, RemoveTracksRequest, SnapshotResponse, SpotifyPage, SpotifyPlaylistItem,
    SpotifySearchResponse, SpotifyTrack, SpotifyUser, TrackUri, track_uri,
};

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Spotify accepts at most this many items per playlist page and per insert.
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

fn playlist_tracks_url(playlist_id: &str) -> String {
    format!(
        "{}/playlists/{}/tracks?limit={}&fields=items(track(id)),next",
        SPOTIFY_API_URL,
        urlencoding::encode(playlist_id),
        MAX_ITEMS_PER_REQUEST
    )
}

fn playlist_items_url(playlist_id: &str) -> String {
    format!(
        "{}/playlists/{}/tracks",
        SPOTIFY_API_URL,
        urlencoding::encode(playlist_id)
    )
}

/// Spotify API client
pub struct SpotifyClient {
    access_token: String,
    client: reqwest::Client,
}

impl SpotifyClient {
    /// `client` is shared between calls, the token may change between them.
    pub fn new(client: reqwest::Client, access_token: String) -> Self {
        Self {
            access_token,
            client,
        }
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser> {
        let response = self
            .client
            .get(format!("{}/me", SPOTIFY_API_URL))
            .bearer_auth(&self.access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;

        let user: SpotifyUser = response.json().await?;
        Ok(user)
    }

    /// Search the catalog for tracks matching a free text query
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyTrack>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/search", SPOTIFY_API_URL))
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .bearer_auth(&self.access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;

        let results: SpotifySearchResponse = response
            .json()
            .await
            .wrap_err("Failed to deserialize search response")?;
        Ok(results.tracks.items)
    }

    /// Get one page of playlist items. `next_url` is the cursor from the previous page,
    /// `None` starts at the head of the playlist.
    pub async fn get_playlist_tracks_page(
        &self,
        playlist_id: &str,
        next_url: Option<&str>,
    ) -> Result<SpotifyPage<SpotifyPlaylistItem>> {
        let url = match next_url {
            Some(url) => url.to_string(),
            None => playlist_tracks_url(playlist_id),
        };

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;

        response
            .json()
            .await
            .wrap_err("Failed to deserialize playlist items response")
    }

    /// Remove every occurrence of a track from a playlist
    pub async fn remove_all_occurrences(&self, playlist_id: &str, track_id: &str) -> Result<String> {
        let body = RemoveTracksRequest {
            tracks: vec![TrackUri {
                uri: track_uri(track_id),
            }],
        };

        let response = self
            .client
            .delete(playlist_items_url(playlist_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()
            .wrap_err(format!("Failed to remove track {} from playlist", track_id))?;

        let snapshot: SnapshotResponse = response.json().await?;
        Ok(snapshot.snapshot_id)
    }

    /// Insert tracks at `position`, keeping their order. At most
    /// [`MAX_ITEMS_PER_REQUEST`] tracks per call.
    pub async fn add_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
        position: u32,
    ) -> Result<String> {
        let body = AddTracksRequest {
            uris: track_ids.iter().map(|id| track_uri(id)).collect(),
            position,
        };

        let response = self
            .client
            .post(playlist_items_url(playlist_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()
            .wrap_err("Failed to add tracks to playlist")?;

        let snapshot: SnapshotResponse = response.json().await?;
        Ok(snapshot.snapshot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_tracks_url() {
        assert_eq!(
            playlist_tracks_url("37i9dQZF1DX"),
            "https://api.spotify.com/v1/playlists/37i9dQZF1DX/tracks?limit=100&fields=items(track(id)),next"
        );
    }

    #[test]
    fn test_playlist_items_url_is_encoded() {
        assert_eq!(
            playlist_items_url("a/b"),
            "https://api.spotify.com/v1/playlists/a%2Fb/tracks"
        );
    }
}
