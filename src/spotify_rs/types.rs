use serde::{Deserialize, Serialize};

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Spotify track from API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

/// `GET /v1/search` response, only the track results are requested
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    pub tracks: SpotifyPage<SpotifyTrack>,
}

/// Generic paging object; `next` is the URL of the following page
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Entry of a playlist. `track` is null for removed content and
/// its `id` is null for local files.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    pub track: Option<SpotifyPlaylistItemTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItemTrack {
    pub id: Option<String>,
}

impl SpotifyPlaylistItem {
    pub fn track_id(self) -> Option<String> {
        self.track.and_then(|track| track.id)
    }
}

/// Body of `DELETE /v1/playlists/{id}/tracks`
#[derive(Debug, Clone, Serialize)]
pub struct RemoveTracksRequest {
    pub tracks: Vec<TrackUri>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackUri {
    pub uri: String,
}

/// Body of `POST /v1/playlists/{id}/tracks`
#[derive(Debug, Clone, Serialize)]
pub struct AddTracksRequest {
    pub uris: Vec<String>,
    pub position: u32,
}

/// Response of playlist mutations
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
}

/// Pending authorization code session
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub state: String,
}

/// Response for authentication initiation
#[derive(Debug, Clone)]
pub struct SpotifyAuthResponse {
    pub auth_url: String,
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_page_with_local_and_missing_tracks() {
        let json = r#"{
            "items": [
                {"track": {"id": "4uLU6hMCjMI75M1A2tKUQC"}},
                {"track": {"id": null}},
                {"track": null}
            ],
            "next": "https://api.spotify.com/v1/playlists/pl/tracks?offset=100&limit=100"
        }"#;
        let page: SpotifyPage<SpotifyPlaylistItem> = serde_json::from_str(json).unwrap();
        assert!(page.next.is_some());
        let ids: Vec<Option<String>> = page
            .items
            .into_iter()
            .map(SpotifyPlaylistItem::track_id)
            .collect();
        assert_eq!(
            ids,
            vec![Some("4uLU6hMCjMI75M1A2tKUQC".to_string()), None, None]
        );
    }

    #[test]
    fn test_search_response_empty() {
        let json = r#"{"tracks": {"items": [], "next": null, "total": 0}}"#;
        let response: SpotifySearchResponse = serde_json::from_str(json).unwrap();
        assert!(response.tracks.items.is_empty());
    }

    #[test]
    fn test_mutation_bodies() {
        let remove = RemoveTracksRequest {
            tracks: vec![TrackUri {
                uri: track_uri("abc"),
            }],
        };
        assert_eq!(
            serde_json::to_string(&remove).unwrap(),
            r#"{"tracks":[{"uri":"spotify:track:abc"}]}"#
        );

        let add = AddTracksRequest {
            uris: vec![track_uri("a"), track_uri("b")],
            position: 0,
        };
        assert_eq!(
            serde_json::to_string(&add).unwrap(),
            r#"{"uris":["spotify:track:a","spotify:track:b"],"position":0}"#
        );
    }
}
