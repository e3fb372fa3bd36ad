use color_eyre::eyre::Result;

/// Decoupled representation of a catalog search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

/// One page of a playlist listing.
///
/// Items without a catalog id (local files, unavailable tracks) are `None`
/// but still occupy a position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    pub track_ids: Vec<Option<String>>,
    /// Opaque cursor for the next page, `None` when the listing is exhausted.
    pub next: Option<String>,
}

/// Port trait wrapping the Spotify API capabilities used by business logic.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyClient: Send + Sync {
    /// Ranked track candidates for a free text query.
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>>;

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<PlaylistPage>;

    /// Removes every occurrence of `track_id`, wherever it sits in the playlist.
    async fn remove_all_occurrences(&self, playlist_id: &str, track_id: &str) -> Result<()>;

    async fn insert_tracks(
        &self,
        playlist_id: &str,
        track_ids: &[String],
        position: u32,
    ) -> Result<()>;
}
