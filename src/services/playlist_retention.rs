use std::collections::HashSet;

use color_eyre::eyre::{Result, WrapErr, bail};

use crate::ports::spotify::SpotifyClient;

/// Spotify refuses inserts of more than this many tracks in one request.
const MAX_TRACKS_PER_INSERT: usize = 100;

/// A playlist entry at a given index of the full listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// `None` for items without a catalog id (local files, unavailable tracks)
    pub track_id: Option<String>,
    pub position: usize,
}

/// An entry scheduled for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionCandidate<'s> {
    pub track_id: &'s str,
    pub position: usize,
}

/// The whole remote playlist at one point in time, every page included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl PlaylistSnapshot {
    pub fn from_track_ids<I>(track_ids: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let entries = track_ids
            .into_iter()
            .enumerate()
            .map(|(position, track_id)| SnapshotEntry { track_id, position })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Index of the first retained entry, `None` while the playlist still fits.
    fn window_start(&self, retention_limit: usize) -> Option<usize> {
        self.len()
            .checked_sub(retention_limit)
            .filter(|&start| start > 0)
    }

    /// Ids occupying the last `retention_limit` positions.
    pub fn keep_set(&self, retention_limit: usize) -> HashSet<&str> {
        let start = self.len().saturating_sub(retention_limit);
        self.entries[start..]
            .iter()
            .filter_map(|entry| entry.track_id.as_deref())
            .collect()
    }

    /// Entries to remove, in the order the removals are issued: from just
    /// before the retained window back to the head. Membership in the keep set
    /// is by id, so an id that also appears inside the window is never evicted,
    /// and each id is listed once since removal drops every occurrence.
    pub fn eviction_candidates(&self, retention_limit: usize) -> Vec<EvictionCandidate<'_>> {
        let Some(window_start) = self.window_start(retention_limit) else {
            return Vec::new();
        };
        let keep = self.keep_set(retention_limit);
        let mut scheduled = HashSet::new();

        self.entries[..window_start]
            .iter()
            .rev()
            .filter_map(|entry| {
                entry.track_id.as_deref().map(|track_id| EvictionCandidate {
                    track_id,
                    position: entry.position,
                })
            })
            .filter(|candidate| {
                !keep.contains(candidate.track_id) && scheduled.insert(candidate.track_id)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub snapshot_len: usize,
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    Trim,
    Prepend,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `None` when the playlist could not be listed
    pub eviction: Option<EvictionReport>,
    pub inserted: usize,
    pub failed_steps: Vec<ReconcileStep>,
}

/// Keeps a playlist within its retention window and prepends new tracks.
///
/// Trimming and prepending are separate remote operations with no atomicity
/// between them; a failure in one never blocks the other and nothing already
/// applied is rolled back.
pub struct PlaylistRetentionManager<'a, C: SpotifyClient> {
    client: &'a C,
    retention_limit: usize,
}

impl<'a, C: SpotifyClient> PlaylistRetentionManager<'a, C> {
    pub fn new(client: &'a C, retention_limit: usize) -> Self {
        Self {
            client,
            retention_limit,
        }
    }

    /// Follow the pagination cursor until the listing is exhausted.
    pub async fn fetch_snapshot(&self, playlist_id: &str) -> Result<PlaylistSnapshot> {
        let mut track_ids = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self
                .client
                .playlist_tracks_page(playlist_id, cursor.clone())
                .await
                .wrap_err(format!("Failed to list page {} of playlist", pages + 1))?;
            pages += 1;
            track_ids.extend(page.track_ids);

            match page.next {
                Some(next) if cursor.as_ref() == Some(&next) => {
                    bail!("Playlist listing returned the same cursor twice: {}", next)
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let snapshot = PlaylistSnapshot::from_track_ids(track_ids);
        log::info!(
            "{} tracks are in the playlist ({} pages)",
            snapshot.len(),
            pages
        );
        Ok(snapshot)
    }

    /// Fetch the playlist and remove everything outside the retention window.
    /// Individual removal failures are logged and reported, the walk goes on.
    pub async fn trim(&self, playlist_id: &str) -> Result<EvictionReport> {
        let snapshot = self.fetch_snapshot(playlist_id).await?;
        let mut report = EvictionReport {
            snapshot_len: snapshot.len(),
            ..Default::default()
        };

        if snapshot.len() <= self.retention_limit {
            log::debug!(
                "Playlist holds {} of {} tracks, nothing to remove",
                snapshot.len(),
                self.retention_limit
            );
            return Ok(report);
        }

        for candidate in snapshot.eviction_candidates(self.retention_limit) {
            log::info!(
                "Removing track id {} (position {}) from playlist",
                candidate.track_id,
                candidate.position
            );
            let track_id = candidate.track_id.to_string();
            match self
                .client
                .remove_all_occurrences(playlist_id, &track_id)
                .await
            {
                Ok(()) => report.removed.push(track_id),
                Err(e) => {
                    log::warn!("Failed to remove track id {}: {:#}", track_id, e);
                    report.failed.push(track_id);
                }
            }
        }

        log::info!(
            "Removed {} tracks ({} failed)",
            report.removed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Insert `track_ids` at the head of the playlist, keeping their order.
    /// Returns the number of tracks inserted; an empty list makes no call.
    pub async fn prepend(&self, playlist_id: &str, track_ids: &[String]) -> Result<usize> {
        let mut inserted = 0;
        for chunk in track_ids.chunks(MAX_TRACKS_PER_INSERT) {
            self.client
                .insert_tracks(playlist_id, chunk, inserted as u32)
                .await
                .wrap_err(format!("Failed to insert tracks at position {}", inserted))?;
            inserted += chunk.len();
        }
        if inserted > 0 {
            log::info!("Added {} tracks to the head of the playlist", inserted);
        }
        Ok(inserted)
    }

    /// Trim, then prepend `new_tracks`. Both steps are always attempted.
    pub async fn reconcile(&self, playlist_id: &str, new_tracks: &[String]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        match self.trim(playlist_id).await {
            Ok(eviction) => report.eviction = Some(eviction),
            Err(e) => {
                log::warn!("Trimming playlist failed: {:#}", e);
                report.failed_steps.push(ReconcileStep::Trim);
            }
        }

        match self.prepend(playlist_id, new_tracks).await {
            Ok(inserted) => report.inserted = inserted,
            Err(e) => {
                log::warn!("Adding tracks to playlist failed: {:#}", e);
                report.failed_steps.push(ReconcileStep::Prepend);
            }
        }

        report
    }
}
