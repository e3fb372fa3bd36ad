use crate::play_log::PlayRecord;
use crate::ports::spotify::SpotifyClient;

/// Only the best ranked candidate is ever used.
const SEARCH_LIMIT: u32 = 1;

/// A play record and the catalog track it resolved to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub record: PlayRecord,
    pub track_id: Option<String>,
}

/// Maps play records to catalog track ids, one best-effort search per record.
pub struct TrackResolver<'a, C: SpotifyClient> {
    client: &'a C,
}

impl<'a, C: SpotifyClient> TrackResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Output has one entry per record, in input order. Records without a
    /// match carry no id; they never stop the rest of the batch.
    pub async fn resolve(&self, records: &[PlayRecord]) -> Vec<ResolvedTrack> {
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            let track_id = self.resolve_one(record).await;
            resolved.push(ResolvedTrack {
                record: record.clone(),
                track_id,
            });
        }

        let matched = resolved.iter().filter(|r| r.track_id.is_some()).count();
        log::info!("Resolved {} of {} played tracks", matched, records.len());
        resolved
    }

    async fn resolve_one(&self, record: &PlayRecord) -> Option<String> {
        let query = search_query(record)?;

        match self.client.search_tracks(&query, SEARCH_LIMIT).await {
            Ok(candidates) => match candidates.into_iter().next() {
                Some(track) => {
                    log::info!(
                        "Found track id {} ({} by {}) for {}",
                        track.id,
                        track.name,
                        track.artists.join(", "),
                        record
                    );
                    Some(track.id)
                }
                None => {
                    log::warn!("No track found for {}", record);
                    None
                }
            },
            Err(e) => {
                log::warn!("Search failed for {}: {:#}", record, e);
                None
            }
        }
    }
}

/// Free text query of artist and title. `None` when both are blank.
fn search_query(record: &PlayRecord) -> Option<String> {
    let query = format!("{} {}", record.artist.trim(), record.title.trim());
    let query = query.trim();
    if query.is_empty() {
        None
    } else {
        Some(query.to_string())
    }
}

/// Ids of the matched tracks, in play order.
pub fn matched_track_ids(resolved: &[ResolvedTrack]) -> Vec<String> {
    resolved.iter().filter_map(|r| r.track_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::MockSpotifyClient;
    use crate::test_utils::catalog_track;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_no_search_result_yields_no_id() {
        let mut client = MockSpotifyClient::new();
        client
            .expect_search_tracks()
            .with(eq("Artist A Song B"), eq(1u32))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let resolver = TrackResolver::new(&client);
        let resolved = resolver
            .resolve(&[PlayRecord::new("Artist A", "Song B")])
            .await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].record, PlayRecord::new("Artist A", "Song B"));
        assert_eq!(resolved[0].track_id, None);
    }

    #[tokio::test]
    async fn test_partial_matches_keep_order() {
        let mut client = MockSpotifyClient::new();
        client
            .expect_search_tracks()
            .times(4)
            .returning(|query, _| match query {
                "A One" => Ok(vec![catalog_track("id-1")]),
                "B Two" => Ok(vec![]),
                "C Three" => Ok(vec![catalog_track("id-3"), catalog_track("ignored")]),
                _ => Err(color_eyre::eyre::eyre!("503 Service Unavailable")),
            });

        let records = vec![
            PlayRecord::new("A", "One"),
            PlayRecord::new("B", "Two"),
            PlayRecord::new("C", "Three"),
            PlayRecord::new("D", "Four"),
        ];
        let resolver = TrackResolver::new(&client);
        let resolved = resolver.resolve(&records).await;

        assert_eq!(resolved.len(), 4);
        let ids: Vec<Option<&str>> = resolved.iter().map(|r| r.track_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("id-1"), None, Some("id-3"), None]);
        for (entry, record) in resolved.iter().zip(&records) {
            assert_eq!(&entry.record, record);
        }
        assert_eq!(matched_track_ids(&resolved), vec!["id-1", "id-3"]);
    }

    #[tokio::test]
    async fn test_blank_record_skips_search() {
        // No expectations: any search call would panic
        let client = MockSpotifyClient::new();
        let resolver = TrackResolver::new(&client);

        let resolved = resolver.resolve(&[PlayRecord::new("  ", "")]).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].track_id, None);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = MockSpotifyClient::new();
        let resolver = TrackResolver::new(&client);
        assert!(resolver.resolve(&[]).await.is_empty());
    }

    #[test]
    fn test_search_query_trims_parts() {
        assert_eq!(
            search_query(&PlayRecord::new(" Air ", " Sexy Boy")),
            Some("Air Sexy Boy".to_string())
        );
        assert_eq!(
            search_query(&PlayRecord::new("", "Intro")),
            Some("Intro".to_string())
        );
    }
}
