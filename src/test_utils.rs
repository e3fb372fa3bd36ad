use crate::config::Config;
use crate::ports::spotify::{CatalogTrack, MockSpotifyClient, PlaylistPage};

/// `t0`, `t1`, ... as playlist track ids
pub fn numbered_ids(count: usize) -> Vec<Option<String>> {
    (0..count).map(|i| Some(format!("t{}", i))).collect()
}

/// Split ids into pages linked by `cursor-<n>` cursors.
pub fn paged(track_ids: Vec<Option<String>>, page_size: usize) -> Vec<PlaylistPage> {
    if track_ids.is_empty() {
        return vec![PlaylistPage::default()];
    }
    let chunks: Vec<_> = track_ids.chunks(page_size).map(<[_]>::to_vec).collect();
    let page_count = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, track_ids)| PlaylistPage {
            track_ids,
            next: (index + 1 < page_count).then(|| format!("cursor-{}", index + 1)),
        })
        .collect()
}

/// Serve `pages` from the mock, each exactly once, keyed by cursor.
pub fn expect_playlist_pages(client: &mut MockSpotifyClient, pages: Vec<PlaylistPage>) {
    let count = pages.len();
    client
        .expect_playlist_tracks_page()
        .times(count)
        .returning(move |_, cursor| {
            let index = match cursor {
                None => 0,
                Some(cursor) => cursor
                    .trim_start_matches("cursor-")
                    .parse::<usize>()
                    .unwrap(),
            };
            Ok(pages[index].clone())
        });
}

pub fn catalog_track(id: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: format!("Track {}", id),
        artists: vec!["Artist".to_string()],
    }
}

/// Valid config pointing at `play_log`
pub fn test_config(play_log: &std::path::Path) -> Config {
    Config::from_toml_str(&format!(
        r#"
[spotify]
username = "radio"
client_id = "cid"
client_secret = "secret"
redirect_uri = "http://localhost:8888/callback"
playlist_id = "pl"

[file]
csv = '{}'
"#,
        play_log.display()
    ))
    .unwrap()
}
