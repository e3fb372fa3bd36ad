use color_eyre::eyre::Result;
use tokio::time::{MissedTickBehavior, interval};

use crate::change_watcher::ChangeWatcher;
use crate::config::Config;
use crate::logging::LogRetention;
use crate::play_log::read_play_log;
use crate::ports::spotify::SpotifyClient;
use crate::services::playlist_retention::{PlaylistRetentionManager, ReconcileReport};
use crate::services::track_resolver::{TrackResolver, matched_track_ids};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub records: usize,
    pub matched: usize,
    pub reconcile: ReconcileReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The play log could not be read; nothing was sent to Spotify.
    Skipped,
    Completed(CycleReport),
}

/// Drives read log -> resolve -> reconcile each time the play log changes.
///
/// Only `Idle -> Processing` on a modification edge, and back to `Idle` once
/// the cycle finished, whatever its outcome. Cycles take `&mut self`, so they
/// cannot overlap.
pub struct Orchestrator<'a, C: SpotifyClient> {
    config: &'a Config,
    client: &'a C,
    watcher: ChangeWatcher,
    state: CycleState,
    log_retention: Option<LogRetention>,
}

impl<'a, C: SpotifyClient> Orchestrator<'a, C> {
    pub fn new(config: &'a Config, client: &'a C) -> Self {
        Self {
            config,
            client,
            watcher: ChangeWatcher::new(config.play_log_path()),
            state: CycleState::Idle,
            log_retention: None,
        }
    }

    /// Prune expired log files while idling.
    pub fn with_log_retention(mut self, log_retention: LogRetention) -> Self {
        self.log_retention = Some(log_retention);
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Poll once; runs a cycle when the play log changed since the last poll.
    pub async fn tick(&mut self) -> Option<CycleOutcome> {
        self.watcher.poll()?;
        log::info!("{} has been changed", self.watcher.path().display());
        Some(self.run_cycle().await)
    }

    /// Run one cycle now, regardless of the play log's modification time.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state = CycleState::Processing;
        let outcome = self.execute_cycle().await;
        if outcome == CycleOutcome::Skipped {
            // retry on the next poll
            self.watcher.rearm();
        }
        self.state = CycleState::Idle;
        outcome
    }

    async fn execute_cycle(&self) -> CycleOutcome {
        let records = match read_play_log(self.watcher.path()) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("{}", e);
                return CycleOutcome::Skipped;
            }
        };

        let resolved = TrackResolver::new(self.client).resolve(&records).await;
        let new_tracks = matched_track_ids(&resolved);

        let reconcile = PlaylistRetentionManager::new(self.client, self.config.retention_limit())
            .reconcile(self.config.playlist_id(), &new_tracks)
            .await;

        if reconcile.failed_steps.is_empty() {
            log::info!("Playlist update successful");
        }

        CycleOutcome::Completed(CycleReport {
            records: records.len(),
            matched: new_tracks.len(),
            reconcile,
        })
    }

    /// Poll forever at the configured interval.
    pub async fn run(&mut self) -> Result<()> {
        log::info!(
            "Watching {} every {:?}",
            self.watcher.path().display(),
            self.config.poll_interval()
        );
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Some(log_retention) = self.log_retention.as_mut() {
                log_retention.prune_if_due();
            }
            if let Some(CycleOutcome::Completed(report)) = self.tick().await {
                log::debug!("Cycle finished: {:?}", report);
            }
        }
    }
}
