use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use color_eyre::Result;
use color_eyre::eyre::Context;
use fern::colors::{Color, ColoredLevelConfig};

/// Rotated log files older than this many days are deleted.
pub const LOG_RETENTION_DAYS: i64 = 7;

const ROTATION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Naming of the daily rotated log files: `<dir>/<stem>.<date>.<ext>`.
#[derive(Debug, Clone)]
pub struct LogFileLayout {
    dir: PathBuf,
    stem: String,
    extension: String,
}

impl LogFileLayout {
    pub fn new(log_file: &Path) -> Self {
        let dir = log_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = log_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "runtime".to_string());
        let extension = log_file
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        Self {
            dir,
            stem,
            extension,
        }
    }

    fn prefix(&self) -> PathBuf {
        self.dir.join(format!("{}.", self.stem))
    }

    fn suffix(&self) -> String {
        format!("{}.{}", ROTATION_DATE_FORMAT, self.extension)
    }

    /// Date encoded in a rotated file name, if the name belongs to this layout.
    fn rotation_date(&self, file_name: &str) -> Option<NaiveDate> {
        let date = file_name
            .strip_prefix(&format!("{}.", self.stem))?
            .strip_suffix(&format!(".{}", self.extension))?;
        NaiveDate::parse_from_str(date, ROTATION_DATE_FORMAT).ok()
    }

    /// Delete rotated files older than `keep_days` relative to `today`.
    /// Returns the number of files removed.
    pub fn prune(&self, today: NaiveDate, keep_days: i64) -> Result<usize> {
        let cutoff = today - chrono::Duration::days(keep_days);
        let mut removed = 0;
        let entries = std::fs::read_dir(&self.dir)
            .wrap_err(format!("Failed to list log directory {}", self.dir.display()))?;
        for entry in entries.filter_map(std::result::Result::ok) {
            let file_name = entry.file_name();
            let Some(date) = self.rotation_date(&file_name.to_string_lossy()) else {
                continue;
            };
            if date < cutoff {
                std::fs::remove_file(entry.path())
                    .wrap_err(format!("Failed to remove {}", entry.path().display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Runs [`LogFileLayout::prune`] at most once per calendar day.
#[derive(Debug)]
pub struct LogRetention {
    layout: LogFileLayout,
    last_pruned: Option<NaiveDate>,
}

impl LogRetention {
    pub fn new(layout: LogFileLayout) -> Self {
        Self {
            layout,
            last_pruned: None,
        }
    }

    pub fn prune_if_due(&mut self) {
        let today = Local::now().date_naive();
        if self.last_pruned == Some(today) {
            return;
        }
        self.last_pruned = Some(today);
        match self.layout.prune(today, LOG_RETENTION_DAYS) {
            Ok(0) => {}
            Ok(removed) => log::debug!("Removed {} expired log files", removed),
            Err(e) => log::warn!("Failed to prune old log files: {:#}", e),
        }
    }
}

/// Console output plus a daily rotating log file.
pub fn setup_logging(
    console_level: log::LevelFilter,
    log_file: Option<PathBuf>,
    file_level: log::LevelFilter,
) -> Result<LogRetention> {
    let log_file = log_file.unwrap_or_else(|| PathBuf::from("runtime.log"));
    let layout = LogFileLayout::new(&log_file);
    std::fs::create_dir_all(&layout.dir)
        .wrap_err(format!("Failed to create log directory {}", layout.dir.display()))?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {} {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .level(file_level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(fern::DateBased::new(layout.prefix(), layout.suffix()).local_time());

    fern::Dispatch::new()
        .level(console_level.max(file_level))
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .chain(console)
        .chain(file)
        .apply()
        .wrap_err("Failed to install logger")?;

    let mut retention = LogRetention::new(layout);
    retention.prune_if_due();
    Ok(retention)
}
