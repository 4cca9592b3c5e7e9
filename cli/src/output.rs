//! Status lines printed for engine events.

use engine::progress::{ProgressCallback, TransferEvent};
use engine::RunStats;
use std::path::Path;
use std::time::{Duration, Instant};

/// Widest rendering of a single path in a status line.
const PATH_WIDTH: usize = 260;
/// Widest rendering of each path when a line shows two.
const PAIR_WIDTH: usize = 220;

/// Shorten `text` to about `max` characters by cutting out its middle.
pub fn shorten(text: &str, max: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len < max {
        return text.to_string();
    }

    let mut keep = max;
    if len <= max + 5 {
        // leave room for the separator
        keep = keep.saturating_sub(5);
    }
    keep /= 2;
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[len - keep..].iter().collect();
    format!("{} ... {}", head, tail)
}

fn show(path: &Path, width: usize) -> String {
    shorten(&path.display().to_string(), width)
}

/// Render one event as the line the operator sees.
pub fn render(event: &TransferEvent) -> String {
    match event {
        TransferEvent::MakeDir { path, mode } => {
            format!("mkdir({}, Mode=0{:o})", show(path, PATH_WIDTH), mode)
        }
        TransferEvent::Verify { source, dest } => format!(
            "Verify {} to {}",
            show(source, PAIR_WIDTH),
            show(dest, PAIR_WIDTH)
        ),
        TransferEvent::VerifyDest { dest } => format!("Verify {}", show(dest, PATH_WIDTH)),
        TransferEvent::DeleteStale { dest, diff } => {
            format!("Delete {} ({})", show(dest, PAIR_WIDTH), diff)
        }
        TransferEvent::Copy { source, dest } => format!(
            "Copy {} to {}",
            show(source, PAIR_WIDTH),
            show(dest, PAIR_WIDTH)
        ),
        TransferEvent::DeleteSource { source } => format!("Delete {}", show(source, PATH_WIDTH)),
        TransferEvent::MirrorDelete { dest } => format!("Delete {}", show(dest, PATH_WIDTH)),
        TransferEvent::Paused => "Pause...".to_string(),
        TransferEvent::Resumed => "Resume...".to_string(),
        TransferEvent::PauseRequested => "Pause Requested!".to_string(),
        TransferEvent::FilesPause { files, pause } => {
            format!("{} files done, {} sec. Pause...", files, pause.as_secs())
        }
        TransferEvent::VolumePause { gigabytes, pause } => {
            if pause.is_zero() {
                format!("{} Gb done.", gigabytes)
            } else {
                format!("{} Gb done, {} sec. Pause...", gigabytes, pause.as_secs())
            }
        }
        TransferEvent::Warning { path, message } => {
            format!("WARNING: {} {}", message, show(path, PATH_WIDTH))
        }
    }
}

/// CLI implementation of ProgressCallback: one line on stdout per event.
pub struct CliProgress {
    verbose: bool,
    start_time: Instant,
}

impl CliProgress {
    pub fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            start_time: Instant::now(),
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_run_started(&self, dry_run: bool) {
        if dry_run {
            println!();
            println!("*** TEST RUN ***");
        }
    }

    fn on_event(&self, event: &TransferEvent) {
        println!("{}", render(event));
    }

    fn on_run_completed(&self, stats: &RunStats) {
        if !self.verbose {
            return;
        }
        println!();
        println!(
            "Summary: {} files, {} copied, {} identical",
            stats.files_processed, stats.files_copied, stats.files_identical
        );
        println!(
            "Deleted: {} stale, {} sources, {} mirrored; {} directories created",
            stats.stale_deleted, stats.sources_deleted, stats.mirror_deleted, stats.dirs_created
        );
        println!("Bytes copied: {}", Self::format_bytes(stats.bytes_copied));
        println!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));
    }
}
