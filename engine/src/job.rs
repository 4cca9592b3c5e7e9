//! Job orchestration module.
//!
//! - `create_job` validates the caller's request before anything is touched
//! - `run_job` builds the per-run context and drives the tree walker
//!
//! All run-scoped state (throttle history, traversal guard, pause flags,
//! counters, the transfer buffer) lives in [`RunContext`] and is threaded
//! through the walker and the transfer state machine explicitly, so two runs
//! never share anything.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fs_ops::{self, DirectoryValidator};
use crate::interrupt::{CommandSource, InterruptPoller};
use crate::model::{CopyJob, Mode, RunOptions, RunStats};
use crate::pacing::Pacing;
use crate::progress::{ProgressCallback, TransferEvent};
use crate::throttle::Throttle;
use crate::walker::{self, TraversalGuard};
use std::path::{Path, PathBuf};

/// State of one run, owned by `run_job` and lent to every component.
pub(crate) struct RunContext<'a> {
    pub(crate) config: EngineConfig,
    pub(crate) options: RunOptions,
    pub(crate) mode: Mode,
    pub(crate) throttle: Throttle,
    pub(crate) guard: TraversalGuard,
    pub(crate) poller: InterruptPoller,
    pub(crate) validator: DirectoryValidator,
    pub(crate) pacing: Pacing,
    pub(crate) stats: RunStats,
    pub(crate) buffer: Vec<u8>,
    pub(crate) progress: Option<&'a dyn ProgressCallback>,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(
        config: EngineConfig,
        options: RunOptions,
        mode: Mode,
        commands: Box<dyn CommandSource>,
        progress: Option<&'a dyn ProgressCallback>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(config.buffer_size)
            .map_err(|e| EngineError::Resource(format!("transfer buffer: {}", e)))?;
        buffer.resize(config.buffer_size, 0);

        Ok(RunContext {
            config,
            options,
            mode,
            throttle: Throttle::new(),
            guard: TraversalGuard::default(),
            poller: InterruptPoller::new(commands, config.pause_poll_interval),
            validator: DirectoryValidator::new(options.dry_run),
            pacing: Pacing::new(config.pacing),
            stats: RunStats::default(),
            buffer,
            progress,
        })
    }

    pub(crate) fn emit(&self, event: TransferEvent) {
        if let Some(callback) = self.progress {
            callback.on_event(&event);
        }
    }
}

/// Create a new copy job.
///
/// # Arguments
/// * `mode` - Copy, Move, Mirror (Sync is refused)
/// * `source_dir` / `source_file` - source directory and optional file name in it
/// * `dest_dir` / `dest_file` - destination directory and optional file name in it
///
/// When a source file is given without a destination file name, the source
/// name is reused.
///
/// # Errors
/// `Unimplemented` for Sync; `Usage` for a mirror of a single file, a
/// destination file without a source file, or a missing source.
pub fn create_job<P: AsRef<Path>, Q: AsRef<Path>>(
    mode: Mode,
    source_dir: P,
    source_file: Option<PathBuf>,
    dest_dir: Q,
    dest_file: Option<PathBuf>,
) -> Result<CopyJob, EngineError> {
    if mode == Mode::Sync {
        return Err(EngineError::Unimplemented("Not Yet Implemented!".to_string()));
    }

    let source_dir = non_empty(source_dir.as_ref());
    let dest_dir = non_empty(dest_dir.as_ref());
    let source_file = source_file.filter(|f| !f.as_os_str().is_empty());
    let dest_file = dest_file.filter(|f| !f.as_os_str().is_empty());

    if source_file.is_none() && dest_file.is_some() {
        return Err(EngineError::Usage(
            "a destination file needs a source file".to_string(),
        ));
    }
    if source_file.is_some() && mode == Mode::Mirror {
        return Err(EngineError::Usage(
            "mirror mode works on directories, not single files".to_string(),
        ));
    }

    if !fs_ops::probe_dir(&source_dir).exists {
        return Err(EngineError::Usage(format!(
            "source directory {} not found",
            source_dir.display()
        )));
    }
    if let Some(file) = &source_file {
        if !fs_ops::probe_file(&source_dir.join(file)).exists {
            return Err(EngineError::Usage(format!(
                "source file {} not found",
                source_dir.join(file).display()
            )));
        }
    }

    let dest_file = match (&source_file, dest_file) {
        (Some(file), None) => Some(file.clone()),
        (_, dest_file) => dest_file,
    };

    Ok(CopyJob {
        mode,
        source_dir,
        source_file,
        dest_dir,
        dest_file,
    })
}

fn non_empty(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        path.to_path_buf()
    }
}

/// Run a job to completion.
///
/// A source tree that contains the destination is refused up front. The
/// destination directory is then validated (created if missing) and the
/// source is walked. The first error stops the run; files already
/// verified stay in place.
///
/// # Arguments
/// * `job` - a job from [`create_job`]
/// * `options` - faster / dry-run switches
/// * `config` - buffer size, pacing and polling tunables
/// * `commands` - non-blocking source of pause / abort requests
/// * `progress_callback` - Optional callback for status events
pub fn run_job(
    job: &CopyJob,
    options: RunOptions,
    config: EngineConfig,
    commands: Box<dyn CommandSource>,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<RunStats, EngineError> {
    let mut ctx = RunContext::new(config, options, job.mode, commands, progress_callback)?;

    if let Some(callback) = progress_callback {
        callback.on_run_started(options.dry_run);
    }
    tracing::debug!(
        mode = %job.mode,
        source = %job.source_dir.display(),
        dest = %job.dest_dir.display(),
        dry_run = options.dry_run,
        faster = options.faster,
        "run started"
    );

    walker::check_not_nested(job)?;
    ctx.validator.validate(&job.dest_dir, progress_callback)?;
    walker::walk(&mut ctx, job)?;

    ctx.stats.dirs_created = ctx.validator.created();
    if let Some(callback) = progress_callback {
        callback.on_run_completed(&ctx.stats);
    }
    Ok(ctx.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksums;
    use crate::config::PacingConfig;
    use crate::interrupt::{Command, NoCommands, ScriptedCommands};
    use crate::progress::RecordingProgress;
    use filetime::FileTime;
    use std::fs;
    use std::time::Duration;

    fn test_config() -> EngineConfig {
        EngineConfig {
            buffer_size: 64,
            pause_poll_interval: Duration::ZERO,
            pacing: PacingConfig {
                files_pause: Duration::ZERO,
                micros_per_kib: 0,
                ..PacingConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn run(job: &CopyJob, progress: &RecordingProgress) -> Result<RunStats, EngineError> {
        run_job(
            job,
            RunOptions::default(),
            test_config(),
            Box::new(NoCommands),
            Some(progress),
        )
    }

    fn write_with_mtime(path: &Path, content: &[u8], secs: i64) {
        fs::write(path, content).expect("Failed to write file");
        filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0))
            .expect("Failed to set mtime");
    }

    fn dir_job(mode: Mode, src: &Path, dst: &Path) -> CopyJob {
        create_job(mode, src, None, dst, None).expect("Failed to create job")
    }

    #[test]
    fn test_create_job_rejects_sync() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = create_job(Mode::Sync, temp_dir.path(), None, temp_dir.path(), None);
        assert!(matches!(result, Err(EngineError::Unimplemented(_))));
    }

    #[test]
    fn test_create_job_rejects_mirror_of_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("f"), b"x").expect("Failed to write file");
        let result = create_job(
            Mode::Mirror,
            temp_dir.path(),
            Some(PathBuf::from("f")),
            temp_dir.path().join("out"),
            None,
        );
        assert!(matches!(result, Err(EngineError::Usage(_))));
    }

    #[test]
    fn test_create_job_with_missing_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = create_job(
            Mode::Copy,
            temp_dir.path().join("nonexistent"),
            None,
            temp_dir.path(),
            None,
        );
        assert!(matches!(result, Err(EngineError::Usage(_))));
    }

    #[test]
    fn test_create_job_reuses_source_file_name() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("a.txt"), b"x").expect("Failed to write file");
        let job = create_job(
            Mode::Copy,
            temp_dir.path(),
            Some(PathBuf::from("a.txt")),
            temp_dir.path().join("out"),
            None,
        )
        .expect("Failed to create job");
        assert_eq!(job.dest_file(), Some(Path::new("a.txt")));
        assert!(job.is_single_file());
    }

    #[test]
    fn test_copy_into_empty_destination() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        let content: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
        write_with_mtime(&src.join("report.csv"), &content, 1_650_000_000);

        let progress = RecordingProgress::new();
        let stats = run(&dir_job(Mode::Copy, &src, &dst), &progress).expect("Run should succeed");

        let copied = dst.join("report.csv");
        let copied_bytes = fs::read(&copied).expect("Destination should exist");
        assert_eq!(copied_bytes.len(), 1000);
        assert_eq!(
            checksums::update(0, &copied_bytes),
            checksums::update(0, &content)
        );
        let snap = fs_ops::probe_file(&copied);
        assert_eq!(snap.mtime_sec, 1_650_000_000);
        assert_eq!(stats.files_copied, 1);
        assert_eq!(stats.bytes_copied, 1000);
        assert_eq!(stats.dirs_created, 1);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("sub")).expect("Failed to create src");
        write_with_mtime(&src.join("report.csv"), &[b'r'; 1000], 1_650_000_000);
        write_with_mtime(&src.join("sub").join("inner.txt"), b"inner", 1_650_000_100);
        let job = dir_job(Mode::Copy, &src, &dst);

        run(&job, &RecordingProgress::new()).expect("First run should succeed");

        let progress = RecordingProgress::new();
        let stats = run(&job, &progress).expect("Second run should succeed");

        assert_eq!(stats.bytes_copied, 0);
        assert_eq!(stats.files_copied, 0);
        assert_eq!(stats.stale_deleted, 0);
        assert_eq!(stats.files_identical, 2);
        assert!(progress.events().iter().all(|e| matches!(
            e,
            TransferEvent::Verify { .. }
        )));
    }

    #[test]
    fn test_shorter_destination_is_replaced() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        write_with_mtime(&src.join("report.csv"), &[b'a'; 1000], 1_650_000_000);
        write_with_mtime(&dst.join("report.csv"), &[b'a'; 999], 1_650_000_000);

        let progress = RecordingProgress::new();
        let stats = run(&dir_job(Mode::Copy, &src, &dst), &progress).expect("Run should succeed");

        let events = progress.events();
        let delete_at = events
            .iter()
            .position(|e| {
                matches!(e, TransferEvent::DeleteStale { diff, .. } if diff.size_delta == Some(-1))
            })
            .expect("Deletion citing the size difference");
        let copy_at = events
            .iter()
            .position(|e| matches!(e, TransferEvent::Copy { .. }))
            .expect("Copy event");
        assert!(delete_at < copy_at);
        assert_eq!(stats.stale_deleted, 1);
        assert_eq!(fs::read(dst.join("report.csv")).expect("read").len(), 1000);
    }

    #[test]
    fn test_mirror_deletes_extra_destination_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        for name in ["a", "b"] {
            write_with_mtime(&src.join(name), name.as_bytes(), 1_600_000_000);
            write_with_mtime(&dst.join(name), name.as_bytes(), 1_600_000_000);
        }
        write_with_mtime(&dst.join("c"), b"c", 1_600_000_000);

        let progress = RecordingProgress::new();
        let stats =
            run(&dir_job(Mode::Mirror, &src, &dst), &progress).expect("Run should succeed");

        assert!(!dst.join("c").exists());
        assert!(dst.join("a").exists() && dst.join("b").exists());
        assert_eq!(stats.mirror_deleted, 1);
        assert_eq!(stats.files_copied, 0);
        assert!(progress
            .events()
            .contains(&TransferEvent::MirrorDelete { dest: dst.join("c") }));
    }

    #[test]
    fn test_single_file_never_triggers_cleanup() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        fs::write(src.join("a"), b"a").expect("Failed to write file");
        fs::write(dst.join("c"), b"c").expect("Failed to write file");

        let job = create_job(
            Mode::Move,
            &src,
            Some(PathBuf::from("a")),
            &dst,
            None,
        )
        .expect("Failed to create job");
        run(&job, &RecordingProgress::new()).expect("Run should succeed");

        assert!(dst.join("c").exists());
        assert!(dst.join("a").exists());
    }

    #[test]
    fn test_move_removes_verified_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("f"), b"payload").expect("Failed to write file");

        let stats = run(&dir_job(Mode::Move, &src, &dst), &RecordingProgress::new())
            .expect("Run should succeed");

        assert!(!src.join("f").exists());
        assert_eq!(fs::read(dst.join("f")).expect("read"), b"payload");
        assert_eq!(stats.sources_deleted, 1);
    }

    #[test]
    fn test_move_keeps_source_when_copy_fails() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("f"), b"payload").expect("Failed to write file");
        // A directory squatting on the destination name makes the create fail.
        fs::create_dir_all(dst.join("f")).expect("Failed to create blocker");

        let result = run(&dir_job(Mode::Move, &src, &dst), &RecordingProgress::new());

        assert!(matches!(result, Err(EngineError::Operation { .. })));
        assert!(src.join("f").exists());
    }

    #[test]
    fn test_abort_stops_run_and_keeps_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("big"), vec![7u8; 640]).expect("Failed to write file");

        let result = run_job(
            &dir_job(Mode::Move, &src, &dst),
            RunOptions::default(),
            test_config(),
            Box::new(ScriptedCommands::new(vec![None, None, Some(Command::Abort)])),
            None,
        );

        assert!(matches!(result, Err(EngineError::UserStop)));
        assert!(src.join("big").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("sub")).expect("Failed to create src");
        fs::write(src.join("f"), b"data").expect("Failed to write file");
        fs::write(src.join("sub").join("g"), b"more").expect("Failed to write file");

        let progress = RecordingProgress::new();
        let stats = run_job(
            &dir_job(Mode::Move, &src, &dst),
            RunOptions {
                dry_run: true,
                faster: false,
            },
            test_config(),
            Box::new(NoCommands),
            Some(&progress),
        )
        .expect("Dry run should succeed");

        assert!(!dst.exists());
        assert!(src.join("f").exists());
        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.bytes_copied, 0);
        let copies = progress
            .events()
            .into_iter()
            .filter(|e| matches!(e, TransferEvent::Copy { .. }))
            .count();
        assert_eq!(copies, 2);
    }

    #[test]
    fn test_copy_into_own_subdirectory_is_circular() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("tree");
        let nested = src.join("l1").join("l2");
        fs::create_dir_all(&nested).expect("Failed to create tree");
        fs::write(src.join("f"), b"x").expect("Failed to write file");

        let progress = RecordingProgress::new();
        let result = run(&dir_job(Mode::Copy, &src, &nested.join("l3")), &progress);

        assert!(matches!(result, Err(EngineError::Circular { .. })));
        assert!(progress.events().is_empty());
        assert!(!nested.join("l3").exists());
    }

    #[test]
    fn test_file_onto_itself_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("same"), b"x").expect("Failed to write file");
        let job = create_job(
            Mode::Copy,
            temp_dir.path(),
            Some(PathBuf::from("same")),
            temp_dir.path(),
            None,
        )
        .expect("Failed to create job");

        let result = run(&job, &RecordingProgress::new());
        assert!(matches!(result, Err(EngineError::Operation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_move_onto_aliased_directory_keeps_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).expect("Failed to create dir");
        fs::write(dir.join("f"), b"only copy").expect("Failed to write file");
        let job = create_job(
            Mode::Move,
            &dir,
            Some(PathBuf::from("f")),
            dir.join("..").join("d"),
            None,
        )
        .expect("Failed to create job");

        let result = run(&job, &RecordingProgress::new());

        let err = result.expect_err("Same file under two spellings");
        assert!(err.to_string().contains("Can't copy the file on itself!"));
        assert_eq!(fs::read(dir.join("f")).expect("read"), b"only copy");
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_onto_itself_is_an_operation_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).expect("Failed to create dir");
        fs::write(dir.join("f"), b"x").expect("Failed to write file");

        for dest in [dir.clone(), dir.join("..").join("d")] {
            let progress = RecordingProgress::new();
            let err = run(&dir_job(Mode::Move, &dir, &dest), &progress)
                .expect_err("Directory onto itself");

            assert!(matches!(err, EngineError::Operation { .. }));
            assert!(err.to_string().contains("Can't copy the directory on itself!"));
            assert_eq!(err.exit_code(), 1);
            assert!(progress.events().is_empty());
        }
        assert!(dir.join("f").exists());
    }

    #[test]
    fn test_file_to_new_name_in_same_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("one"), b"copy me").expect("Failed to write file");
        let job = create_job(
            Mode::Copy,
            temp_dir.path(),
            Some(PathBuf::from("one")),
            temp_dir.path(),
            Some(PathBuf::from("two")),
        )
        .expect("Failed to create job");

        run(&job, &RecordingProgress::new()).expect("Run should succeed");
        assert_eq!(fs::read(temp_dir.path().join("two")).expect("read"), b"copy me");
    }

    #[test]
    fn test_faster_mode_still_copies() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("f"), vec![1u8; 1000]).expect("Failed to write file");

        let stats = run_job(
            &dir_job(Mode::Copy, &src, &dst),
            RunOptions {
                faster: true,
                dry_run: false,
            },
            test_config(),
            Box::new(NoCommands),
            None,
        )
        .expect("Run should succeed");
        assert_eq!(stats.bytes_copied, 1000);
    }
}
