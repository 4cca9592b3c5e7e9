//! Per-file transfer state machine.
//!
//! probe -> compare -> decide -> copy -> integrity check -> retime ->
//! re-verify -> delete source (move) -> bookkeeping
//!
//! The steps run strictly in order and any failure ends the run. The source
//! of a move is only deleted after the destination has been re-read and its
//! checksum accepted.

use crate::checksums::{self, Checksum};
use crate::error::EngineError;
use crate::fs_ops::{self, probe_file};
use crate::job::RunContext;
use crate::model::{FileIdentity, FileSnapshot, Mode, PathPair};
use crate::progress::{Difference, TransferEvent};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Instant;

pub(crate) fn transfer_file(ctx: &mut RunContext<'_>, pair: &PathPair) -> Result<(), EngineError> {
    let dry_run = ctx.options.dry_run;

    // Probe
    let source = probe_file(&pair.source);
    if !source.exists {
        return Err(EngineError::operation("File Not Found!", &pair.source));
    }
    let dest = probe_file(&pair.dest);
    if dest.exists
        && source.identity != FileIdentity::default()
        && source.identity == dest.identity
    {
        return Err(EngineError::operation(
            "Can't copy the file on itself!",
            &pair.source,
        ));
    }

    // Compare
    let comparable = dest.exists && source.size != 0 && source.size == dest.size;
    let mut source_sum = None;
    let mut dest_sum = None;
    if comparable {
        ctx.emit(TransferEvent::Verify {
            source: pair.source.clone(),
            dest: pair.dest.clone(),
        });
        if !dry_run {
            source_sum = Some(checksum_of(ctx, &pair.source)?);
            dest_sum = Some(checksum_of(ctx, &pair.dest)?);
        }
    }
    let diff = difference(&source, &dest, source_sum, dest_sum, comparable && dry_run);

    // Decide
    if dest.exists && diff.is_empty() {
        tracing::debug!(source = %pair.source.display(), "identical, skipping copy");
        ctx.stats.files_identical += 1;
    } else {
        if dest.exists {
            tracing::debug!(dest = %pair.dest.display(), %diff, "replacing stale destination");
            ctx.emit(TransferEvent::DeleteStale {
                dest: pair.dest.clone(),
                diff,
            });
            if !dry_run {
                fs_ops::remove_file(&pair.dest)?;
            }
            ctx.stats.stale_deleted += 1;
        }

        ctx.emit(TransferEvent::Copy {
            source: pair.source.clone(),
            dest: pair.dest.clone(),
        });
        let accepted = if dry_run {
            None
        } else {
            let written_sum = copy_contents(ctx, pair, &source)?;
            match source_sum {
                Some(expected) if expected != written_sum => {
                    fs_ops::remove_file_best_effort(&pair.dest, ctx.progress);
                    return Err(EngineError::operation("Source Check Failed!", &pair.source));
                }
                _ => {}
            }
            fs_ops::retime(&pair.dest, &source)?;
            Some(source_sum.unwrap_or(written_sum))
        };
        ctx.stats.files_copied += 1;

        ctx.emit(TransferEvent::VerifyDest {
            dest: pair.dest.clone(),
        });
        if let Some(expected) = accepted {
            verify_destination(ctx, &pair.dest, expected)?;
        }
    }

    if ctx.mode == Mode::Move {
        ctx.emit(TransferEvent::DeleteSource {
            source: pair.source.clone(),
        });
        if !dry_run {
            fs_ops::remove_file(&pair.source)?;
        }
        ctx.stats.sources_deleted += 1;
    }

    ctx.stats.files_processed += 1;
    ctx.pacing
        .after_file(ctx.options.faster, &mut ctx.poller, ctx.progress)
}

/// Which dimensions separate `dest` from `source`.
///
/// A missing destination is reported as differing in every dimension that
/// can be computed; the caller never deletes it in that case.
fn difference(
    source: &FileSnapshot,
    dest: &FileSnapshot,
    source_sum: Option<u32>,
    dest_sum: Option<u32>,
    assume_checksum_differs: bool,
) -> Difference {
    let size_delta = if source.size != dest.size {
        Some(dest.size as i64 - source.size as i64)
    } else {
        None
    };
    let checksum = match (source_sum, dest_sum) {
        (Some(a), Some(b)) => a != b,
        _ => assume_checksum_differs,
    };
    Difference {
        size_delta,
        seconds: source.mtime_sec != dest.mtime_sec,
        nanoseconds: source.mtime_nsec != dest.mtime_nsec,
        checksum,
    }
}

fn checksum_of(ctx: &mut RunContext<'_>, path: &Path) -> Result<u32, EngineError> {
    checksums::file_checksum(path, &mut ctx.buffer, &mut ctx.poller, ctx.progress)
}

/// Copy the bytes and return the checksum of what was written.
///
/// On an I/O failure the partial destination is removed; on a user stop it
/// is left as it is.
fn copy_contents(
    ctx: &mut RunContext<'_>,
    pair: &PathPair,
    source: &FileSnapshot,
) -> Result<u32, EngineError> {
    let mut reader =
        File::open(&pair.source).map_err(|e| EngineError::io("Could Not Open", &pair.source, e))?;
    let mut writer = create_dest(&pair.dest, source.mode)
        .map_err(|e| EngineError::io("Could Not Create", &pair.dest, e))?;

    let result = pump(ctx, &mut reader, &mut writer, pair);
    drop(writer);
    match result {
        Err(EngineError::UserStop) => Err(EngineError::UserStop),
        Err(e) => {
            fs_ops::remove_file_best_effort(&pair.dest, ctx.progress);
            Err(e)
        }
        ok => ok,
    }
}

fn pump(
    ctx: &mut RunContext<'_>,
    reader: &mut File,
    writer: &mut File,
    pair: &PathPair,
) -> Result<u32, EngineError> {
    let capacity = ctx.buffer.len();
    let mut checksum = Checksum::new();
    loop {
        let read = match reader.read(&mut ctx.buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::io("Could Not Read", &pair.source, e)),
        };
        if read > 0 {
            ctx.pacing.add_bytes(read as u64);

            if !ctx.options.faster {
                let delay = ctx.throttle.next_delay(read, capacity);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }

            checksum.update(&ctx.buffer[..read]);

            let started = Instant::now();
            let written = writer.write(&ctx.buffer[..read]);
            ctx.throttle.record_write(started.elapsed(), read, capacity);
            match written {
                Ok(n) if n == read => ctx.stats.bytes_copied += n as u64,
                Ok(_) => return Err(EngineError::operation("Write Failed (short write)", &pair.dest)),
                Err(e) => return Err(EngineError::io("Write Failed", &pair.dest, e)),
            }
        }
        ctx.poller.check(ctx.progress)?;
        if read == 0 {
            return Ok(checksum.value());
        }
    }
}

#[cfg(unix)]
fn create_dest(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode & 0o7777)
        .open(path)
}

#[cfg(not(unix))]
fn create_dest(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Re-read `dest` from disk and compare against the accepted checksum.
/// A mismatch removes the destination.
pub(crate) fn verify_destination(
    ctx: &mut RunContext<'_>,
    dest: &Path,
    expected: u32,
) -> Result<(), EngineError> {
    let on_disk = checksum_of(ctx, dest)?;
    if on_disk != expected {
        tracing::warn!(dest = %dest.display(), expected, on_disk, "destination verification failed");
        fs_ops::remove_file_best_effort(dest, ctx.progress);
        return Err(EngineError::operation("Destination Check Failed!", dest));
    }
    Ok(())
}
