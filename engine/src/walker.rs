//! Depth-first tree walker.
//!
//! The walker mirrors the source tree onto the destination tree: it validates
//! every destination subdirectory before descending into it, hands regular
//! files to [`transfer_file`], and in Mirror mode removes destination files
//! that no longer exist in the source once a directory's entries are done.

use crate::error::EngineError;
use crate::fs_ops::{self, probe_dir, probe_file};
use crate::job::RunContext;
use crate::model::{CopyJob, FileIdentity, Mode, PathPair};
use crate::progress::TransferEvent;
use crate::transfer::transfer_file;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Identity of the destination root, recorded once per run.
///
/// Any source directory with the same identity would make the walk copy its
/// own output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalGuard {
    root: Option<FileIdentity>,
}

impl TraversalGuard {
    /// Record `identity` unless a root is already known. Platforms without
    /// inode numbers report the zero identity, which never arms the guard.
    pub fn record(&mut self, identity: FileIdentity) {
        if self.root.is_none() && identity != FileIdentity::default() {
            self.root = Some(identity);
        }
    }

    pub fn root(&self) -> Option<FileIdentity> {
        self.root
    }

    pub fn is_guarded(&self, identity: FileIdentity) -> bool {
        self.root == Some(identity)
    }
}

/// Refuse a whole-directory job whose destination is its source or lies
/// inside it.
///
/// Runs before anything is created, so the destination may not exist yet:
/// the nearest existing ancestor of it stands in for it.
pub(crate) fn check_not_nested(job: &CopyJob) -> Result<(), EngineError> {
    if job.is_single_file() {
        return Ok(());
    }
    let source = probe_dir(&job.source_dir).identity;
    if source == FileIdentity::default() {
        return Ok(());
    }

    if probe_dir(&job.dest_dir).identity == source {
        return Err(EngineError::operation(
            "Can't copy the directory on itself!",
            &job.source_dir,
        ));
    }

    let anchor = nearest_existing(&job.dest_dir)?;
    for ancestor in anchor.ancestors() {
        if probe_dir(ancestor).identity == source {
            tracing::debug!(
                source = %job.source_dir.display(),
                dest = %job.dest_dir.display(),
                "destination is inside the source tree"
            );
            return Err(EngineError::Circular {
                path: job.dest_dir.clone(),
            });
        }
    }
    Ok(())
}

fn nearest_existing(path: &Path) -> Result<PathBuf, EngineError> {
    let mut candidate = Some(path);
    while let Some(current) = candidate {
        if current.as_os_str().is_empty() {
            break;
        }
        if let Ok(resolved) = fs::canonicalize(current) {
            return Ok(resolved);
        }
        candidate = current.parent();
    }
    std::env::current_dir().map_err(|e| EngineError::io("Could Not Resolve", path, e))
}

/// Walk the job from its roots.
pub(crate) fn walk(ctx: &mut RunContext<'_>, job: &CopyJob) -> Result<(), EngineError> {
    copy_level(
        ctx,
        &job.source_dir,
        job.source_file.as_deref(),
        &job.dest_dir,
        job.dest_file.as_deref(),
    )
}

fn copy_level(
    ctx: &mut RunContext<'_>,
    source_dir: &Path,
    source_file: Option<&Path>,
    dest_dir: &Path,
    dest_file: Option<&Path>,
) -> Result<(), EngineError> {
    if source_dir == dest_dir {
        return match (source_file, dest_file) {
            (Some(src), Some(dst)) if src != dst => {
                transfer_file(ctx, &PathPair::new(source_dir.join(src), dest_dir.join(dst)))
            }
            (Some(src), _) => Err(EngineError::operation(
                "Can't copy the file on itself!",
                &source_dir.join(src),
            )),
            (None, _) => Err(EngineError::operation(
                "Can't copy the directory on itself!",
                source_dir,
            )),
        };
    }

    let source = probe_dir(source_dir);
    if !source.exists {
        return Err(EngineError::Usage(format!(
            "source directory {} not found",
            source_dir.display()
        )));
    }
    if ctx.guard.is_guarded(source.identity) {
        return Err(EngineError::Circular {
            path: source_dir.to_path_buf(),
        });
    }

    let dest = probe_dir(dest_dir);
    if dest.exists {
        ctx.guard.record(dest.identity);
    } else if !ctx.options.dry_run {
        return Err(EngineError::Usage(format!(
            "destination directory {} not found",
            dest_dir.display()
        )));
    }

    match source_file {
        Some(file) => {
            let dest_name = dest_file.unwrap_or(file);
            transfer_file(ctx, &PathPair::new(source_dir.join(file), dest_dir.join(dest_name)))
        }
        None => copy_directory(ctx, &PathPair::new(source_dir, dest_dir)),
    }
}

fn copy_directory(ctx: &mut RunContext<'_>, dirs: &PathPair) -> Result<(), EngineError> {
    let entries =
        fs::read_dir(&dirs.source).map_err(|e| EngineError::io("Could Not Open", &dirs.source, e))?;

    for entry in entries {
        ctx.poller.check(ctx.progress)?;
        let entry = entry.map_err(|e| EngineError::io("Could Not Read", &dirs.source, e))?;
        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }
        let child = dirs.child(&name);
        if name.len() > ctx.config.max_name_len {
            return Err(EngineError::operation("Name Too Long!", &child.source));
        }

        let file_type = entry
            .file_type()
            .map_err(|e| EngineError::io("Could Not Stat", &child.source, e))?;
        if file_type.is_dir() {
            let identity = probe_dir(&child.source).identity;
            if ctx.guard.is_guarded(identity) {
                return Err(EngineError::Circular { path: child.source });
            }
            ctx.validator.validate(&child.dest, ctx.progress)?;
            copy_directory(ctx, &child)?;
        } else if file_type.is_file() {
            transfer_file(ctx, &child)?;
        } else {
            tracing::debug!(path = %child.source.display(), "skipping special entry");
        }
    }

    if ctx.mode == Mode::Mirror {
        mirror_cleanup(ctx, dirs)?;
    }
    Ok(())
}

/// Delete destination files with no counterpart in the source directory.
/// Deletion failures are warnings; only an abort stops the pass.
fn mirror_cleanup(ctx: &mut RunContext<'_>, dirs: &PathPair) -> Result<(), EngineError> {
    let entries = match fs::read_dir(&dirs.dest) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            warn(ctx, &dirs.dest, &e);
            return Ok(());
        }
    };

    let mut orphans = Vec::new();
    for entry in entries {
        ctx.poller.check(ctx.progress)?;
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn(ctx, &dirs.dest, &e);
                continue;
            }
        };
        let is_file = match entry.file_type() {
            Ok(file_type) => file_type.is_file(),
            Err(e) => {
                warn(ctx, &entry.path(), &e);
                continue;
            }
        };
        let child = dirs.child(&entry.file_name());
        if is_file && !probe_file(&child.source).exists {
            orphans.push(child.dest);
        }
    }

    for orphan in orphans {
        tracing::debug!(dest = %orphan.display(), "no source counterpart");
        ctx.emit(TransferEvent::MirrorDelete {
            dest: orphan.clone(),
        });
        if ctx.options.dry_run || fs_ops::remove_file_best_effort(&orphan, ctx.progress) {
            ctx.stats.mirror_deleted += 1;
        }
    }
    Ok(())
}

fn warn(ctx: &RunContext<'_>, path: &Path, error: &io::Error) {
    tracing::warn!(path = %path.display(), %error, "mirror cleanup could not read entry");
    ctx.emit(TransferEvent::Warning {
        path: path.to_path_buf(),
        message: format!("Could not read ({})", error),
    });
}
