//! Turning the SOURCE / DEST arguments into directory and file-name parts.

use engine::fs_ops::{probe_dir, probe_file};
use engine::EngineError;
use std::path::{Path, PathBuf};

/// A command-line path split into a directory and an optional file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub dir: PathBuf,
    pub file: Option<PathBuf>,
}

impl Endpoint {
    fn directory(path: &Path) -> Self {
        Endpoint {
            dir: path.to_path_buf(),
            file: None,
        }
    }

    fn split(path: &Path) -> Result<Self, EngineError> {
        let name = path
            .file_name()
            .ok_or_else(|| EngineError::Usage(format!("{} has no file name", path.display())))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Endpoint {
            dir,
            file: Some(PathBuf::from(name)),
        })
    }
}

/// The source must exist, either as a regular file or as a directory.
pub fn split_source(path: &Path) -> Result<Endpoint, EngineError> {
    if probe_file(path).exists {
        Endpoint::split(path)
    } else if probe_dir(path).exists {
        Ok(Endpoint::directory(path))
    } else {
        Err(EngineError::Usage(format!("{} not found", path.display())))
    }
}

/// Interpret the destination, which defaults to the current directory.
///
/// An existing file is only a valid target for a single source file. A path
/// that does not exist yet names a file when the source is a file, and a
/// directory to create otherwise.
pub fn split_dest(path: Option<&Path>, source_is_file: bool) -> Result<Endpoint, EngineError> {
    let Some(path) = path else {
        return Ok(Endpoint::directory(Path::new(".")));
    };

    if probe_file(path).exists {
        if !source_is_file {
            return Err(EngineError::Usage(format!(
                "cannot copy a directory onto the file {}",
                path.display()
            )));
        }
        Endpoint::split(path)
    } else if probe_dir(path).exists {
        Ok(Endpoint::directory(path))
    } else if source_is_file {
        Endpoint::split(path)
    } else {
        Ok(Endpoint::directory(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_source_file_is_split() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("notes.txt");
        fs::write(&file, b"x").expect("Failed to write file");

        let endpoint = split_source(&file).expect("Source exists");
        assert_eq!(endpoint.dir, temp_dir.path());
        assert_eq!(endpoint.file, Some(PathBuf::from("notes.txt")));
    }

    #[test]
    fn test_source_directory_is_kept_whole() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let endpoint = split_source(temp_dir.path()).expect("Source exists");
        assert_eq!(endpoint, Endpoint::directory(temp_dir.path()));
    }

    #[test]
    fn test_missing_source_is_usage() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = split_source(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(EngineError::Usage(_))));
    }

    #[test]
    fn test_bare_file_name_lives_in_current_directory() {
        let endpoint = split_dest(Some(Path::new("out.bin")), true).expect("Split");
        assert_eq!(endpoint.dir, PathBuf::from("."));
        assert_eq!(endpoint.file, Some(PathBuf::from("out.bin")));
    }

    #[test]
    fn test_dest_defaults_to_current_directory() {
        let endpoint = split_dest(None, false).expect("Default");
        assert_eq!(endpoint, Endpoint::directory(Path::new(".")));
    }

    #[test]
    fn test_existing_dest_file_needs_source_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("target");
        fs::write(&file, b"x").expect("Failed to write file");

        assert!(matches!(
            split_dest(Some(&file), false),
            Err(EngineError::Usage(_))
        ));
        let endpoint = split_dest(Some(&file), true).expect("File onto file");
        assert_eq!(endpoint.file, Some(PathBuf::from("target")));
    }

    #[test]
    fn test_new_dest_for_directory_source_is_a_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = temp_dir.path().join("new").join("tree");
        let endpoint = split_dest(Some(&target), false).expect("Split");
        assert_eq!(endpoint, Endpoint::directory(&target));
    }

    #[test]
    fn test_existing_dest_directory_for_file_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let endpoint = split_dest(Some(temp_dir.path()), true).expect("Split");
        assert_eq!(endpoint.file, None);
    }
}
