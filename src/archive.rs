//! Zip archiving of the artifacts of one run.

use log::info;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("nothing to archive")]
    Empty,
    #[error("archive destination {0} has no parent directory")]
    InvalidDestination(PathBuf),
    #[error("failed to read artifact {path}: {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive IO error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to move archive into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("archive task failed: {0}")]
    Task(String),
}

/// Write `artifacts` into a zip at `destination`, one entry per file named
/// by its file name.
///
/// The archive is assembled in a temporary file next to `destination` and
/// renamed into place only once complete, so a failed run never leaves a
/// truncated archive behind. An existing archive is replaced.
pub fn create_archive(artifacts: &[PathBuf], destination: &Path) -> Result<PathBuf, ArchiveError> {
    if artifacts.is_empty() {
        return Err(ArchiveError::Empty);
    }
    let parent = destination
        .parent()
        .ok_or_else(|| ArchiveError::InvalidDestination(destination.to_path_buf()))?;

    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = ZipWriter::new(temp);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for artifact in artifacts {
        let entry_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| artifact.display().to_string());

        let mut source = File::open(artifact).map_err(|source| ArchiveError::ReadArtifact {
            path: artifact.clone(),
            source,
        })?;
        writer.start_file(entry_name, options)?;
        io::copy(&mut source, &mut writer)?;
    }

    let temp = writer.finish()?;
    temp.as_file().sync_all()?;
    temp.persist(destination)?;

    info!(
        "archived {} report(s) into {}",
        artifacts.len(),
        destination.display()
    );
    Ok(destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use zip::ZipArchive;

    fn write_artifacts(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, format!("%PDF-1.7 {name}")).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_archive_contains_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = write_artifacts(dir.path(), &["report_1_a.pdf", "report_2_b.pdf"]);
        let destination = dir.path().join("all_reports.zip");

        create_archive(&artifacts, &destination).unwrap();

        let mut archive = ZipArchive::new(File::open(&destination).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "report_1_a.pdf");
    }

    #[test]
    fn test_existing_archive_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("all_reports.zip");
        fs::write(&destination, b"stale").unwrap();
        let artifacts = write_artifacts(dir.path(), &["report_1_a.pdf"]);

        create_archive(&artifacts, &destination).unwrap();

        let archive = ZipArchive::new(File::open(&destination).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_missing_artifact_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("all_reports.zip");
        let artifacts = vec![dir.path().join("missing.pdf")];

        let result = create_archive(&artifacts, &destination);

        assert!(matches!(result, Err(ArchiveError::ReadArtifact { .. })));
        assert!(!destination.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_artifact_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_archive(&[], &dir.path().join("a.zip"));
        assert!(matches!(result, Err(ArchiveError::Empty)));
    }
}
