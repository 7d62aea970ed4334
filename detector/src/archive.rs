use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use motion_watch_common::frame::{Frame, FrameError};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable storage for alert snapshots.
#[async_trait]
pub trait FrameArchive: Send + Sync {
    /// Where a snapshot named `file_name` will be written.
    fn path_for(&self, file_name: &str) -> PathBuf;

    async fn save(&self, frame: &Frame, path: &Path) -> Result<(), ArchiveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Encode(#[from] FrameError),
    #[error("failed to create archive dir {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
}

/// Snapshot file name for an alert at `at`.
///
/// The asctime rendering ("Sun Oct  4 09:05:07 2026") with every space and
/// colon turned into `_`, a trailing `y`, then `.jpg`:
/// `Sun_Oct__4_09_05_07_2026y.jpg`.
pub fn snapshot_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp: String = at
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
        .chars()
        .map(|c| if c == ' ' || c == ':' { '_' } else { c })
        .collect();
    format!("{stamp}y.jpg")
}

/// Writes snapshots as JPEG files into a local directory.
pub struct JpegArchive {
    dir: PathBuf,
    quality: u8,
}

impl JpegArchive {
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            quality: quality.clamp(1, 100),
        }
    }
}

#[async_trait]
impl FrameArchive for JpegArchive {
    fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    async fn save(&self, frame: &Frame, path: &Path) -> Result<(), ArchiveError> {
        let jpeg = frame.encode_jpeg(self.quality)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArchiveError::CreateDir(parent.display().to_string(), e))?;
        }
        tokio::fs::write(path, &jpeg)
            .await
            .map_err(|e| ArchiveError::Write(path.display().to_string(), e))?;

        debug!(
            path = path.display().to_string(),
            bytes = jpeg.len(),
            seq = frame.seq,
            "wrote snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use image::{Rgb, RgbImage};

    #[test]
    fn file_name_single_digit_day_keeps_padding() {
        // 2026-10-04T09:05:07Z, a Sunday.
        let at = Utc.with_ymd_and_hms(2026, 10, 4, 9, 5, 7).unwrap();
        assert_eq!(snapshot_file_name(&at), "Sun_Oct__4_09_05_07_2026y.jpg");
    }

    #[test]
    fn file_name_uses_the_given_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2026, 10, 14, 23, 59, 1).unwrap();
        let name = snapshot_file_name(&at);
        assert_eq!(name, "Wed_Oct_14_23_59_01_2026y.jpg");
        assert!(!name.contains(' ') && !name.contains(':'));
    }

    #[tokio::test]
    async fn save_writes_decodable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let archive = JpegArchive::new(dir.path().join("snapshots"), 85);
        let frame = Frame::new(RgbImage::from_pixel(16, 12, Rgb([10, 120, 200])), 0, 3);

        let path = archive.path_for("Sun_Oct__4_09_05_07_2026y.jpg");
        archive.save(&frame, &path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let decoded = Frame::from_jpeg(&bytes, 0, 0).unwrap();
        assert_eq!(decoded.dimensions(), (16, 12));
    }

    #[tokio::test]
    async fn save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let archive = JpegArchive::new(&blocker, 85);
        let frame = Frame::new(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])), 0, 0);
        let path = archive.path_for("x.jpg");
        assert!(archive.save(&frame, &path).await.is_err());
    }
}
