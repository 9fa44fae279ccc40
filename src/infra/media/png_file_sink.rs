use crate::core::trees::{ImageSink, RenderError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes charts into a directory.
///
/// Each image goes to a temporary file next to its destination and is renamed
/// into place only once fully written, so readers never see a partial PNG.
pub struct PngFileSink {
    dir: PathBuf,
}

impl PngFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSink for PngFileSink {
    fn accept(&mut self, file_name: &str, png: Vec<u8>) -> Result<(), RenderError> {
        let target = self.dir.join(file_name);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&png)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| RenderError::Io(e.error))?;

        tracing::debug!(path = %target.display(), size = png.len(), "Saved tree chart");
        Ok(())
    }
}
