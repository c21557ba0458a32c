use planner_core::PlannerResult;
use std::path::Path;
use tokio::fs;

/// Whole-file writes that never leave a half-written document behind
pub struct AtomicWriter;

impl AtomicWriter {
    /// Write to a sibling temp file, then rename it over `path`
    pub async fn write_atomic(path: &Path, data: &[u8]) -> PlannerResult<()> {
        // same directory keeps the rename on one filesystem
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).await?;

        let temp_file = tempfile::NamedTempFile::new_in(parent)?;
        fs::write(temp_file.path(), data).await?;
        temp_file
            .persist(path)
            .map_err(|e| planner_core::PlannerError::Io(e.error))?;

        tracing::debug!("Atomically wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    pub async fn read_all(path: &Path) -> PlannerResult<Vec<u8>> {
        let data = fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(data)
    }
}
