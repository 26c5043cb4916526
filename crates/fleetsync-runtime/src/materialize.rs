use std::io::Write;
use std::path::{Path, PathBuf};

use fleetsync_core::{ConfigTemplate, EnvironmentSnapshot, RenderError};

/// Writes rendered snapshots to the config artifact path.
///
/// The artifact is replaced by rename, so readers see either the previous
/// file or the complete new one.
#[derive(Debug, Clone)]
pub struct ConfigMaterializer {
    path: PathBuf,
    template: ConfigTemplate,
}

impl ConfigMaterializer {
    /// Create a new materializer.
    pub fn new(path: impl Into<PathBuf>, template: ConfigTemplate) -> Self {
        Self {
            path: path.into(),
            template,
        }
    }

    /// Get the artifact path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `snapshot` and atomically replace the artifact.
    pub fn materialize(&self, snapshot: &EnvironmentSnapshot) -> Result<&Path, RenderError> {
        let rendered = self.template.render(snapshot)?;
        self.write_atomic(rendered.as_bytes())?;

        tracing::info!(
            path = %self.path.display(),
            peers = snapshot.peers.len(),
            "Wrote config artifact"
        );
        Ok(&self.path)
    }

    fn write_atomic(&self, contents: &[u8]) -> Result<(), RenderError> {
        let write_err = |source: std::io::Error| RenderError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".fleetsync-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(write_err)?;

        tmp.write_all(contents).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(write_err)?;
        }

        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
