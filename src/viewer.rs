//! Opening generated reports in the host's default viewer

use std::path::Path;
use tracing::debug;

use crate::error::{CovxError, Result};

pub trait Viewer {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Opens files with the platform handler (`xdg-open`, `open`, `start`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemViewer;

impl Viewer for SystemViewer {
    fn open(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "opening in default viewer");
        open::that(path).map_err(|e| CovxError::io(path, e))
    }
}
