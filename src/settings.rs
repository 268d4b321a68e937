use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory prepended to every image path (default: none, paths used as given)
    pub asset_root: Option<PathBuf>,
    /// Largest `width * height` any buffer may have (default: 2^28 pixels, 1 GiB)
    pub max_pixels: u64,
    /// Record live buffers in the host registry (default: true)
    pub track_buffers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_root: None,
            max_pixels: 1 << 28,
            track_buffers: true,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Resolve a script-supplied path against `asset_root`.
    ///
    /// The root is always prepended: leading `/` or drive prefixes on the
    /// script path are dropped, so `/etc/x.png` becomes `<root>/etc/x.png`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.asset_root {
            Some(root) => {
                let relative: PathBuf = path
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_) | Component::CurDir | Component::ParentDir))
                    .collect();
                root.join(relative)
            }
            None => path.to_path_buf(),
        }
    }
}
