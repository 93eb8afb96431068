//! Resolves where installed playground packs live and turns a `PACK` argument
//! into a pack directory.
//!
//! - `AppPaths::discover` takes the `--data-dir` / `SHADERPLAY_DATA_DIR`
//!   override or falls back to the platform data directory.
//! - `AppPaths::resolve_pack` accepts a directory path first, then a pack name
//!   under each search root.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use directories_next::ProjectDirs;

pub const ENV_DATA_DIR: &str = "SHADERPLAY_DATA_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "shaderplay";
const APPLICATION: &str = "shaderplay";

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir_override.filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => expand_home(dir),
            None => ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .ok_or_else(|| anyhow!("failed to determine user directories"))?
                .data_dir()
                .to_path_buf(),
        };
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn pack_roots(&self) -> Vec<PathBuf> {
        vec![self.data_dir.join("packs")]
    }

    pub fn resolve_pack(&self, pack: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(pack);
        if direct.is_dir() {
            return Ok(direct);
        }

        let mut tried = vec![direct];
        for root in self.pack_roots() {
            let candidate = root.join(pack);
            if candidate.is_dir() {
                return Ok(candidate);
            }
            tried.push(candidate);
        }

        let tried = tried
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("playground pack '{pack}' not found (looked in {tried})")
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path,
    }
}
