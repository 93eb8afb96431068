//! Filesystem-backed playground pack. Loading validates the manifest up front
//! so later failures point at shader code or images rather than at a broken
//! pack layout.
//!
//! Types:
//!
//! - `PackError` classifies manifest parsing, validation and I/O failures.
//! - `LocalPack` stores the pack root and its parsed `PlaygroundManifest`.
//!
//! Functions:
//!
//! - `LocalPack::load` reads `playground.toml` and validates it.
//! - `vertex_source`, `fragment_source` and `include_map` read the GLSL the
//!   renderer compiles.
//! - `texture_locator` turns a `[[textures]]` entry into a fetchable locator.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::manifest::{CanvasSize, PlaygroundManifest, TextureEntry};

pub const MANIFEST_FILE: &str = "playground.toml";

/// Vertex shader used when the manifest names none: a single point centred
/// on the canvas, sized to cover it.
pub const DEFAULT_VERTEX_SHADER: &str = "precision mediump float;
uniform vec2 iResolution;
void main() {
  gl_Position = vec4(0.0, 0.0, 0.0, 1.0);
  gl_PointSize = max(iResolution.x, iResolution.y);
}
";

const INCLUDE_EXTENSIONS: [&str; 5] = ["glsl", "frag", "vert", "inc", "h"];

#[derive(Debug, Error)]
pub enum PackError {
    #[error("manifest not found at {0}")]
    ManifestMissing(PathBuf),

    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] toml::de::Error),

    #[error("manifest validation failed: {0:?}")]
    ManifestValidation(Vec<String>),

    #[error("shader source not found at {0}")]
    SourceMissing(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct LocalPack {
    root: PathBuf,
    manifest: PlaygroundManifest,
}

impl LocalPack {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, PackError> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(PackError::ManifestMissing(manifest_path));
        }

        let manifest_raw = fs::read_to_string(&manifest_path)?;
        let manifest: PlaygroundManifest = toml::from_str(&manifest_raw)?;
        let issues = manifest.validate();
        if !issues.is_empty() {
            return Err(PackError::ManifestValidation(issues));
        }

        tracing::debug!(
            root = %root.display(),
            textures = manifest.textures.len(),
            "loaded playground pack"
        );
        Ok(Self { root, manifest })
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn manifest(&self) -> &PlaygroundManifest {
        &self.manifest
    }

    /// Manifest name, else the pack directory name.
    pub fn name(&self) -> String {
        self.manifest
            .name
            .clone()
            .or_else(|| {
                self.root
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "playground".to_string())
    }

    pub fn canvas(&self) -> CanvasSize {
        self.manifest.canvas
    }

    pub fn textures(&self) -> &[TextureEntry] {
        &self.manifest.textures
    }

    pub fn vertex_source(&self) -> Result<String, PackError> {
        match &self.manifest.vertex {
            Some(path) => self.read_source(path),
            None => Ok(DEFAULT_VERTEX_SHADER.to_string()),
        }
    }

    pub fn fragment_source(&self) -> Result<String, PackError> {
        self.read_source(&self.manifest.fragment)
    }

    /// Every include fragment keyed by name: files under `include_dir` by
    /// their `/`-separated relative path, then the explicit `[includes]`
    /// table, which wins on conflicts.
    pub fn include_map(&self) -> Result<HashMap<String, String>, PackError> {
        let mut includes = HashMap::new();
        if let Some(dir) = &self.manifest.include_dir {
            let dir = self.root.join(dir);
            if !dir.is_dir() {
                return Err(PackError::SourceMissing(dir));
            }
            collect_includes(&dir, &dir, &mut includes)?;
        }
        for (name, path) in &self.manifest.includes {
            includes.insert(name.clone(), self.read_source(path)?);
        }
        tracing::debug!(count = includes.len(), "resolved include fragments");
        Ok(includes)
    }

    /// URLs are passed through; anything else is joined to the pack root.
    pub fn texture_locator(&self, entry: &TextureEntry) -> String {
        if is_remote_locator(&entry.path) {
            entry.path.clone()
        } else {
            self.root.join(&entry.path).to_string_lossy().into_owned()
        }
    }

    fn read_source(&self, relative: &Path) -> Result<String, PackError> {
        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(PackError::SourceMissing(path));
        }
        Ok(fs::read_to_string(path)?)
    }
}

fn is_remote_locator(locator: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        locator
            .get(..scheme.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn collect_includes(
    base: &Path,
    dir: &Path,
    includes: &mut HashMap<String, String>,
) -> Result<(), PackError> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_includes(base, &path, includes)?;
            continue;
        }
        let is_glsl = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| INCLUDE_EXTENSIONS.contains(&ext));
        if !is_glsl {
            continue;
        }
        let Ok(relative) = path.strip_prefix(base) else {
            continue;
        };
        let name = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        includes.insert(name, fs::read_to_string(&path)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_pack(dir: &Path, manifest: &str, extra_files: &[(&str, &str)]) {
        fs::write(dir.join(MANIFEST_FILE), manifest).expect("write manifest");
        for (path, contents) in extra_files {
            let full_path = dir.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).expect("create dirs");
            }
            fs::write(full_path, contents).expect("write file");
        }
    }

    const LANDSCAPE: &str = r#"
name = "Landscape"
fragment = "frag.glsl"
include_dir = "includes"

[canvas]
width = 640
height = 360

[includes]
"lib/noise.glsl" = "shared/noise.glsl"

[[textures]]
path = "images/landscape.png"
wrap_s = "clamp-to-edge"
wrap_t = "clamp-to-edge"
min_filter = "linear"

[[textures]]
path = "https://example.com/clouds.jpg"
"#;

    #[test]
    fn loads_valid_pack() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), LANDSCAPE, &[("frag.glsl", "void main() {}\n")]);

        let pack = LocalPack::load(dir.path()).unwrap();
        assert_eq!(pack.name(), "Landscape");
        assert_eq!(
            pack.canvas(),
            CanvasSize {
                width: 640,
                height: 360
            }
        );
        assert_eq!(pack.textures().len(), 2);
        assert_eq!(pack.fragment_source().unwrap(), "void main() {}\n");
        assert_eq!(pack.vertex_source().unwrap(), DEFAULT_VERTEX_SHADER);
    }

    #[test]
    fn missing_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalPack::load(dir.path()).unwrap_err();
        assert!(matches!(err, PackError::ManifestMissing(path) if path.ends_with(MANIFEST_FILE)));
    }

    #[test]
    fn invalid_manifest_lists_issues() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(
            dir.path(),
            "fragment = \"frag.glsl\"\n[canvas]\nwidth = 0\nheight = 0\n",
            &[],
        );
        let err = LocalPack::load(dir.path()).unwrap_err();
        assert!(matches!(err, PackError::ManifestValidation(issues) if issues.len() == 1));
    }

    #[test]
    fn unparsable_manifest_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), "fragment = ", &[]);
        assert!(matches!(
            LocalPack::load(dir.path()).unwrap_err(),
            PackError::ManifestParse(_)
        ));
    }

    #[test]
    fn missing_sources_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(
            dir.path(),
            "vertex = \"vert.glsl\"\nfragment = \"frag.glsl\"\n",
            &[("frag.glsl", "void main() {}")],
        );
        let pack = LocalPack::load(dir.path()).unwrap();
        let err = pack.vertex_source().unwrap_err();
        assert!(matches!(err, PackError::SourceMissing(path) if path.ends_with("vert.glsl")));
    }

    #[test]
    fn include_map_scans_directory_and_prefers_explicit_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(
            dir.path(),
            LANDSCAPE,
            &[
                ("frag.glsl", "void main() {}"),
                ("includes/common.glsl", "float common_fn() { return 1.0; }"),
                ("includes/lib/noise.glsl", "float noise() { return 0.0; }"),
                ("includes/notes.txt", "not glsl"),
                ("shared/noise.glsl", "float noise() { return 0.5; }"),
            ],
        );

        let includes = LocalPack::load(dir.path()).unwrap().include_map().unwrap();
        assert_eq!(includes.len(), 2);
        assert_eq!(includes["common.glsl"], "float common_fn() { return 1.0; }");
        assert_eq!(includes["lib/noise.glsl"], "float noise() { return 0.5; }");
    }

    #[test]
    fn missing_include_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(
            dir.path(),
            "fragment = \"frag.glsl\"\ninclude_dir = \"includes\"\n",
            &[("frag.glsl", "void main() {}")],
        );
        let pack = LocalPack::load(dir.path()).unwrap();
        assert!(matches!(
            pack.include_map().unwrap_err(),
            PackError::SourceMissing(_)
        ));
    }

    #[test]
    fn texture_locators_resolve_against_root() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), LANDSCAPE, &[("frag.glsl", "void main() {}")]);
        let pack = LocalPack::load(dir.path()).unwrap();

        let local = pack.texture_locator(&pack.textures()[0]);
        assert_eq!(
            PathBuf::from(local),
            dir.path().join("images/landscape.png")
        );
        assert_eq!(
            pack.texture_locator(&pack.textures()[1]),
            "https://example.com/clouds.jpg"
        );
    }

    #[test]
    fn uppercase_url_schemes_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(
            dir.path(),
            "fragment = \"frag.glsl\"\n[[textures]]\npath = \"HTTPS://example.com/sky.png\"\n",
            &[("frag.glsl", "void main() {}")],
        );
        let pack = LocalPack::load(dir.path()).unwrap();
        assert_eq!(
            pack.texture_locator(&pack.textures()[0]),
            "HTTPS://example.com/sky.png"
        );
    }

    #[test]
    fn unnamed_pack_falls_back_to_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sunset");
        fs::create_dir_all(&root).unwrap();
        write_pack(&root, "fragment = \"frag.glsl\"", &[]);
        assert_eq!(LocalPack::load(&root).unwrap().name(), "sunset");
    }
}
