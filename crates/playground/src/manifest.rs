//! Schema of `playground.toml`, the manifest at the root of every playground
//! pack. Sampling options mirror the renderer's texture descriptor but stay
//! free of renderer types so packs can be inspected without a GL stack.
//!
//! Types:
//!
//! - `PlaygroundManifest` names the shader sources, include fragments, canvas
//!   size and channel textures of one pack.
//! - `TextureEntry` describes a single `iChannel<N>` image in declaration order.
//! - `WrapSetting`, `MinFilterSetting` and `MagFilterSetting` spell the GL
//!   sampling enums in kebab-case.
//!
//! Functions:
//!
//! - `PlaygroundManifest::validate` returns human-readable issues instead of
//!   failing on the first one.
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Upper bound on `[[textures]]` entries, one per texture unit.
pub const MAX_TEXTURES: usize = 16;

/// Largest canvas width or height accepted from a manifest or `--size`.
pub const MAX_CANVAS_DIMENSION: u32 = 16384;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlaygroundManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Vertex shader path; the built-in point-sprite shader when absent.
    #[serde(default)]
    pub vertex: Option<PathBuf>,
    pub fragment: PathBuf,
    /// Directory whose files are registered as includes by relative path.
    #[serde(default)]
    pub include_dir: Option<PathBuf>,
    #[serde(default)]
    pub canvas: CanvasSize,
    /// Explicit include name to file, relative to the pack root.
    #[serde(default)]
    pub includes: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub textures: Vec<TextureEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TextureEntry {
    /// Path relative to the pack root, or an `http(s)` URL.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_s: Option<WrapSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_t: Option<WrapSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<MinFilterSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<MagFilterSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip_y: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WrapSetting {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MinFilterSetting {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MagFilterSetting {
    Nearest,
    Linear,
}

impl PlaygroundManifest {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.fragment.as_os_str().is_empty() {
            issues.push("fragment shader path must not be empty".to_string());
        }
        if let Some(vertex) = &self.vertex {
            if vertex.as_os_str().is_empty() {
                issues.push("vertex shader path must not be empty when set".to_string());
            }
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            issues.push(format!(
                "canvas must be at least 1x1 (got {}x{})",
                self.canvas.width, self.canvas.height
            ));
        } else if self.canvas.width > MAX_CANVAS_DIMENSION
            || self.canvas.height > MAX_CANVAS_DIMENSION
        {
            issues.push(format!(
                "canvas must be at most {MAX_CANVAS_DIMENSION} pixels per side (got {}x{})",
                self.canvas.width, self.canvas.height
            ));
        }
        if self.textures.len() > MAX_TEXTURES {
            issues.push(format!(
                "{} textures declared; at most {MAX_TEXTURES} channels are supported",
                self.textures.len()
            ));
        }
        for (index, texture) in self.textures.iter().enumerate() {
            if texture.path.trim().is_empty() {
                issues.push(format!("texture {index} has an empty path"));
            }
        }
        for (name, path) in &self.includes {
            if name.trim().is_empty() {
                issues.push(format!(
                    "include mapped to '{}' has an empty name",
                    path.display()
                ));
            }
        }
        issues
    }
}
