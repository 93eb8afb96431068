//! On-disk playground packs: a directory with a `playground.toml` manifest,
//! GLSL sources, include fragments and the images bound to `iChannel<N>`.

pub mod manifest;
pub mod pack;

pub use manifest::{
    CanvasSize, MagFilterSetting, MinFilterSetting, PlaygroundManifest, TextureEntry, WrapSetting,
    MAX_CANVAS_DIMENSION, MAX_TEXTURES,
};
pub use pack::{LocalPack, PackError, DEFAULT_VERTEX_SHADER, MANIFEST_FILE};
