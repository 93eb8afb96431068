use thiserror::Error;

use crate::types::{GlApiVersion, ShaderStage};

/// Failures raised while turning sources into a linked, running program.
///
/// All of these are fatal for the bootstrap call that produced them; the
/// caller decides whether to restart.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("no supported graphics context (tried {tried:?})")]
    ContextNotSupported { tried: Vec<GlApiVersion> },

    #[error("program not created: {0}")]
    ProgramCreation(String),

    #[error("{stage} shader not created: {reason}")]
    ShaderCreation { stage: ShaderStage, reason: String },

    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link: {log}")]
    ProgramLink { log: String },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("can not resolve #include <{name}>")]
    UnresolvedInclude { name: String },

    #[error("#include cycle: {}", chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },

    #[error("#include <{name}> nested deeper than {max} levels")]
    IncludeDepthExceeded { name: String, max: usize },
}

/// Failure of a single texture load. Cloneable so a channel join can keep
/// the first failure while still reporting it to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("expected an image or a video with a valid extension <{locator}>")]
    UnsupportedFormat { locator: String },

    #[error("video textures are not supported <{locator}>")]
    UnsupportedMedia { locator: String },

    #[error("failed loading url: {locator}: {reason}")]
    ImageLoad { locator: String, reason: String },

    #[error("texture not created: {0}")]
    TextureCreation(String),

    #[error("image loader for {locator} exited without a result")]
    LoaderDisconnected { locator: String },
}

impl TextureError {
    pub fn locator(&self) -> Option<&str> {
        match self {
            TextureError::UnsupportedFormat { locator }
            | TextureError::UnsupportedMedia { locator }
            | TextureError::ImageLoad { locator, .. }
            | TextureError::LoaderDisconnected { locator } => Some(locator),
            TextureError::TextureCreation(_) => None,
        }
    }
}
