//! Renderer crate for shaderplay.
//!
//! Bootstraps a single-canvas GLSL playground on a GLES2/GLES3 context. The
//! overall flow is:
//!
//! ```text
//!   DrawableSurface ──▶ acquire_context ──▶ GlContext
//!                                              │ ProgramConfig
//!                                              ▼
//!   Session::bootstrap ──▶ build_program (expand_includes, compile, link)
//!          │            ──▶ FrameDriver::start ──▶ first draw
//!          │            ──▶ ChannelJoin::start ──▶ texture workers
//!          ▼
//!   Session::frame() per refresh ──▶ poll channels ──▶ iTime + draw
//! ```
//!
//! Everything above the `gl` module talks to the [`gl::GlContext`] trait, so
//! the same bootstrap runs on a real context through `glow` or on the
//! in-memory [`gl::HeadlessContext`].

pub mod channels;
pub mod context;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod gl;
pub mod inspect;
pub mod preprocess;
pub mod program;
pub mod runtime;
pub mod session;
pub mod texture;
pub mod types;
#[cfg(feature = "window")]
pub mod window;

pub use channels::{BoundChannel, ChannelJoin, JoinState, ReadyCallback};
pub use context::{acquire_context, acquire_context_from, AcquiredContext, DrawableSurface};
pub use error::{BootstrapError, PreprocessError, TextureError};
pub use fetch::{is_remote_locator, DefaultFetcher, ImageFetcher, MemoryFetcher, SharedFetcher};
pub use frame::{FrameDriver, FrameHandle, FrameStatus};
pub use gl::{GlContext, GlowContext, HeadlessContext, HeadlessOptions, HeadlessSurface};
pub use inspect::{format_pixels, log_region, read_region};
pub use preprocess::{expand_includes, expand_includes_with, IncludeDepth, IncludeMap};
pub use program::{build_program, ProgramSources};
pub use runtime::{
    BoxedTimeSource, FixedTimeSource, SteppedTimeSource, SystemTimeSource, TimeSample, TimeSource,
};
pub use session::{ProgramConfig, Session};
pub use texture::{begin_load, PendingTexture};
pub use types::{
    CanvasInfo, GlApiVersion, LoadedTexture, MagFilter, MinFilter, PixelRegion, ShaderStage,
    TextureDescriptor, WrapMode,
};
#[cfg(feature = "window")]
pub use window::{run_window, WindowOptions, WindowSummary};
