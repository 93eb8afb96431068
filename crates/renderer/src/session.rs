use std::time::{Duration, Instant};

use crate::channels::{ChannelJoin, JoinState, ReadyCallback};
use crate::error::BootstrapError;
use crate::fetch::SharedFetcher;
use crate::frame::{FrameDriver, FrameHandle, FrameStatus};
use crate::gl::GlContext;
use crate::inspect::log_region;
use crate::preprocess::{IncludeDepth, IncludeMap};
use crate::program::{build_program, ProgramSources};
use crate::runtime::BoxedTimeSource;
use crate::types::{CanvasInfo, PixelRegion, TextureDescriptor};

/// Everything a bootstrap needs besides the context itself.
pub struct ProgramConfig {
    pub canvas: CanvasInfo,
    pub vertex_source: String,
    pub fragment_source: String,
    /// Descriptor `i` becomes `iChannel<i>`.
    pub textures: Vec<TextureDescriptor>,
    pub includes: IncludeMap,
    pub include_depth: IncludeDepth,
    /// Runs once, right before samplers are bound, if every texture loads.
    pub on_textures_ready: Option<ReadyCallback>,
}

impl ProgramConfig {
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            canvas: CanvasInfo::default(),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            textures: Vec::new(),
            includes: IncludeMap::new(),
            include_depth: IncludeDepth::default(),
            on_textures_ready: None,
        }
    }

    pub fn with_canvas(mut self, canvas: CanvasInfo) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_textures(mut self, textures: Vec<TextureDescriptor>) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_includes(mut self, includes: IncludeMap) -> Self {
        self.includes = includes;
        self
    }

    pub fn with_include_depth(mut self, depth: IncludeDepth) -> Self {
        self.include_depth = depth;
        self
    }

    /// Runs once every channel is bound. With no textures it runs during
    /// bootstrap, right after the first frame.
    pub fn on_textures_ready(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_textures_ready = Some(Box::new(callback));
        self
    }
}

/// A bootstrapped program plus its frame driver and texture channels.
///
/// Hosts call [`Session::frame`] once per display refresh on the GL thread.
pub struct Session<G: GlContext> {
    gl: G,
    program: G::Program,
    canvas: CanvasInfo,
    driver: FrameDriver<G>,
    channels: Option<ChannelJoin<G::Texture>>,
}

impl<G: GlContext> Session<G> {
    /// Builds the program, draws the first frame and starts loading textures.
    /// Only program construction can fail; texture failures surface through
    /// [`Session::channels`].
    pub fn bootstrap(
        gl: G,
        config: ProgramConfig,
        fetcher: SharedFetcher,
        time_source: BoxedTimeSource,
    ) -> Result<Self, BootstrapError> {
        let ProgramConfig {
            canvas,
            vertex_source,
            fragment_source,
            textures,
            includes,
            include_depth,
            on_textures_ready,
        } = config;

        let sources = ProgramSources {
            vertex: &vertex_source,
            fragment: &fragment_source,
        };
        let program = build_program(&gl, &sources, canvas, &includes, include_depth)?;

        let mut driver = FrameDriver::start(&gl, program, time_source);
        driver.tick(&gl);

        let channels = if textures.is_empty() {
            if let Some(callback) = on_textures_ready {
                callback();
            }
            None
        } else {
            Some(ChannelJoin::start(
                &gl,
                textures,
                fetcher,
                canvas.pixel_ratio,
                on_textures_ready,
            ))
        };

        Ok(Self {
            gl,
            program,
            canvas,
            driver,
            channels,
        })
    }

    /// Advances texture loading, then draws one frame unless stopped.
    pub fn frame(&mut self) -> FrameStatus {
        if let Some(channels) = self.channels.as_mut() {
            channels.poll(&self.gl, self.program);
        }
        self.driver.tick(&self.gl)
    }

    /// Blocks until every channel settles or `timeout` elapses. `None` when
    /// the session has no textures.
    pub fn wait_for_textures(&mut self, timeout: Duration) -> Option<&JoinState<G::Texture>> {
        let deadline = Instant::now() + timeout;
        let channels = self.channels.as_mut()?;
        Some(channels.wait(&self.gl, self.program, deadline))
    }

    pub fn inspect(&self, region: PixelRegion) -> Vec<[u8; 4]> {
        log_region(&self.gl, region)
    }

    pub fn frame_handle(&self) -> FrameHandle {
        self.driver.handle()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.driver.frames_drawn()
    }

    pub fn channels(&self) -> Option<&JoinState<G::Texture>> {
        self.channels.as_ref().map(ChannelJoin::state)
    }

    pub fn program(&self) -> G::Program {
        self.program
    }

    pub fn canvas(&self) -> CanvasInfo {
        self.canvas
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }
}
