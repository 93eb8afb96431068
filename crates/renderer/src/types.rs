use std::fmt;

/// Uniform carrying the canvas size in pixels (`vec2`).
pub const RESOLUTION_UNIFORM: &str = "iResolution";
/// Uniform carrying elapsed seconds since the frame driver started (`float`).
pub const TIME_UNIFORM: &str = "iTime";

/// Sampler uniform name for the texture at `index` (`iChannel0`, `iChannel1`, ...).
pub fn channel_uniform(index: usize) -> String {
    format!("iChannel{index}")
}

/// Element of the optional `vec3 iChannelResolution[N]` array for `index`.
pub fn channel_resolution_uniform(index: usize) -> String {
    format!("iChannelResolution[{index}]")
}

/// GL API generation obtained from a drawable surface.
///
/// `Gles3` is the WebGL2-class API and is always requested first; `Gles2` is
/// the WebGL1-class fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlApiVersion {
    Gles3,
    Gles2,
}

impl GlApiVersion {
    /// Versions in the order the context acquirer tries them.
    pub const PREFERENCE: [GlApiVersion; 2] = [GlApiVersion::Gles3, GlApiVersion::Gles2];

    pub fn major(self) -> u8 {
        match self {
            GlApiVersion::Gles3 => 3,
            GlApiVersion::Gles2 => 2,
        }
    }
}

impl fmt::Display for GlApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlApiVersion::Gles3 => f.write_str("gles3"),
            GlApiVersion::Gles2 => f.write_str("gles2"),
        }
    }
}

/// Shader stage of a compiled shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Texture coordinate wrapping along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

impl WrapMode {
    pub fn gl_enum(self) -> u32 {
        match self {
            WrapMode::Repeat => 10497,
            WrapMode::ClampToEdge => 33071,
            WrapMode::MirroredRepeat => 33648,
        }
    }
}

/// Minification filter. Everything except `Nearest` and `Linear` samples
/// from a mipmap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    #[default]
    LinearMipmapLinear,
}

impl MinFilter {
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }

    pub fn gl_enum(self) -> u32 {
        match self {
            MinFilter::Nearest => 9728,
            MinFilter::Linear => 9729,
            MinFilter::NearestMipmapNearest => 9984,
            MinFilter::LinearMipmapNearest => 9985,
            MinFilter::NearestMipmapLinear => 9986,
            MinFilter::LinearMipmapLinear => 9987,
        }
    }
}

/// Magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagFilter {
    Nearest,
    #[default]
    Linear,
}

impl MagFilter {
    pub fn gl_enum(self) -> u32 {
        match self {
            MagFilter::Nearest => 9728,
            MagFilter::Linear => 9729,
        }
    }
}

/// A single `texParameteri` applied to the bound 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureParameter {
    WrapS(WrapMode),
    WrapT(WrapMode),
    MinFilter(MinFilter),
    MagFilter(MagFilter),
}

/// Request to load one image and expose it as `iChannel<index>`.
///
/// Every field except `locator` is optional; the accessors apply the
/// defaults (repeat wrapping, trilinear minification, linear magnification,
/// vertical flip enabled).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureDescriptor {
    /// File path or `http(s)` URL of the image.
    pub locator: String,
    pub wrap_s: Option<WrapMode>,
    pub wrap_t: Option<WrapMode>,
    pub min_filter: Option<MinFilter>,
    pub mag_filter: Option<MagFilter>,
    pub flip_y: Option<bool>,
}

impl TextureDescriptor {
    /// Descriptor with every sampling option left at its default.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            ..Self::default()
        }
    }

    pub fn with_wrap(mut self, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        self.wrap_s = Some(wrap_s);
        self.wrap_t = Some(wrap_t);
        self
    }

    pub fn with_filters(mut self, min_filter: MinFilter, mag_filter: MagFilter) -> Self {
        self.min_filter = Some(min_filter);
        self.mag_filter = Some(mag_filter);
        self
    }

    pub fn with_flip_y(mut self, flip_y: bool) -> Self {
        self.flip_y = Some(flip_y);
        self
    }

    pub fn wrap_s(&self) -> WrapMode {
        self.wrap_s.unwrap_or_default()
    }

    pub fn wrap_t(&self) -> WrapMode {
        self.wrap_t.unwrap_or_default()
    }

    pub fn min_filter(&self) -> MinFilter {
        self.min_filter.unwrap_or_default()
    }

    pub fn mag_filter(&self) -> MagFilter {
        self.mag_filter.unwrap_or_default()
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y.unwrap_or(true)
    }
}

/// Pixel dimensions of the drawable canvas, fixed at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasInfo {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio applied to `iChannelResolution`.
    pub pixel_ratio: f32,
}

impl CanvasInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }
}

impl Default for CanvasInfo {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Texture produced by a completed load. `width`/`height` are the
/// dimensions of the decoded image before any power-of-two resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedTexture<T> {
    pub width: u32,
    pub height: u32,
    pub texture: T,
}

/// Rectangular framebuffer region read by the pixel inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    /// A single pixel at `(x, y)`.
    pub fn point(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            width: 1,
            height: 1,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
