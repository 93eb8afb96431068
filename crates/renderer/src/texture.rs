//! Asynchronous image-to-texture loading.
//!
//! A load allocates its texture immediately and fills it with one opaque
//! black texel so the sampler is usable while the image is fetched. Fetching,
//! decoding and power-of-two resampling run on a worker thread; the GL-side
//! upload happens when the owner polls the [`PendingTexture`] on the GL
//! thread.

use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::error::TextureError;
use crate::fetch::SharedFetcher;
use crate::gl::GlContext;
use crate::types::{LoadedTexture, TextureDescriptor, TextureParameter, WrapMode};

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".bmp"];
const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".3gp", ".webm", ".ogv"];
const PLACEHOLDER_TEXEL: [u8; 4] = [0, 0, 0, 255];

/// Media class inferred from a locator's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    Image,
    Video,
    Unknown,
}

pub fn classify_locator(locator: &str) -> LocatorKind {
    let lower = locator.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        LocatorKind::Image
    } else if VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        LocatorKind::Video
    } else {
        LocatorKind::Unknown
    }
}

/// Rejects descriptors the loader cannot service. Nothing is allocated for a
/// rejected descriptor.
pub fn validate_descriptor(descriptor: &TextureDescriptor) -> Result<(), TextureError> {
    let locator = descriptor.locator.clone();
    match classify_locator(&descriptor.locator) {
        LocatorKind::Image => Ok(()),
        LocatorKind::Video => Err(TextureError::UnsupportedMedia { locator }),
        LocatorKind::Unknown => Err(TextureError::UnsupportedFormat { locator }),
    }
}

/// Whether sampling with these parameters requires power-of-two dimensions
/// on WebGL1-class contexts: anything other than clamp-to-edge on both axes
/// with a non-mipmapped minification filter.
pub fn needs_power_of_two(descriptor: &TextureDescriptor) -> bool {
    descriptor.wrap_s() != WrapMode::ClampToEdge
        || descriptor.wrap_t() != WrapMode::ClampToEdge
        || descriptor.min_filter().uses_mipmaps()
}

pub fn needs_mipmaps(descriptor: &TextureDescriptor, power_of_two: bool) -> bool {
    power_of_two && descriptor.min_filter().uses_mipmaps()
}

pub fn is_power_of_two(value: u32) -> bool {
    value.is_power_of_two()
}

/// Largest power of two not above `value` (1 for 0).
pub fn floor_power_of_two(value: u32) -> u32 {
    if value == 0 {
        return 1;
    }
    1 << (31 - value.leading_zeros())
}

/// Decoded pixels ready for upload.
#[derive(Debug)]
pub struct PreparedImage {
    /// Dimensions of the decoded image before resampling.
    pub original: (u32, u32),
    pub pixels: RgbaImage,
    pub power_of_two: bool,
}

/// Converts to RGBA8 and, when the descriptor's sampling needs it, resamples
/// each axis down to the nearest power of two.
pub fn prepare_image(image: DynamicImage, descriptor: &TextureDescriptor) -> PreparedImage {
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let already_power_of_two = is_power_of_two(width) && is_power_of_two(height);

    if already_power_of_two || !needs_power_of_two(descriptor) {
        return PreparedImage {
            original: (width, height),
            pixels: rgba,
            power_of_two: already_power_of_two,
        };
    }

    let target = (floor_power_of_two(width), floor_power_of_two(height));
    tracing::warn!(
        locator = %descriptor.locator,
        width,
        height,
        resized_width = target.0,
        resized_height = target.1,
        "image is not power of two; resampling"
    );
    let pixels = imageops::resize(&rgba, target.0, target.1, FilterType::Triangle);
    PreparedImage {
        original: (width, height),
        pixels,
        power_of_two: true,
    }
}

type WorkerResult = Result<PreparedImage, String>;

/// Texture whose image is still being fetched.
pub struct PendingTexture<T> {
    index: usize,
    descriptor: TextureDescriptor,
    texture: T,
    receiver: Receiver<WorkerResult>,
    finished: bool,
}

/// Validates `descriptor`, allocates the texture with its placeholder texel
/// and starts fetching on a worker thread named after the channel index.
pub fn begin_load<G: GlContext>(
    gl: &G,
    index: usize,
    descriptor: TextureDescriptor,
    fetcher: SharedFetcher,
) -> Result<PendingTexture<G::Texture>, TextureError> {
    validate_descriptor(&descriptor)?;

    let texture = gl.create_texture().map_err(TextureError::TextureCreation)?;
    gl.bind_texture_2d(Some(texture));
    gl.tex_image_2d_rgba(1, 1, &PLACEHOLDER_TEXEL);

    let (sender, receiver) = bounded(1);
    let locator = descriptor.locator.clone();
    let worker_descriptor = descriptor.clone();
    let spawned = thread::Builder::new()
        .name(format!("texture-loader-{index}"))
        .spawn(move || {
            let result = fetcher
                .fetch(&worker_descriptor.locator)
                .map(|image| prepare_image(image, &worker_descriptor))
                .map_err(|err| format!("{err:#}"));
            let _ = sender.send(result);
        });
    if let Err(err) = spawned {
        return Err(TextureError::ImageLoad {
            locator,
            reason: format!("failed to spawn loader thread: {err}"),
        });
    }

    tracing::debug!(index, %locator, "texture load started");
    Ok(PendingTexture {
        index,
        descriptor,
        texture,
        receiver,
        finished: false,
    })
}

impl<T: Copy> PendingTexture<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn locator(&self) -> &str {
        &self.descriptor.locator
    }

    pub fn texture(&self) -> T {
        self.texture
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Uploads the image if the worker has delivered it. Yields the outcome
    /// exactly once; later calls return `Ok(None)`.
    pub fn poll<G>(&mut self, gl: &G) -> Result<Option<LoadedTexture<T>>, TextureError>
    where
        G: GlContext<Texture = T>,
    {
        if self.finished {
            return Ok(None);
        }
        match self.receiver.try_recv() {
            Ok(result) => self.complete(gl, result).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Err(TextureError::LoaderDisconnected {
                    locator: self.descriptor.locator.clone(),
                })
            }
        }
    }

    /// Blocks until the worker delivers or `deadline` passes (`Ok(None)`).
    pub fn wait<G>(
        &mut self,
        gl: &G,
        deadline: Instant,
    ) -> Result<Option<LoadedTexture<T>>, TextureError>
    where
        G: GlContext<Texture = T>,
    {
        if self.finished {
            return Ok(None);
        }
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => self.complete(gl, result).map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                Err(TextureError::LoaderDisconnected {
                    locator: self.descriptor.locator.clone(),
                })
            }
        }
    }

    fn complete<G>(&mut self, gl: &G, result: WorkerResult) -> Result<LoadedTexture<T>, TextureError>
    where
        G: GlContext<Texture = T>,
    {
        self.finished = true;
        let prepared = result.map_err(|reason| TextureError::ImageLoad {
            locator: self.descriptor.locator.clone(),
            reason,
        })?;

        let (upload_width, upload_height) = prepared.pixels.dimensions();
        gl.bind_texture_2d(Some(self.texture));
        gl.set_unpack_flip_y(self.descriptor.flip_y());
        gl.tex_image_2d_rgba(upload_width, upload_height, prepared.pixels.as_raw());

        if needs_mipmaps(&self.descriptor, prepared.power_of_two) {
            gl.generate_mipmap_2d();
        }

        gl.tex_parameter(TextureParameter::WrapS(self.descriptor.wrap_s()));
        gl.tex_parameter(TextureParameter::WrapT(self.descriptor.wrap_t()));
        gl.tex_parameter(TextureParameter::MinFilter(self.descriptor.min_filter()));
        gl.tex_parameter(TextureParameter::MagFilter(self.descriptor.mag_filter()));

        let (width, height) = prepared.original;
        tracing::info!(
            index = self.index,
            locator = %self.descriptor.locator,
            width,
            height,
            "texture uploaded"
        );
        Ok(LoadedTexture {
            width,
            height,
            texture: self.texture,
        })
    }
}
