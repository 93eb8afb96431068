//! Load-by-locator image fetching.
//!
//! Fetchers run on texture worker threads, so implementations must be
//! `Send + Sync` and may block.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;

/// Resolves a locator (path or URL) to a decoded image.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, locator: &str) -> Result<DynamicImage>;
}

/// Shared fetcher handed to every texture worker.
pub type SharedFetcher = Arc<dyn ImageFetcher>;

/// True for `http://` and `https://` locators, scheme matched without case.
pub fn is_remote_locator(locator: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        locator
            .get(..scheme.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Reads files relative to `root` and, with the `http` feature, downloads
/// `http(s)` URLs.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    root: PathBuf,
    #[cfg(feature = "http")]
    http: reqwest::blocking::Client,
}

impl DefaultFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            #[cfg(feature = "http")]
            http: reqwest::blocking::Client::builder()
                .user_agent(concat!("shaderplay/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("building http client")?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    #[cfg(feature = "http")]
    fn download(&self, url: &str) -> Result<DynamicImage> {
        tracing::debug!(%url, "downloading texture");
        let bytes = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .context("texture request returned an error status")?
            .bytes()?;
        image::load_from_memory(&bytes).with_context(|| format!("decoding {url}"))
    }

    #[cfg(not(feature = "http"))]
    fn download(&self, url: &str) -> Result<DynamicImage> {
        Err(anyhow!("remote textures require the `http` feature ({url})"))
    }
}

impl ImageFetcher for DefaultFetcher {
    fn fetch(&self, locator: &str) -> Result<DynamicImage> {
        if is_remote_locator(locator) {
            return self.download(locator);
        }
        let path = self.resolve_path(locator);
        tracing::debug!(path = %path.display(), "reading texture");
        image::open(&path).with_context(|| format!("reading image {}", path.display()))
    }
}

/// In-memory images keyed by locator.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    images: HashMap<String, DynamicImage>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, locator: impl Into<String>, image: DynamicImage) -> Self {
        self.insert(locator, image);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, image: DynamicImage) {
        self.images.insert(locator.into(), image);
    }
}

impl ImageFetcher for MemoryFetcher {
    fn fetch(&self, locator: &str) -> Result<DynamicImage> {
        self.images
            .get(locator)
            .cloned()
            .ok_or_else(|| anyhow!("no image registered for {locator}"))
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    #[test]
    fn memory_fetcher_serves_registered_images() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 4])));
        let fetcher = MemoryFetcher::new().with_image("a.png", image);
        let loaded = fetcher.fetch("a.png").unwrap();
        assert_eq!((loaded.width(), loaded.height()), (2, 3));
        assert!(fetcher.fetch("b.png").is_err());
    }

    #[test]
    fn default_fetcher_resolves_relative_paths_against_root() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        std::fs::create_dir_all(dir.join("images")).unwrap();
        RgbaImage::from_pixel(3, 1, Rgba([9, 9, 9, 255]))
            .save(dir.join("images/strip.png"))
            .unwrap();

        let fetcher = DefaultFetcher::new(dir).unwrap();
        let loaded = fetcher.fetch("images/strip.png").unwrap();
        assert_eq!((loaded.width(), loaded.height()), (3, 1));
        assert!(fetcher.fetch("images/missing.png").is_err());
    }

    #[test]
    fn remote_locators_are_detected() {
        assert!(is_remote_locator("https://example.com/a.png"));
        assert!(is_remote_locator("http://example.com/a.png"));
        assert!(!is_remote_locator("images/a.png"));
    }

    #[test]
    fn remote_scheme_ignores_case() {
        assert!(is_remote_locator("HTTPS://example.com/a.png"));
        assert!(is_remote_locator("Http://example.com/a.png"));
        assert!(!is_remote_locator("HTTP:/a.png"));
        assert!(!is_remote_locator("ht"));
        assert!(!is_remote_locator("é"));
    }
}
