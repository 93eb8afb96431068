use crate::error::BootstrapError;
use crate::types::GlApiVersion;

/// Something that can hand out a GL context for a requested API version.
///
/// Returning `None` means the surface does not support that version; the
/// acquirer then moves on to the next one.
pub trait DrawableSurface {
    type Context;

    fn create_context(&self, version: GlApiVersion) -> Option<Self::Context>;
}

/// Context obtained from a surface together with the API it speaks.
#[derive(Debug)]
pub struct AcquiredContext<C> {
    pub context: C,
    pub version: GlApiVersion,
}

/// Requests contexts newest API first, falling back in
/// [`GlApiVersion::PREFERENCE`] order.
pub fn acquire_context<S: DrawableSurface>(
    surface: &S,
) -> Result<AcquiredContext<S::Context>, BootstrapError> {
    acquire_context_from(surface, &GlApiVersion::PREFERENCE)
}

/// Same as [`acquire_context`] with an explicit list of versions to try.
pub fn acquire_context_from<S: DrawableSurface>(
    surface: &S,
    versions: &[GlApiVersion],
) -> Result<AcquiredContext<S::Context>, BootstrapError> {
    for &version in versions {
        match surface.create_context(version) {
            Some(context) => {
                tracing::debug!(%version, "acquired graphics context");
                return Ok(AcquiredContext { context, version });
            }
            None => tracing::debug!(%version, "graphics context unavailable"),
        }
    }
    Err(BootstrapError::ContextNotSupported {
        tried: versions.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::gl::HeadlessSurface;

    struct CountingSurface {
        supported: Vec<GlApiVersion>,
        requests: RefCell<Vec<GlApiVersion>>,
    }

    impl DrawableSurface for CountingSurface {
        type Context = GlApiVersion;

        fn create_context(&self, version: GlApiVersion) -> Option<GlApiVersion> {
            self.requests.borrow_mut().push(version);
            self.supported.contains(&version).then_some(version)
        }
    }

    #[test]
    fn newest_version_wins_when_available() {
        let surface = HeadlessSurface::new();
        let acquired = acquire_context(&surface).unwrap();
        assert_eq!(acquired.version, GlApiVersion::Gles3);
        assert_eq!(acquired.context.version(), GlApiVersion::Gles3);
    }

    #[test]
    fn falls_back_to_older_version() {
        let surface = CountingSurface {
            supported: vec![GlApiVersion::Gles2],
            requests: RefCell::new(Vec::new()),
        };
        let acquired = acquire_context(&surface).unwrap();
        assert_eq!(acquired.version, GlApiVersion::Gles2);
        assert_eq!(
            *surface.requests.borrow(),
            vec![GlApiVersion::Gles3, GlApiVersion::Gles2]
        );
    }

    #[test]
    fn stops_asking_after_first_success() {
        let surface = CountingSurface {
            supported: vec![GlApiVersion::Gles3, GlApiVersion::Gles2],
            requests: RefCell::new(Vec::new()),
        };
        acquire_context(&surface).unwrap();
        assert_eq!(*surface.requests.borrow(), vec![GlApiVersion::Gles3]);
    }

    #[test]
    fn no_supported_version_is_an_error() {
        let surface = HeadlessSurface::with_versions(&[]);
        let err = acquire_context(&surface).unwrap_err();
        match err {
            BootstrapError::ContextNotSupported { tried } => {
                assert_eq!(tried, GlApiVersion::PREFERENCE.to_vec())
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
