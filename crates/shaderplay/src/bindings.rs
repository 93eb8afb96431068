use anyhow::{Context, Result};
use playground::{LocalPack, MagFilterSetting, MinFilterSetting, TextureEntry, WrapSetting};
use renderer::{
    CanvasInfo, IncludeDepth, MagFilter, MinFilter, ProgramConfig, TextureDescriptor, WrapMode,
};

use crate::cli::PackArgs;

/// Builds the renderer configuration for `pack`, applying CLI overrides.
pub fn program_config(pack: &LocalPack, args: &PackArgs) -> Result<ProgramConfig> {
    let vertex = pack
        .vertex_source()
        .context("failed to read vertex shader")?;
    let fragment = pack
        .fragment_source()
        .context("failed to read fragment shader")?;
    let includes = pack
        .include_map()
        .context("failed to read include fragments")?;

    Ok(ProgramConfig::new(vertex, fragment)
        .with_canvas(canvas_info(pack, args))
        .with_includes(includes)
        .with_include_depth(include_depth(args.nested_includes))
        .with_textures(texture_descriptors(pack)))
}

pub fn canvas_info(pack: &LocalPack, args: &PackArgs) -> CanvasInfo {
    let (width, height) = args
        .size
        .unwrap_or((pack.canvas().width, pack.canvas().height));
    CanvasInfo::new(width, height).with_pixel_ratio(args.pixel_ratio)
}

pub fn include_depth(nested: Option<usize>) -> IncludeDepth {
    match nested {
        Some(levels) if levels > 1 => IncludeDepth::Nested(levels),
        _ => IncludeDepth::SinglePass,
    }
}

pub fn texture_descriptors(pack: &LocalPack) -> Vec<TextureDescriptor> {
    pack.textures()
        .iter()
        .map(|entry| texture_descriptor(pack, entry))
        .collect()
}

fn texture_descriptor(pack: &LocalPack, entry: &TextureEntry) -> TextureDescriptor {
    let locator = pack.texture_locator(entry);
    if !renderer::is_remote_locator(&locator) && !std::path::Path::new(&locator).exists() {
        tracing::warn!(path = %locator, "channel texture not found on disk");
    }
    TextureDescriptor {
        locator,
        wrap_s: entry.wrap_s.map(map_wrap),
        wrap_t: entry.wrap_t.map(map_wrap),
        min_filter: entry.min_filter.map(map_min_filter),
        mag_filter: entry.mag_filter.map(map_mag_filter),
        flip_y: entry.flip_y,
    }
}

pub fn map_wrap(wrap: WrapSetting) -> WrapMode {
    match wrap {
        WrapSetting::Repeat => WrapMode::Repeat,
        WrapSetting::ClampToEdge => WrapMode::ClampToEdge,
        WrapSetting::MirroredRepeat => WrapMode::MirroredRepeat,
    }
}

pub fn map_min_filter(filter: MinFilterSetting) -> MinFilter {
    match filter {
        MinFilterSetting::Nearest => MinFilter::Nearest,
        MinFilterSetting::Linear => MinFilter::Linear,
        MinFilterSetting::NearestMipmapNearest => MinFilter::NearestMipmapNearest,
        MinFilterSetting::LinearMipmapNearest => MinFilter::LinearMipmapNearest,
        MinFilterSetting::NearestMipmapLinear => MinFilter::NearestMipmapLinear,
        MinFilterSetting::LinearMipmapLinear => MinFilter::LinearMipmapLinear,
    }
}

pub fn map_mag_filter(filter: MagFilterSetting) -> MagFilter {
    match filter {
        MagFilterSetting::Nearest => MagFilter::Nearest,
        MagFilterSetting::Linear => MagFilter::Linear,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn pack_args(size: Option<(u32, u32)>) -> PackArgs {
        PackArgs {
            pack: "demo".into(),
            size,
            pixel_ratio: 2.0,
            nested_includes: None,
        }
    }

    fn load_pack(manifest: &str) -> (tempfile::TempDir, LocalPack) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("playground.toml"), manifest).unwrap();
        fs::write(dir.path().join("frag.glsl"), "void main() {}").unwrap();
        let pack = LocalPack::load(dir.path()).unwrap();
        (dir, pack)
    }

    #[test]
    fn descriptors_keep_unset_options_unset() {
        let (dir, pack) = load_pack(
            r#"
fragment = "frag.glsl"

[[textures]]
path = "images/a.png"
wrap_s = "clamp-to-edge"
wrap_t = "clamp-to-edge"
min_filter = "linear"

[[textures]]
path = "https://example.com/b.jpg"
flip_y = false
"#,
        );
        let descriptors = texture_descriptors(&pack);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(
            descriptors[0],
            TextureDescriptor {
                locator: dir.path().join("images/a.png").to_string_lossy().into_owned(),
                wrap_s: Some(WrapMode::ClampToEdge),
                wrap_t: Some(WrapMode::ClampToEdge),
                min_filter: Some(MinFilter::Linear),
                mag_filter: None,
                flip_y: None,
            }
        );
        assert_eq!(
            descriptors[1],
            TextureDescriptor::new("https://example.com/b.jpg").with_flip_y(false)
        );
    }

    #[test]
    fn size_override_replaces_manifest_canvas() {
        let (_dir, pack) = load_pack("fragment = \"frag.glsl\"\n[canvas]\nwidth = 320\nheight = 200\n");
        assert_eq!(
            canvas_info(&pack, &pack_args(None)),
            CanvasInfo::new(320, 200).with_pixel_ratio(2.0)
        );
        assert_eq!(
            canvas_info(&pack, &pack_args(Some((64, 32)))),
            CanvasInfo::new(64, 32).with_pixel_ratio(2.0)
        );
    }

    #[test]
    fn nested_includes_need_more_than_one_level() {
        assert_eq!(include_depth(None), IncludeDepth::SinglePass);
        assert_eq!(include_depth(Some(1)), IncludeDepth::SinglePass);
        assert_eq!(include_depth(Some(4)), IncludeDepth::Nested(4));
    }
}
