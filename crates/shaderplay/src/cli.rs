use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use playground::MAX_CANVAS_DIMENSION;
use renderer::{PixelRegion, ShaderStage};

use crate::paths::ENV_DATA_DIR;

#[derive(Parser, Debug)]
#[command(
    name = "shaderplay",
    author,
    version,
    about = "GLSL shader playground"
)]
pub struct Cli {
    /// Root holding installed packs under `packs/`.
    #[arg(long, global = true, env = ENV_DATA_DIR, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Preview a playground pack in a desktop window.
    Run(RunArgs),
    /// Bootstrap a pack on the headless context and report the outcome.
    Check(CheckArgs),
    /// Print a pack's shader source with includes expanded.
    Preprocess(PreprocessArgs),
    /// Print resolved data directories and pack search roots.
    Where,
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    /// Pack directory, or the name of a pack under `<data-dir>/packs`.
    #[arg(value_name = "PACK")]
    pub pack: String,

    /// Override the manifest canvas size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Device pixel ratio applied to `iChannelResolution`.
    #[arg(long, value_name = "RATIO", default_value_t = 1.0, value_parser = parse_pixel_ratio)]
    pub pixel_ratio: f32,

    /// Expand includes inside include fragments, up to this many levels.
    #[arg(long, value_name = "LEVELS")]
    pub nested_includes: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub pack: PackArgs,

    /// Log the pixels of this region once textures are bound (`X,Y` or `X,Y,W,H`).
    #[arg(long, value_name = "X,Y[,W,H]", value_parser = parse_region)]
    pub inspect: Option<PixelRegion>,

    /// Close the window after this long (e.g. `10s`, `2m`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Present frames as fast as possible instead of at display refresh.
    #[arg(long)]
    pub no_vsync: bool,

    /// Skip the GLES 3.0 context attempt.
    #[arg(long)]
    pub gles2_only: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub pack: PackArgs,

    /// Total frames to draw, including the bootstrap frame.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub frames: u64,

    /// Read back this region after the last frame (`X,Y` or `X,Y,W,H`).
    #[arg(long, value_name = "X,Y[,W,H]", value_parser = parse_region)]
    pub inspect: Option<PixelRegion>,

    /// How long to wait for channel textures.
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        default_value = "10s"
    )]
    pub timeout: Duration,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Pretend the surface only offers GLES 2.0.
    #[arg(long)]
    pub gles2_only: bool,
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    #[arg(value_name = "PACK")]
    pub pack: String,

    /// Which source to print: `vertex` or `fragment`.
    #[arg(long, value_name = "STAGE", value_parser = parse_stage, default_value = "fragment")]
    pub stage: ShaderStage,

    /// Expand includes inside include fragments, up to this many levels.
    #[arg(long, value_name = "LEVELS")]
    pub nested_includes: Option<usize>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be at least 1x1 (got {width}x{height})"));
    }
    if width > MAX_CANVAS_DIMENSION || height > MAX_CANVAS_DIMENSION {
        return Err(format!(
            "size must be at most {MAX_CANVAS_DIMENSION}x{MAX_CANVAS_DIMENSION} (got {width}x{height})"
        ));
    }
    Ok((width, height))
}

pub fn parse_region(value: &str) -> Result<PixelRegion, String> {
    let trimmed = value.trim();
    let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    if parts.len() != 2 && parts.len() != 4 {
        return Err(format!("invalid region '{trimmed}'; expected X,Y or X,Y,W,H"));
    }
    let x: i32 = parts[0]
        .parse()
        .map_err(|_| format!("invalid x coordinate '{}'", parts[0]))?;
    let y: i32 = parts[1]
        .parse()
        .map_err(|_| format!("invalid y coordinate '{}'", parts[1]))?;
    let region = PixelRegion::point(x, y);
    if parts.len() == 2 {
        return Ok(region);
    }
    let width: u32 = parts[2]
        .parse()
        .map_err(|_| format!("invalid region width '{}'", parts[2]))?;
    let height: u32 = parts[3]
        .parse()
        .map_err(|_| format!("invalid region height '{}'", parts[3]))?;
    Ok(region.with_size(width, height))
}

pub fn parse_pixel_ratio(value: &str) -> Result<f32, String> {
    let ratio: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid pixel ratio '{value}'"))?;
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err("pixel ratio must be a positive number".to_string());
    }
    Ok(ratio)
}

pub fn parse_stage(value: &str) -> Result<ShaderStage, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "vertex" | "vert" | "vs" => Ok(ShaderStage::Vertex),
        "fragment" | "frag" | "fs" => Ok(ShaderStage::Fragment),
        other => Err(format!(
            "unknown shader stage '{other}' (expected vertex or fragment)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn size_accepts_either_separator_case() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size(" 64X32 "), Ok((64, 32)));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("ax720").is_err());
    }

    #[test]
    fn size_rejects_oversized_canvases() {
        assert_eq!(parse_size("16384x16384"), Ok((16384, 16384)));
        let err = parse_size("100000x100000").unwrap_err();
        assert!(err.contains("at most 16384x16384"), "{err}");
        assert!(parse_size("64x16385").is_err());
    }

    #[test]
    fn region_defaults_to_a_single_pixel() {
        assert_eq!(parse_region("10,20"), Ok(PixelRegion::point(10, 20)));
        assert_eq!(
            parse_region("1, 2, 3, 4"),
            Ok(PixelRegion::point(1, 2).with_size(3, 4))
        );
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("x,2").is_err());
    }

    #[test]
    fn pixel_ratio_must_be_positive() {
        assert_eq!(parse_pixel_ratio("2"), Ok(2.0));
        assert!(parse_pixel_ratio("0").is_err());
        assert!(parse_pixel_ratio("-1.5").is_err());
        assert!(parse_pixel_ratio("fast").is_err());
    }

    #[test]
    fn stage_names() {
        assert_eq!(parse_stage("Vertex"), Ok(ShaderStage::Vertex));
        assert_eq!(parse_stage("frag"), Ok(ShaderStage::Fragment));
        assert!(parse_stage("compute").is_err());
    }

    #[test]
    fn check_arguments_parse() {
        let cli = Cli::try_parse_from([
            "shaderplay",
            "check",
            "demo",
            "--size",
            "64x64",
            "--frames",
            "3",
            "--inspect",
            "0,0",
            "--timeout",
            "500ms",
            "--json",
            "--gles2-only",
        ])
        .unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.pack.pack, "demo");
        assert_eq!(args.pack.size, Some((64, 64)));
        assert_eq!(args.frames, 3);
        assert_eq!(args.timeout, Duration::from_millis(500));
        assert!(args.json && args.gles2_only);
    }
}
