use std::path::Path;

use anyhow::{Context, Result};
use playground::LocalPack;
use renderer::{expand_includes_with, ShaderStage};
use tracing_subscriber::EnvFilter;

use crate::bindings::include_depth;
use crate::cli::{PreprocessArgs, RunArgs};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "window")]
pub fn run(root: &Path, args: RunArgs) -> Result<()> {
    use std::sync::Arc;

    use renderer::{format_pixels, run_window, DefaultFetcher, GlApiVersion, WindowOptions};

    use crate::bindings::program_config;

    let pack = LocalPack::load(root)
        .with_context(|| format!("failed to load playground pack at {}", root.display()))?;
    let config = program_config(&pack, &args.pack)?;
    let fetcher = DefaultFetcher::new(pack.root()).context("failed to prepare image fetcher")?;

    let versions = if args.gles2_only {
        vec![GlApiVersion::Gles2]
    } else {
        GlApiVersion::PREFERENCE.to_vec()
    };
    let options = WindowOptions {
        title: format!("shaderplay - {}", pack.name()),
        inspect: args.inspect,
        run_for: args.duration,
        vsync: !args.no_vsync,
        versions,
    };
    tracing::info!(
        pack = %pack.name(),
        root = %pack.root().display(),
        width = config.canvas.width,
        height = config.canvas.height,
        textures = config.textures.len(),
        "opening preview window"
    );

    let summary = run_window(options, config, Arc::new(fetcher))?;
    tracing::info!(
        version = %summary.version,
        frames = summary.frames_drawn,
        "preview window closed"
    );
    if let Some(pixels) = &summary.inspected {
        println!("{}", format_pixels(pixels));
    }
    Ok(())
}

#[cfg(not(feature = "window"))]
pub fn run(_root: &Path, _args: RunArgs) -> Result<()> {
    anyhow::bail!("shaderplay was built without the `window` feature; use `shaderplay check`")
}

/// Source of `args.stage` with includes expanded.
pub fn preprocess(root: &Path, args: &PreprocessArgs) -> Result<String> {
    let pack = LocalPack::load(root)
        .with_context(|| format!("failed to load playground pack at {}", root.display()))?;
    let source = match args.stage {
        ShaderStage::Vertex => pack.vertex_source(),
        ShaderStage::Fragment => pack.fragment_source(),
    }
    .with_context(|| format!("failed to read {} shader", args.stage))?;
    let includes = pack
        .include_map()
        .context("failed to read include fragments")?;
    let expanded = expand_includes_with(&source, &includes, include_depth(args.nested_includes))
        .with_context(|| format!("failed to preprocess {} shader", args.stage))?;
    Ok(expanded)
}

pub fn print_paths(paths: &AppPaths) {
    println!("Data directory:");
    println!("  {}", paths.data_dir().display());
    println!("Pack search roots:");
    for root in paths.pack_roots() {
        let marker = if root.is_dir() { "" } else { " (missing)" };
        println!("  {}{marker}", root.display());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_pack(dir: &Path) {
        fs::write(
            dir.join("playground.toml"),
            "fragment = \"frag.glsl\"\ninclude_dir = \"includes\"\n",
        )
        .unwrap();
        fs::create_dir_all(dir.join("includes")).unwrap();
        fs::write(
            dir.join("includes/tint.glsl"),
            "vec4 tint(vec4 c) { return c; }",
        )
        .unwrap();
        fs::write(
            dir.join("frag.glsl"),
            "#include <tint.glsl>\nvoid main() {}\n",
        )
        .unwrap();
    }

    #[test]
    fn preprocess_expands_pack_includes() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path());
        let args = PreprocessArgs {
            pack: "demo".into(),
            stage: ShaderStage::Fragment,
            nested_includes: None,
        };

        let expanded = preprocess(dir.path(), &args).unwrap();
        assert_eq!(
            expanded,
            "\n// #include-start<tint.glsl>\nvec4 tint(vec4 c) { return c; }\n// #include-end<tint.glsl>\n\nvoid main() {}\n"
        );
    }

    #[test]
    fn preprocess_vertex_defaults_to_builtin_shader() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path());
        let args = PreprocessArgs {
            pack: "demo".into(),
            stage: ShaderStage::Vertex,
            nested_includes: None,
        };
        assert_eq!(
            preprocess(dir.path(), &args).unwrap(),
            playground::DEFAULT_VERTEX_SHADER
        );
    }
}
