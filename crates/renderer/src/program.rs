use crate::error::BootstrapError;
use crate::gl::GlContext;
use crate::preprocess::{expand_includes_with, IncludeDepth, IncludeMap};
use crate::types::{CanvasInfo, ShaderStage, RESOLUTION_UNIFORM};

/// Vertex and fragment sources before `#include` expansion.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSources<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// Sets the viewport, compiles and links the shader pair and uploads
/// `iResolution`. The returned program is active.
///
/// Compile status is checked for the vertex stage before the fragment stage,
/// so when both are broken the vertex diagnostic is reported. Every GL object
/// created before a failure is deleted before the error is returned.
pub fn build_program<G: GlContext>(
    gl: &G,
    sources: &ProgramSources<'_>,
    canvas: CanvasInfo,
    includes: &IncludeMap,
    depth: IncludeDepth,
) -> Result<G::Program, BootstrapError> {
    gl.viewport(0, 0, canvas.width as i32, canvas.height as i32);

    let program = gl.create_program().map_err(BootstrapError::ProgramCreation)?;
    let mut shaders = Vec::with_capacity(2);
    if let Err(err) = compile_and_link(gl, program, &mut shaders, sources, includes, depth) {
        for shader in shaders {
            gl.delete_shader(shader);
        }
        gl.use_program(None);
        gl.delete_program(program);
        tracing::debug!(error = %err, "released partially built program");
        return Err(err);
    }

    // Attached shaders stay alive until the program is deleted.
    for shader in shaders {
        gl.delete_shader(shader);
    }

    let resolution = gl.uniform_location(program, RESOLUTION_UNIFORM);
    gl.uniform_2_f32(
        resolution.as_ref(),
        canvas.width as f32,
        canvas.height as f32,
    );
    tracing::info!(
        width = canvas.width,
        height = canvas.height,
        "shader program linked"
    );
    Ok(program)
}

fn compile_and_link<G: GlContext>(
    gl: &G,
    program: G::Program,
    shaders: &mut Vec<G::Shader>,
    sources: &ProgramSources<'_>,
    includes: &IncludeMap,
    depth: IncludeDepth,
) -> Result<(), BootstrapError> {
    let vertex = create_shader(gl, ShaderStage::Vertex)?;
    shaders.push(vertex);
    let fragment = create_shader(gl, ShaderStage::Fragment)?;
    shaders.push(fragment);

    let vertex_source = expand_includes_with(sources.vertex, includes, depth)?;
    let fragment_source = expand_includes_with(sources.fragment, includes, depth)?;

    let stages = [
        (vertex, ShaderStage::Vertex, vertex_source.trim_start()),
        (fragment, ShaderStage::Fragment, fragment_source.trim_start()),
    ];
    for (shader, _, source) in stages {
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
    }
    for (shader, stage, _) in stages {
        if !gl.shader_compile_status(shader) {
            return Err(BootstrapError::ShaderCompile {
                stage,
                log: gl.shader_info_log(shader),
            });
        }
    }

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    gl.use_program(Some(program));
    if !gl.program_link_status(program) {
        return Err(BootstrapError::ProgramLink {
            log: gl.program_info_log(program),
        });
    }
    Ok(())
}

fn create_shader<G: GlContext>(gl: &G, stage: ShaderStage) -> Result<G::Shader, BootstrapError> {
    gl.create_shader(stage)
        .map_err(|reason| BootstrapError::ShaderCreation { stage, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessError;
    use crate::gl::{GlCall, HeadlessContext, HeadlessOptions};
    use crate::types::GlApiVersion;

    const VERTEX: &str = "uniform vec2 iResolution;\nvoid main() {\n  gl_Position = vec4(0.0, 0.0, 0.0, 1.0);\n  gl_PointSize = max(iResolution.x, iResolution.y);\n}\n";
    const FRAGMENT: &str = "precision mediump float;\nuniform vec2 iResolution;\nuniform float iTime;\nvoid main() {\n  gl_FragColor = vec4(gl_FragCoord.xy / iResolution, sin(iTime), 1.0);\n}\n";

    fn build(gl: &HeadlessContext, vertex: &str, fragment: &str) -> Result<u32, BootstrapError> {
        build_program(
            gl,
            &ProgramSources { vertex, fragment },
            CanvasInfo::new(320, 200),
            &IncludeMap::new(),
            IncludeDepth::SinglePass,
        )
    }

    #[test]
    fn builds_program_and_uploads_resolution() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let program = build(&gl, VERTEX, FRAGMENT).unwrap();
        assert!(gl.program_link_status(program));

        let calls = gl.calls();
        assert_eq!(
            calls[0],
            GlCall::Viewport {
                x: 0,
                y: 0,
                width: 320,
                height: 200
            }
        );
        assert_eq!(calls[1], GlCall::CreateProgram(program));
        assert!(calls.contains(&GlCall::UseProgram(Some(program))));
        assert_eq!(
            calls.last(),
            Some(&GlCall::Uniform2f {
                name: "iResolution".into(),
                x: 320.0,
                y: 200.0
            })
        );
        assert_eq!(gl.live_programs(), 1);
    }

    #[test]
    fn shaders_are_created_vertex_first() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        build(&gl, VERTEX, FRAGMENT).unwrap();
        let stages: Vec<ShaderStage> = gl
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                GlCall::CreateShader { stage, .. } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
    }

    #[test]
    fn fragment_syntax_error_is_reported_with_diagnostic() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let broken = "void main() {\n  gl_FragColor = vec4(1.0;\n}\n";
        let err = build(&gl, VERTEX, broken).unwrap_err();
        match err {
            BootstrapError::ShaderCompile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("syntax error"), "{log}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
        assert!(!gl
            .calls()
            .iter()
            .any(|call| matches!(call, GlCall::AttachShader { .. })));
    }

    #[test]
    fn vertex_failure_is_reported_before_fragment_failure() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let err = build(&gl, "void main() {", "void main() {").unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::ShaderCompile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn link_failure_carries_program_log() {
        let gl = HeadlessContext::with_options(
            GlApiVersion::Gles3,
            HeadlessOptions {
                link_failure: Some("ERROR: varying mismatch".into()),
                ..HeadlessOptions::default()
            },
        );
        let err = build(&gl, VERTEX, FRAGMENT).unwrap_err();
        match err {
            BootstrapError::ProgramLink { log } => assert_eq!(log, "ERROR: varying mismatch"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn program_creation_failure_allocates_nothing_else() {
        let gl = HeadlessContext::with_options(
            GlApiVersion::Gles2,
            HeadlessOptions {
                fail_program_creation: true,
                ..HeadlessOptions::default()
            },
        );
        let err = build(&gl, VERTEX, FRAGMENT).unwrap_err();
        assert!(matches!(err, BootstrapError::ProgramCreation(_)));
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn fragment_creation_failure_releases_vertex_shader() {
        let gl = HeadlessContext::with_options(
            GlApiVersion::Gles2,
            HeadlessOptions {
                fail_shader_creation: Some(ShaderStage::Fragment),
                ..HeadlessOptions::default()
            },
        );
        let err = build(&gl, VERTEX, FRAGMENT).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::ShaderCreation {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn unresolved_include_fails_before_compiling() {
        let gl = HeadlessContext::new(GlApiVersion::Gles2);
        let fragment = "#include <noise>\nvoid main() {}\n";
        let err = build(&gl, VERTEX, fragment).unwrap_err();
        match err {
            BootstrapError::Preprocess(PreprocessError::UnresolvedInclude { name }) => {
                assert_eq!(name, "noise")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!gl
            .calls()
            .iter()
            .any(|call| matches!(call, GlCall::CompileShader(_))));
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn expanded_sources_are_trimmed_so_version_stays_first() {
        let gl = HeadlessContext::new(GlApiVersion::Gles3);
        let includes: IncludeMap = [(
            "header".to_string(),
            "#version 300 es\nprecision highp float;".to_string(),
        )]
        .into_iter()
        .collect();
        let fragment = "#include <header>\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n";
        let vertex = "#include <header>\nvoid main() { gl_PointSize = 1.0; }\n";
        let program = build_program(
            &gl,
            &ProgramSources { vertex, fragment },
            CanvasInfo::new(4, 4),
            &includes,
            IncludeDepth::SinglePass,
        )
        .unwrap();
        assert!(gl.program_link_status(program));

        let sources: Vec<String> = gl
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                GlCall::ShaderSource { source, .. } => Some(source),
                _ => None,
            })
            .collect();
        assert_eq!(sources.len(), 2);
        for source in sources {
            assert!(source.starts_with("// #include-start<header>"), "{source}");
        }
    }
}
