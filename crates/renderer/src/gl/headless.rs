//! Software stand-in for a GL context.
//!
//! `HeadlessContext` does not rasterize. It keeps the object model of a GLES
//! context (shaders, programs, textures, bindings, an RGBA framebuffer sized
//! by the viewport), performs a lexical GLSL check on compile, fails links
//! that lack a compiled `void main` per stage, and records every call in
//! order so callers can assert on the exact GL traffic.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::GlContext;
use crate::context::DrawableSurface;
use crate::types::{GlApiVersion, ShaderStage, TextureParameter};

/// One recorded call. Uniform uploads carry the uniform name rather than an
/// opaque location.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    CreateProgram(u32),
    CreateShader { shader: u32, stage: ShaderStage },
    ShaderSource { shader: u32, source: String },
    CompileShader(u32),
    AttachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    UseProgram(Option<u32>),
    DeleteShader(u32),
    DeleteProgram(u32),
    Uniform1f { name: String, x: f32 },
    Uniform2f { name: String, x: f32, y: f32 },
    Uniform3f { name: String, x: f32, y: f32, z: f32 },
    Uniform1i { name: String, x: i32 },
    DrawPoints { first: i32, count: i32 },
    CreateTexture(u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexImage2d { texture: Option<u32>, width: u32, height: u32, flip_y: bool },
    SetUnpackFlipY(bool),
    GenerateMipmap { texture: Option<u32> },
    TexParameter { texture: Option<u32>, parameter: TextureParameter },
    ReadPixels { x: i32, y: i32, width: u32, height: u32 },
}

/// Failure injection for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    pub fail_program_creation: bool,
    pub fail_shader_creation: Option<ShaderStage>,
    pub fail_texture_creation: bool,
    /// Forces every link to fail with this log.
    pub link_failure: Option<String>,
}

/// Location handle handed out by [`HeadlessContext::uniform_location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessUniform {
    pub program: u32,
    pub name: String,
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: HashSet<String>,
}

#[derive(Debug, Default)]
struct TextureObject {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    mipmapped: bool,
    parameters: Vec<TextureParameter>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    textures: HashMap<u32, TextureObject>,
    bound_texture: Option<u32>,
    flip_y: bool,
    framebuffer: Vec<u8>,
    framebuffer_size: (u32, u32),
    calls: Vec<GlCall>,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug)]
pub struct HeadlessContext {
    version: GlApiVersion,
    options: HeadlessOptions,
    state: RefCell<State>,
}

impl HeadlessContext {
    pub fn new(version: GlApiVersion) -> Self {
        Self::with_options(version, HeadlessOptions::default())
    }

    pub fn with_options(version: GlApiVersion, options: HeadlessOptions) -> Self {
        Self {
            version,
            options,
            state: RefCell::new(State::default()),
        }
    }

    pub fn version(&self) -> GlApiVersion {
        self.version
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Level-0 dimensions last uploaded to `texture`.
    pub fn texture_size(&self, texture: u32) -> Option<(u32, u32)> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|object| (object.width, object.height))
    }

    /// Level-0 RGBA bytes last uploaded to `texture`, rows in upload order.
    pub fn texture_pixels(&self, texture: u32) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|object| object.pixels.clone())
    }

    pub fn texture_has_mipmaps(&self, texture: u32) -> bool {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .is_some_and(|object| object.mipmapped)
    }

    pub fn texture_parameters(&self, texture: u32) -> Vec<TextureParameter> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|object| object.parameters.clone())
            .unwrap_or_default()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Writes one framebuffer pixel; out-of-bounds writes are ignored.
    pub fn paint(&self, x: u32, y: u32, rgba: [u8; 4]) {
        let mut state = self.state.borrow_mut();
        let (width, height) = state.framebuffer_size;
        if x >= width || y >= height {
            return;
        }
        let offset = (y as usize * width as usize + x as usize) * 4;
        state.framebuffer[offset..offset + 4].copy_from_slice(&rgba);
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GlContext for HeadlessContext {
    type Program = u32;
    type Shader = u32;
    type Texture = u32;
    type UniformLocation = HeadlessUniform;

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        let size = (width.max(0) as u32, height.max(0) as u32);
        if state.framebuffer_size != size {
            state.framebuffer_size = size;
            state.framebuffer = vec![0; size.0 as usize * size.1 as usize * 4];
        }
        state.calls.push(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn create_program(&self) -> Result<u32, String> {
        if self.options.fail_program_creation {
            return Err("program allocation refused".into());
        }
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.programs.insert(id, ProgramObject::default());
        state.calls.push(GlCall::CreateProgram(id));
        Ok(id)
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        if self.options.fail_shader_creation == Some(stage) {
            return Err(format!("{stage} shader allocation refused"));
        }
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        state.calls.push(GlCall::CreateShader { shader: id, stage });
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.shaders.get_mut(&shader) {
            object.source = source.to_string();
        }
        state.calls.push(GlCall::ShaderSource {
            shader,
            source: source.to_string(),
        });
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.shaders.get_mut(&shader) {
            match lint_glsl(&object.source) {
                Ok(()) => {
                    object.compiled = true;
                    object.log.clear();
                }
                Err(log) => {
                    object.compiled = false;
                    object.log = log;
                }
            }
        }
        state.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|object| object.compiled)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(&program) {
            object.shaders.push(shader);
        }
        state.calls.push(GlCall::AttachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(GlCall::LinkProgram(program));

        let Some(object) = state.programs.get(&program) else {
            return;
        };
        let attached: Vec<&ShaderObject> = object
            .shaders
            .iter()
            .filter_map(|id| state.shaders.get(id))
            .collect();

        let failure = self.options.link_failure.clone().or_else(|| {
            if attached.iter().any(|shader| !shader.compiled) {
                return Some("ERROR: one or more attached shaders not successfully compiled".into());
            }
            for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
                let Some(shader) = attached.iter().find(|shader| shader.stage == stage) else {
                    return Some(format!("ERROR: program has no {stage} shader attached"));
                };
                if !declares_main(&shader.source) {
                    return Some(format!(
                        "ERROR: Missing entry point: {stage} shader has no main()"
                    ));
                }
            }
            None
        });

        let uniforms: HashSet<String> = attached
            .iter()
            .flat_map(|shader| declared_uniforms(&shader.source))
            .collect();

        if let Some(object) = state.programs.get_mut(&program) {
            match failure {
                Some(log) => {
                    object.linked = false;
                    object.log = log;
                    object.uniforms.clear();
                }
                None => {
                    object.linked = true;
                    object.log.clear();
                    object.uniforms = uniforms;
                }
            }
        }
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(GlCall::UseProgram(program));
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|object| object.linked)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader);
        state.calls.push(GlCall::DeleteShader(shader));
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        state.calls.push(GlCall::DeleteProgram(program));
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<HeadlessUniform> {
        let state = self.state.borrow();
        let object = state.programs.get(&program)?;
        let base = name.split('[').next().unwrap_or(name);
        (object.linked && object.uniforms.contains(base)).then(|| HeadlessUniform {
            program,
            name: name.to_string(),
        })
    }

    fn uniform_1_f32(&self, location: Option<&HeadlessUniform>, x: f32) {
        if let Some(location) = location {
            self.record(GlCall::Uniform1f {
                name: location.name.clone(),
                x,
            });
        }
    }

    fn uniform_2_f32(&self, location: Option<&HeadlessUniform>, x: f32, y: f32) {
        if let Some(location) = location {
            self.record(GlCall::Uniform2f {
                name: location.name.clone(),
                x,
                y,
            });
        }
    }

    fn uniform_3_f32(&self, location: Option<&HeadlessUniform>, x: f32, y: f32, z: f32) {
        if let Some(location) = location {
            self.record(GlCall::Uniform3f {
                name: location.name.clone(),
                x,
                y,
                z,
            });
        }
    }

    fn uniform_1_i32(&self, location: Option<&HeadlessUniform>, x: i32) {
        if let Some(location) = location {
            self.record(GlCall::Uniform1i {
                name: location.name.clone(),
                x,
            });
        }
    }

    fn draw_points(&self, first: i32, count: i32) {
        self.record(GlCall::DrawPoints { first, count });
    }

    fn create_texture(&self) -> Result<u32, String> {
        if self.options.fail_texture_creation {
            return Err("texture allocation refused".into());
        }
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.textures.insert(id, TextureObject::default());
        state.calls.push(GlCall::CreateTexture(id));
        Ok(id)
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture_2d(&self, texture: Option<u32>) {
        let mut state = self.state.borrow_mut();
        state.bound_texture = texture;
        state.calls.push(GlCall::BindTexture(texture));
    }

    fn tex_image_2d_rgba(&self, width: u32, height: u32, pixels: &[u8]) {
        let mut state = self.state.borrow_mut();
        let texture = state.bound_texture;
        let flip_y = state.flip_y;
        if let Some(object) = texture.and_then(|id| state.textures.get_mut(&id)) {
            object.width = width;
            object.height = height;
            object.pixels = pixels.to_vec();
            object.mipmapped = false;
        }
        state.calls.push(GlCall::TexImage2d {
            texture,
            width,
            height,
            flip_y,
        });
    }

    fn set_unpack_flip_y(&self, flip: bool) {
        let mut state = self.state.borrow_mut();
        state.flip_y = flip;
        state.calls.push(GlCall::SetUnpackFlipY(flip));
    }

    fn generate_mipmap_2d(&self) {
        let mut state = self.state.borrow_mut();
        let texture = state.bound_texture;
        if let Some(object) = texture.and_then(|id| state.textures.get_mut(&id)) {
            object.mipmapped = true;
        }
        state.calls.push(GlCall::GenerateMipmap { texture });
    }

    fn tex_parameter(&self, parameter: TextureParameter) {
        let mut state = self.state.borrow_mut();
        let texture = state.bound_texture;
        if let Some(object) = texture.and_then(|id| state.textures.get_mut(&id)) {
            object.parameters.push(parameter);
        }
        state.calls.push(GlCall::TexParameter { texture, parameter });
    }

    fn read_pixels_rgba(&self, x: i32, y: i32, width: u32, height: u32, buffer: &mut [u8]) {
        let mut state = self.state.borrow_mut();
        let (fb_width, fb_height) = state.framebuffer_size;
        for row in 0..height as usize {
            for column in 0..width as usize {
                let out = (row * width as usize + column) * 4;
                let Some(target) = buffer.get_mut(out..out + 4) else {
                    continue;
                };
                let src_x = i64::from(x) + column as i64;
                let src_y = i64::from(y) + row as i64;
                let inside = (0..i64::from(fb_width)).contains(&src_x)
                    && (0..i64::from(fb_height)).contains(&src_y);
                if inside {
                    let offset = (src_y as usize * fb_width as usize + src_x as usize) * 4;
                    target.copy_from_slice(&state.framebuffer[offset..offset + 4]);
                } else {
                    target.fill(0);
                }
            }
        }
        state.calls.push(GlCall::ReadPixels {
            x,
            y,
            width,
            height,
        });
    }
}

/// Surface that hands out [`HeadlessContext`]s for a configurable set of
/// API versions.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    supported: Vec<GlApiVersion>,
    options: HeadlessOptions,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::with_versions(&GlApiVersion::PREFERENCE)
    }

    pub fn with_versions(versions: &[GlApiVersion]) -> Self {
        Self {
            supported: versions.to_vec(),
            options: HeadlessOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HeadlessOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawableSurface for HeadlessSurface {
    type Context = HeadlessContext;

    fn create_context(&self, version: GlApiVersion) -> Option<HeadlessContext> {
        self.supported
            .contains(&version)
            .then(|| HeadlessContext::with_options(version, self.options.clone()))
    }
}

/// Replaces comments with spaces, keeping newlines so line numbers survive.
/// Fails with the line of an unterminated block comment.
fn strip_comments(source: &str) -> Result<String, usize> {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line = 1;
    while let Some(ch) = chars.next() {
        match ch {
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
                output.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let opened_on = line;
                let mut closed = false;
                while let Some(next) = chars.next() {
                    if next == '\n' {
                        line += 1;
                        output.push('\n');
                    } else if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(opened_on);
                }
                output.push(' ');
            }
            '\n' => {
                line += 1;
                output.push('\n');
            }
            other => output.push(other),
        }
    }
    Ok(output)
}

/// Lexical validation standing in for a driver compiler. Errors are
/// formatted like GLSL ES driver logs.
pub fn lint_glsl(source: &str) -> Result<(), String> {
    let stripped = strip_comments(source)
        .map_err(|line| format!("ERROR: 0:{line}: '/*' : unterminated comment"))?;

    let mut open: Vec<(char, usize)> = Vec::new();
    let mut seen_code = false;
    let mut last_line = 1;
    for (index, text) in stripped.lines().enumerate() {
        let line = index + 1;
        last_line = line;
        let trimmed = text.trim_start();
        if let Some(directive) = trimmed.strip_prefix('#') {
            if directive.trim_start().starts_with("version") && seen_code {
                return Err(format!(
                    "ERROR: 0:{line}: '#version' : must occur first in shader"
                ));
            }
            seen_code = true;
            continue;
        }
        for ch in text.chars() {
            match ch {
                '(' | '[' | '{' => open.push((ch, line)),
                ')' | ']' | '}' => {
                    let expected = match ch {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match open.pop() {
                        Some((opened, _)) if opened == expected => {}
                        _ => return Err(format!("ERROR: 0:{line}: '{ch}' : syntax error")),
                    }
                }
                _ => {}
            }
            if !ch.is_whitespace() {
                seen_code = true;
            }
        }
    }

    if let Some((ch, opened_on)) = open.last() {
        return Err(format!(
            "ERROR: 0:{last_line}: '{ch}' : syntax error: unexpected end of file (opened on line {opened_on})"
        ));
    }
    Ok(())
}

fn declares_main(source: &str) -> bool {
    let Ok(stripped) = strip_comments(source) else {
        return false;
    };
    let mut offset = 0;
    while let Some(found) = stripped[offset..].find("main") {
        let position = offset + found;
        let before = &stripped[..position];
        let after = stripped[position + 4..].trim_start();
        let separated = before.ends_with(char::is_whitespace);
        let trimmed = before.trim_end();
        let returns_void = trimmed.ends_with("void")
            && !trimmed[..trimmed.len() - 4]
                .ends_with(|ch: char| ch.is_ascii_alphanumeric() || ch == '_');
        if separated && returns_void && after.starts_with('(') {
            return true;
        }
        offset = position + 4;
    }
    false
}

/// Names declared with the `uniform` storage qualifier.
fn declared_uniforms(source: &str) -> Vec<String> {
    let Ok(stripped) = strip_comments(source) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for statement in stripped.split(';') {
        let mut tokens = statement.split_whitespace().skip_while(|token| *token != "uniform");
        if tokens.next().is_none() {
            continue;
        }
        let mut tokens = tokens.skip_while(|token| matches!(*token, "lowp" | "mediump" | "highp"));
        let _type = tokens.next();
        let declarators: String = tokens.collect::<Vec<_>>().join(" ");
        for declarator in declarators.split(',') {
            let name = declarator
                .trim()
                .split(|ch: char| ch == '[' || ch == '=' || ch.is_whitespace())
                .next()
                .unwrap_or_default();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}
