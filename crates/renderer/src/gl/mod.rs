//! The GL seam every bootstrap component talks to.
//!
//! `GlContext` covers exactly the slice of a GLES2/GLES3 (WebGL1/WebGL2)
//! context the playground needs. Two backends implement it:
//! - `glow_backend::GlowContext` forwards to any `glow::HasContext`.
//! - `headless::HeadlessContext` tracks object state in memory, validates
//!   GLSL lexically and records every call; the CLI uses it for `check` and
//!   the tests use it everywhere.
//!
//! All methods take `&self`: GL contexts are single-threaded state machines
//! and the backends use interior mutability where they need it.

mod glow_backend;
pub mod headless;

pub use glow_backend::GlowContext;
pub use headless::{GlCall, HeadlessContext, HeadlessOptions, HeadlessSurface};

use crate::types::{ShaderStage, TextureParameter};

pub trait GlContext {
    type Program: Copy + std::fmt::Debug;
    type Shader: Copy + std::fmt::Debug;
    type Texture: Copy + std::fmt::Debug;
    type UniformLocation: Clone + std::fmt::Debug;

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_shader(&self, shader: Self::Shader);
    fn delete_program(&self, program: Self::Program);

    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn uniform_1_f32(&self, location: Option<&Self::UniformLocation>, x: f32);
    fn uniform_2_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32);
    fn uniform_3_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32, z: f32);
    fn uniform_1_i32(&self, location: Option<&Self::UniformLocation>, x: i32);

    /// `drawArrays(POINTS, first, count)`.
    fn draw_points(&self, first: i32, count: i32);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    /// Selects texture unit `TEXTURE0 + unit`.
    fn active_texture(&self, unit: u32);
    fn bind_texture_2d(&self, texture: Option<Self::Texture>);
    /// Uploads tightly packed RGBA8 rows as level 0 of the bound 2D texture.
    fn tex_image_2d_rgba(&self, width: u32, height: u32, pixels: &[u8]);
    /// Whether subsequent uploads are flipped so the first row lands at the bottom.
    fn set_unpack_flip_y(&self, flip: bool);
    fn generate_mipmap_2d(&self);
    fn tex_parameter(&self, parameter: TextureParameter);

    /// Reads RGBA8 pixels from the current framebuffer into `buffer`
    /// (`width * height * 4` bytes).
    fn read_pixels_rgba(&self, x: i32, y: i32, width: u32, height: u32, buffer: &mut [u8]);
}
