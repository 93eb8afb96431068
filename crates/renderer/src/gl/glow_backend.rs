use std::cell::Cell;

use glow::{HasContext, PixelPackData, PixelUnpackData};

use super::GlContext;
use crate::types::{GlApiVersion, ShaderStage, TextureParameter};

/// [`GlContext`] over a real GL/GLES context loaded through `glow`.
///
/// Desktop and embedded GL have no `UNPACK_FLIP_Y_WEBGL`, so the flip flag is
/// tracked here and applied to the pixel rows before upload.
pub struct GlowContext<T: HasContext = glow::Context> {
    gl: T,
    version: GlApiVersion,
    flip_y: Cell<bool>,
}

impl<T: HasContext> GlowContext<T> {
    /// Wraps a loaded context. GLES3 contexts get an empty vertex array bound
    /// so attribute-less point draws are valid.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread for every later call made
    /// through the returned wrapper.
    pub unsafe fn new(gl: T, version: GlApiVersion) -> Result<Self, String> {
        if version == GlApiVersion::Gles3 {
            let vertex_array = gl.create_vertex_array()?;
            gl.bind_vertex_array(Some(vertex_array));
        }
        tracing::debug!(%version, "wrapped glow context");
        Ok(Self {
            gl,
            version,
            flip_y: Cell::new(false),
        })
    }

    pub fn version(&self) -> GlApiVersion {
        self.version
    }

    pub fn raw(&self) -> &T {
        &self.gl
    }
}

fn flip_rows(pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
    let row_len = width as usize * 4;
    if row_len == 0 {
        return pixels.to_vec();
    }
    let mut flipped = Vec::with_capacity(pixels.len());
    for row in pixels.chunks_exact(row_len).take(height as usize).rev() {
        flipped.extend_from_slice(row);
    }
    flipped
}

impl<T: HasContext> GlContext for GlowContext<T> {
    type Program = T::Program;
    type Shader = T::Shader;
    type Texture = T::Texture;
    type UniformLocation = T::UniformLocation;

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { self.gl.create_program() }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { self.gl.create_shader(kind) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_1_f32(&self, location: Option<&Self::UniformLocation>, x: f32) {
        unsafe { self.gl.uniform_1_f32(location, x) }
    }

    fn uniform_2_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32) {
        unsafe { self.gl.uniform_2_f32(location, x, y) }
    }

    fn uniform_3_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32, z: f32) {
        unsafe { self.gl.uniform_3_f32(location, x, y, z) }
    }

    fn uniform_1_i32(&self, location: Option<&Self::UniformLocation>, x: i32) {
        unsafe { self.gl.uniform_1_i32(location, x) }
    }

    fn draw_points(&self, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(glow::POINTS, first, count) }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture_2d(&self, texture: Option<Self::Texture>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d_rgba(&self, width: u32, height: u32, pixels: &[u8]) {
        let flipped;
        let data = if self.flip_y.get() {
            flipped = flip_rows(pixels, width, height);
            flipped.as_slice()
        } else {
            pixels
        };
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(data)),
            );
        }
    }

    fn set_unpack_flip_y(&self, flip: bool) {
        self.flip_y.set(flip);
    }

    fn generate_mipmap_2d(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn tex_parameter(&self, parameter: TextureParameter) {
        let (name, value) = match parameter {
            TextureParameter::WrapS(mode) => (glow::TEXTURE_WRAP_S, mode.gl_enum()),
            TextureParameter::WrapT(mode) => (glow::TEXTURE_WRAP_T, mode.gl_enum()),
            TextureParameter::MinFilter(filter) => (glow::TEXTURE_MIN_FILTER, filter.gl_enum()),
            TextureParameter::MagFilter(filter) => (glow::TEXTURE_MAG_FILTER, filter.gl_enum()),
        };
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, name, value as i32)
        }
    }

    fn read_pixels_rgba(&self, x: i32, y: i32, width: u32, height: u32, buffer: &mut [u8]) {
        unsafe {
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.gl.read_pixels(
                x,
                y,
                width as i32,
                height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelPackData::Slice(Some(buffer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_rows_reverses_row_order() {
        let pixels = [
            1u8, 1, 1, 1, 2, 2, 2, 2, //
            3, 3, 3, 3, 4, 4, 4, 4, //
            5, 5, 5, 5, 6, 6, 6, 6,
        ];
        let flipped = flip_rows(&pixels, 2, 3);
        assert_eq!(&flipped[..8], &pixels[16..]);
        assert_eq!(&flipped[8..16], &pixels[8..16]);
        assert_eq!(&flipped[16..], &pixels[..8]);
    }

    #[test]
    fn gl_enums_match_glow_constants() {
        use crate::types::{MagFilter, MinFilter, WrapMode};
        assert_eq!(WrapMode::Repeat.gl_enum(), glow::REPEAT);
        assert_eq!(WrapMode::ClampToEdge.gl_enum(), glow::CLAMP_TO_EDGE);
        assert_eq!(WrapMode::MirroredRepeat.gl_enum(), glow::MIRRORED_REPEAT);
        assert_eq!(MinFilter::Nearest.gl_enum(), glow::NEAREST);
        assert_eq!(MinFilter::LinearMipmapLinear.gl_enum(), glow::LINEAR_MIPMAP_LINEAR);
        assert_eq!(MinFilter::NearestMipmapLinear.gl_enum(), glow::NEAREST_MIPMAP_LINEAR);
        assert_eq!(MagFilter::Linear.gl_enum(), glow::LINEAR);
    }
}
