//! GL device wrapper
//!
//! All raw GL calls live here. The rest of the renderer works with the safe
//! methods on [`Device`] and never touches the context directly.

use std::rc::Rc;

use glow::HasContext;
use log::debug;

use crate::foundation::math::Point3;
use crate::render::pool::ModelBuffers;
use crate::render::{RenderError, UniformValue};

const FLOATS_PER_VERTEX: i32 = 3;
const BYTES_PER_VERTEX: i32 = FLOATS_PER_VERTEX * 4;

/// Safe wrapper over the GL context.
pub struct Device {
    gl: Rc<glow::Context>,
}

impl Device {
    /// Wrap a context.
    pub fn new(gl: Rc<glow::Context>) -> Self {
        Self { gl }
    }

    /// Compile and link a stage's vertex and fragment shaders.
    pub fn compile_program(
        &self,
        stage: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<glow::Program, RenderError> {
        let vs = self.compile_shader(stage, glow::VERTEX_SHADER, vertex)?;
        let fs = self.compile_shader(stage, glow::FRAGMENT_SHADER, fragment)?;
        unsafe {
            let program = self.gl.create_program().map_err(RenderError::Gl)?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);
            self.gl.delete_shader(vs);
            self.gl.delete_shader(fs);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(RenderError::ProgramLink {
                    stage: stage.to_string(),
                    log,
                });
            }
            debug!("linked program for stage '{stage}'");
            Ok(program)
        }
    }

    fn compile_shader(
        &self,
        stage: &str,
        kind: u32,
        source: &str,
    ) -> Result<glow::Shader, RenderError> {
        unsafe {
            let shader = self.gl.create_shader(kind).map_err(RenderError::Gl)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(RenderError::ShaderCompile {
                    stage: stage.to_string(),
                    log,
                });
            }
            Ok(shader)
        }
    }

    /// Allocate buffers for `capacity` vertices: a vertex array with packed
    /// positions at attribute 0 and normals at attribute 1.
    pub fn create_model_buffers(&self, capacity: i32) -> Result<ModelBuffers, RenderError> {
        unsafe {
            let vao = self.gl.create_vertex_array().map_err(RenderError::Gl)?;
            let vertex_vbo = self.gl.create_buffer().map_err(RenderError::Gl)?;
            let normal_vbo = self.gl.create_buffer().map_err(RenderError::Gl)?;
            self.gl.bind_vertex_array(Some(vao));

            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_vbo));
            self.gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                capacity * BYTES_PER_VERTEX,
                glow::DYNAMIC_DRAW,
            );
            self.gl
                .vertex_attrib_pointer_f32(0, FLOATS_PER_VERTEX, glow::FLOAT, false, 0, 0);
            self.gl.enable_vertex_attrib_array(0);

            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(normal_vbo));
            self.gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                capacity * BYTES_PER_VERTEX,
                glow::DYNAMIC_DRAW,
            );
            self.gl
                .vertex_attrib_pointer_f32(1, FLOATS_PER_VERTEX, glow::FLOAT, false, 0, 0);
            self.gl.enable_vertex_attrib_array(1);

            self.gl.bind_vertex_array(None);
            Ok(ModelBuffers {
                vao,
                vertex_vbo,
                normal_vbo,
                capacity,
                num_vertices: 0,
            })
        }
    }

    /// Upload vertex data into existing buffers.
    ///
    /// Data that fits the allocated capacity is written in place; larger
    /// data reallocates both buffers and raises the recorded capacity.
    pub fn upload_model(&self, buffers: &mut ModelBuffers, vertices: &[Point3], normals: &[Point3]) {
        let num_vertices = vertices.len() as i32;
        let positions = pack(vertices);
        let packed_normals = pack(normals);
        unsafe {
            if num_vertices > buffers.capacity {
                self.gl
                    .bind_buffer(glow::ARRAY_BUFFER, Some(buffers.vertex_vbo));
                self.gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&positions),
                    glow::DYNAMIC_DRAW,
                );
                self.gl
                    .bind_buffer(glow::ARRAY_BUFFER, Some(buffers.normal_vbo));
                self.gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&packed_normals),
                    glow::DYNAMIC_DRAW,
                );
                buffers.capacity = num_vertices;
            } else {
                self.gl
                    .bind_buffer(glow::ARRAY_BUFFER, Some(buffers.vertex_vbo));
                self.gl.buffer_sub_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    0,
                    bytemuck::cast_slice(&positions),
                );
                self.gl
                    .bind_buffer(glow::ARRAY_BUFFER, Some(buffers.normal_vbo));
                self.gl.buffer_sub_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    0,
                    bytemuck::cast_slice(&packed_normals),
                );
            }
        }
        buffers.num_vertices = num_vertices;
    }

    /// Free a model's GL objects.
    pub fn delete_model_buffers(&self, buffers: ModelBuffers) {
        unsafe {
            self.gl.delete_buffer(buffers.vertex_vbo);
            self.gl.delete_buffer(buffers.normal_vbo);
            self.gl.delete_vertex_array(buffers.vao);
        }
    }

    /// Create an RGBA8 color texture with linear filtering and clamped
    /// edges.
    pub fn create_color_texture(&self, width: i32, height: i32) -> Result<glow::Texture, RenderError> {
        self.create_texture(width, height, glow::RGBA8 as i32, glow::RGBA, glow::UNSIGNED_BYTE)
    }

    /// Create a 24-bit depth texture.
    pub fn create_depth_texture(&self, width: i32, height: i32) -> Result<glow::Texture, RenderError> {
        self.create_texture(
            width,
            height,
            glow::DEPTH_COMPONENT24 as i32,
            glow::DEPTH_COMPONENT,
            glow::UNSIGNED_INT,
        )
    }

    fn create_texture(
        &self,
        width: i32,
        height: i32,
        internal_format: i32,
        format: u32,
        ty: u32,
    ) -> Result<glow::Texture, RenderError> {
        unsafe {
            let texture = self.gl.create_texture().map_err(RenderError::Gl)?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                None,
            );
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            Ok(texture)
        }
    }

    /// Build a framebuffer with sequential color attachments and an
    /// optional depth attachment, failing if the driver reports the
    /// framebuffer incomplete.
    pub fn create_framebuffer(
        &self,
        colors: &[glow::Texture],
        depth: Option<glow::Texture>,
    ) -> Result<glow::Framebuffer, RenderError> {
        unsafe {
            let framebuffer = self.gl.create_framebuffer().map_err(RenderError::Gl)?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            let mut draw_buffers = Vec::with_capacity(colors.len());
            for (i, texture) in colors.iter().enumerate() {
                let attachment = glow::COLOR_ATTACHMENT0 + i as u32;
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::TEXTURE_2D,
                    Some(*texture),
                    0,
                );
                draw_buffers.push(attachment);
            }
            self.gl.draw_buffers(&draw_buffers);
            if let Some(texture) = depth {
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::TEXTURE_2D,
                    Some(texture),
                    0,
                );
            }
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                return Err(RenderError::FramebufferIncomplete { status });
            }
            Ok(framebuffer)
        }
    }

    /// Create the fullscreen quad used by post-process stages: two
    /// triangles of vec2 positions at attribute 0.
    pub fn create_quad(&self) -> Result<(glow::VertexArray, glow::Buffer), RenderError> {
        const QUAD: [f32; 12] = [
            -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0,
        ];
        unsafe {
            let vao = self.gl.create_vertex_array().map_err(RenderError::Gl)?;
            let vbo = self.gl.create_buffer().map_err(RenderError::Gl)?;
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD),
                glow::STATIC_DRAW,
            );
            self.gl
                .vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 0, 0);
            self.gl.enable_vertex_attrib_array(0);
            self.gl.bind_vertex_array(None);
            Ok((vao, vbo))
        }
    }

    /// Bind a render target (`None` for the default framebuffer), set the
    /// viewport, and clear it.
    pub fn begin_pass(
        &self,
        framebuffer: Option<glow::Framebuffer>,
        width: i32,
        height: i32,
        depth_test: bool,
    ) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            self.gl.viewport(0, 0, width, height);
            if depth_test {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    /// Bind `program` and set the named uniform on it.
    ///
    /// A name the program does not use is silently ignored, matching GL's
    /// treatment of optimized-out uniforms.
    pub fn set_uniform(&self, program: glow::Program, name: &str, value: &UniformValue) {
        unsafe {
            self.gl.use_program(Some(program));
            let location = self.gl.get_uniform_location(program, name);
            match value {
                UniformValue::Float(v) => self.gl.uniform_1_f32(location.as_ref(), *v),
                UniformValue::Int(v) => self.gl.uniform_1_i32(location.as_ref(), *v),
                UniformValue::Vec3(v) => {
                    self.gl.uniform_3_f32(location.as_ref(), v.x, v.y, v.z);
                }
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(location.as_ref(), false, m.as_slice());
                }
            }
        }
    }

    /// Bind `program` and attach each input texture to a sequential texture
    /// unit, wiring the same-named sampler uniform to that unit.
    pub fn bind_inputs(&self, program: glow::Program, inputs: &[(String, glow::Texture)]) {
        unsafe {
            self.gl.use_program(Some(program));
            for (unit, (name, texture)) in inputs.iter().enumerate() {
                self.gl.active_texture(glow::TEXTURE0 + unit as u32);
                self.gl.bind_texture(glow::TEXTURE_2D, Some(*texture));
                let location = self.gl.get_uniform_location(program, name);
                self.gl.uniform_1_i32(location.as_ref(), unit as i32);
            }
            self.gl.active_texture(glow::TEXTURE0);
        }
    }

    /// Bind `program` and draw a model's triangles.
    pub fn draw_model(&self, program: glow::Program, buffers: &ModelBuffers) {
        unsafe {
            self.gl.use_program(Some(program));
            self.gl.bind_vertex_array(Some(buffers.vao));
            self.gl.draw_arrays(glow::TRIANGLES, 0, buffers.num_vertices);
            self.gl.bind_vertex_array(None);
        }
    }

    /// Bind `program` and draw the fullscreen quad.
    pub fn draw_quad(&self, program: glow::Program, quad: glow::VertexArray) {
        unsafe {
            self.gl.use_program(Some(program));
            self.gl.bind_vertex_array(Some(quad));
            self.gl.draw_arrays(glow::TRIANGLES, 0, 6);
            self.gl.bind_vertex_array(None);
        }
    }

    /// Free a quad's GL objects.
    pub fn delete_quad(&self, quad: (glow::VertexArray, glow::Buffer)) {
        unsafe {
            self.gl.delete_buffer(quad.1);
            self.gl.delete_vertex_array(quad.0);
        }
    }

    /// Free a linked program.
    pub fn delete_program(&self, program: glow::Program) {
        unsafe {
            self.gl.delete_program(program);
        }
    }

    /// Free a framebuffer. Attached textures are freed separately.
    pub fn delete_framebuffer(&self, framebuffer: glow::Framebuffer) {
        unsafe {
            self.gl.delete_framebuffer(framebuffer);
        }
    }

    /// Free a texture.
    pub fn delete_texture(&self, texture: glow::Texture) {
        unsafe {
            self.gl.delete_texture(texture);
        }
    }
}

fn pack(points: &[Point3]) -> Vec<f32> {
    let mut packed = Vec::with_capacity(points.len() * 3);
    for point in points {
        packed.extend_from_slice(&[point.x, point.y, point.z]);
    }
    packed
}
