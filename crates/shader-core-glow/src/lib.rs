#![warn(missing_docs)]
//! `shader-core-glow` - an OpenGL [`GpuCompiler`] for `shader-core`, built on `glow`.
//!
//! ```no_run
//! # fn demo(gl: &glow::Context) -> Result<(), Box<dyn std::error::Error>> {
//! use shader_core::{EditableFragment, ProgramAssembly, ProgramShape, StageKind, UniformValue};
//! use shader_core_glow::GlowCompiler;
//!
//! // SAFETY: `gl` is current on this thread for the lifetime of the compiler.
//! let compiler = unsafe { GlowCompiler::new(gl) };
//! let mut program = ProgramAssembly::new("demo", ProgramShape::VertexFragment, compiler);
//! program.add_stage(
//!     StageKind::Vertex,
//!     Box::new(EditableFragment::from_code("demo.vert", "#version 330\nvoid main() {}\n")),
//! )?;
//! program.add_stage(
//!     StageKind::Fragment,
//!     Box::new(EditableFragment::from_code("demo.frag", "#version 330\nvoid main() {}\n")),
//! )?;
//! if program.compile_all()? {
//!     program.link()?;
//!     program.set_uniform("u_time", UniformValue::Float(0.0))?;
//! }
//! # Ok(())
//! # }
//! ```

use glow::HasContext;
use shader_core::{
    AttachmentFormat, AttachmentPoint, AttachmentStorage, CompileOutput, FramebufferLayout,
    GpuCompiler, LinkOutput, RenderContext, StageKind, UniformValue,
};

/// GL shader type of a stage.
pub fn shader_type(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => glow::VERTEX_SHADER,
        StageKind::TessControl => glow::TESS_CONTROL_SHADER,
        StageKind::TessEval => glow::TESS_EVALUATION_SHADER,
        StageKind::Geometry => glow::GEOMETRY_SHADER,
        StageKind::Fragment => glow::FRAGMENT_SHADER,
        StageKind::Compute => glow::COMPUTE_SHADER,
    }
}

/// GL sized internal format of an attachment format.
pub fn internal_format(format: AttachmentFormat) -> u32 {
    match format {
        AttachmentFormat::Rgba8 => glow::RGBA8,
        AttachmentFormat::Rgba16F => glow::RGBA16F,
        AttachmentFormat::Rgba32F => glow::RGBA32F,
        AttachmentFormat::Rg16F => glow::RG16F,
        AttachmentFormat::R32F => glow::R32F,
        AttachmentFormat::Depth16 => glow::DEPTH_COMPONENT16,
        AttachmentFormat::Depth24 => glow::DEPTH_COMPONENT24,
        AttachmentFormat::Depth32F => glow::DEPTH_COMPONENT32F,
        AttachmentFormat::Stencil8 => glow::STENCIL_INDEX8,
        AttachmentFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
        AttachmentFormat::Depth32FStencil8 => glow::DEPTH32F_STENCIL8,
    }
}

/// GL attachment enum of an attachment point.
pub fn attachment_enum(point: AttachmentPoint) -> u32 {
    match point {
        AttachmentPoint::Color(index) => glow::COLOR_ATTACHMENT0 + index,
        AttachmentPoint::Depth => glow::DEPTH_ATTACHMENT,
        AttachmentPoint::Stencil => glow::STENCIL_ATTACHMENT,
        AttachmentPoint::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
    }
}

/// A framebuffer allocated from a [`FramebufferLayout`].
#[derive(Debug)]
pub struct GlowFramebuffer {
    /// Framebuffer object.
    pub framebuffer: glow::Framebuffer,
    /// Texture attachments with their attachment points.
    pub textures: Vec<(AttachmentPoint, glow::Texture)>,
    /// Renderbuffer attachments with their attachment points.
    pub renderbuffers: Vec<(AttachmentPoint, glow::Renderbuffer)>,
    /// Allocated size.
    pub size: (u32, u32),
}

/// [`GpuCompiler`] over a `glow` context.
pub struct GlowCompiler<'gl> {
    gl: &'gl glow::Context,
}

impl std::fmt::Debug for GlowCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowCompiler").finish_non_exhaustive()
    }
}

impl<'gl> GlowCompiler<'gl> {
    /// Wrap a context.
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread whenever a method of the compiler (or of a
    /// [`ProgramAssembly`](shader_core::ProgramAssembly) owning it) is called, including when
    /// it is dropped.
    pub unsafe fn new(gl: &'gl glow::Context) -> Self {
        Self { gl }
    }

    /// The wrapped context.
    pub fn context(&self) -> &'gl glow::Context {
        self.gl
    }

    /// Allocate a framebuffer for `layout`. Unsized layouts use `context`'s default target size.
    pub fn create_framebuffer(
        &self,
        layout: &FramebufferLayout,
        context: &RenderContext,
    ) -> Result<GlowFramebuffer, String> {
        let (width, height) = layout.resolved_size(context);
        let gl = self.gl;
        // SAFETY: the context is current (constructor contract).
        unsafe {
            let framebuffer = gl.create_framebuffer()?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let mut out = GlowFramebuffer {
                framebuffer,
                textures: Vec::new(),
                renderbuffers: Vec::new(),
                size: (width, height),
            };
            let mut draw_buffers = Vec::new();

            for (index, attachment) in layout.attachments().iter().enumerate() {
                let Some(point) = layout.attachment_point(index) else {
                    continue;
                };
                let target = attachment_enum(point);
                let format = internal_format(attachment.format);
                match attachment.storage {
                    AttachmentStorage::Texture => {
                        let texture = gl.create_texture()?;
                        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                        gl.tex_storage_2d(
                            glow::TEXTURE_2D,
                            1,
                            format,
                            width as i32,
                            height as i32,
                        );
                        gl.framebuffer_texture_2d(
                            glow::FRAMEBUFFER,
                            target,
                            glow::TEXTURE_2D,
                            Some(texture),
                            0,
                        );
                        out.textures.push((point, texture));
                    }
                    AttachmentStorage::Renderbuffer => {
                        let renderbuffer = gl.create_renderbuffer()?;
                        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
                        gl.renderbuffer_storage(
                            glow::RENDERBUFFER,
                            format,
                            width as i32,
                            height as i32,
                        );
                        gl.framebuffer_renderbuffer(
                            glow::FRAMEBUFFER,
                            target,
                            glow::RENDERBUFFER,
                            Some(renderbuffer),
                        );
                        out.renderbuffers.push((point, renderbuffer));
                    }
                }
                if matches!(point, AttachmentPoint::Color(_)) {
                    draw_buffers.push(target);
                }
            }
            gl.draw_buffers(&draw_buffers);

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                self.delete_framebuffer(out);
                return Err(format!("framebuffer incomplete: 0x{status:x}"));
            }
            log::debug!(
                "created {width}x{height} framebuffer with {} attachments",
                layout.len()
            );
            Ok(out)
        }
    }

    /// Free a framebuffer and its attachments.
    pub fn delete_framebuffer(&self, framebuffer: GlowFramebuffer) {
        let gl = self.gl;
        // SAFETY: the context is current (constructor contract).
        unsafe {
            for (_, texture) in framebuffer.textures {
                gl.delete_texture(texture);
            }
            for (_, renderbuffer) in framebuffer.renderbuffers {
                gl.delete_renderbuffer(renderbuffer);
            }
            gl.delete_framebuffer(framebuffer.framebuffer);
        }
    }
}

impl GpuCompiler for GlowCompiler<'_> {
    type Stage = glow::Shader;
    type Program = glow::Program;

    fn compile_stage(&mut self, kind: StageKind, source: &str) -> CompileOutput<glow::Shader> {
        let gl = self.gl;
        // SAFETY: the context is current (constructor contract).
        unsafe {
            let shader = match gl.create_shader(shader_type(kind)) {
                Ok(shader) => shader,
                Err(err) => {
                    return CompileOutput {
                        handle: None,
                        success: false,
                        log: err,
                    };
                }
            };
            gl.shader_source(shader, source);
            gl.compile_shader(shader);

            let success = gl.get_shader_compile_status(shader);
            let log = gl.get_shader_info_log(shader);
            if !success {
                gl.delete_shader(shader);
            }
            CompileOutput {
                handle: success.then_some(shader),
                success,
                log,
            }
        }
    }

    fn link_program(&mut self, stages: &[&glow::Shader]) -> LinkOutput<glow::Program> {
        let gl = self.gl;
        // SAFETY: the context is current (constructor contract).
        unsafe {
            let program = match gl.create_program() {
                Ok(program) => program,
                Err(err) => {
                    return LinkOutput {
                        program: None,
                        success: false,
                        log: err,
                    };
                }
            };
            for &&shader in stages {
                gl.attach_shader(program, shader);
            }
            gl.link_program(program);
            for &&shader in stages {
                gl.detach_shader(program, shader);
            }

            let success = gl.get_program_link_status(program);
            let log = gl.get_program_info_log(program);
            if !success {
                gl.delete_program(program);
            }
            LinkOutput {
                program: success.then_some(program),
                success,
                log,
            }
        }
    }

    fn set_uniform(&mut self, program: &glow::Program, name: &str, value: &UniformValue) -> bool {
        let gl = self.gl;
        // SAFETY: the context is current (constructor contract).
        unsafe {
            let Some(location) = gl.get_uniform_location(*program, name) else {
                return false;
            };
            let location = Some(&location);
            gl.use_program(Some(*program));
            match *value {
                UniformValue::Float(x) => gl.uniform_1_f32(location, x),
                UniformValue::Vec2([x, y]) => gl.uniform_2_f32(location, x, y),
                UniformValue::Vec3([x, y, z]) => gl.uniform_3_f32(location, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(location, x, y, z, w),
                UniformValue::Int(x) => gl.uniform_1_i32(location, x),
                UniformValue::UInt(x) => gl.uniform_1_u32(location, x),
                UniformValue::Bool(x) => gl.uniform_1_i32(location, i32::from(x)),
                UniformValue::Mat3(m) => gl.uniform_matrix_3_f32_slice(location, false, &m),
                UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(location, false, &m),
            }
            true
        }
    }

    fn release_stage(&mut self, stage: glow::Shader) {
        // SAFETY: the context is current (constructor contract).
        unsafe { self.gl.delete_shader(stage) }
    }

    fn release_program(&mut self, program: glow::Program) {
        // SAFETY: the context is current (constructor contract).
        unsafe { self.gl.delete_program(program) }
    }
}
