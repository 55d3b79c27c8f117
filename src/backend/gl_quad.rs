//! Full-screen textured quad shared by the OpenGL backends.
//!
//! The host texture lives in a context shared with ours, so it is bound by
//! name and drawn directly. Texture coordinates are flipped vertically: the
//! host renders with a bottom-left origin, the window expects top-left.

use crate::command::TextureRef;
use anyhow::{bail, Result};
use gl::types::{GLchar, GLint, GLuint};
use log::debug;
use std::ffi::{c_void, CString};
use std::sync::Once;

const VERTEX_SHADER: &str = r#"#version 130
out vec2 v_uv;
void main() {
    vec2 pos = vec2(float((gl_VertexID & 1) * 2 - 1), float((gl_VertexID >> 1) * 2 - 1));
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 130
in vec2 v_uv;
out vec4 frag_color;
uniform sampler2D u_texture;
uniform bool u_opaque;
void main() {
    vec4 color = texture(u_texture, v_uv);
    if (u_opaque) {
        color.a = 1.0;
    }
    frag_color = color;
}
"#;

/// GL texture name carried by a texture reference.
pub(crate) fn texture_name(texture: TextureRef) -> Option<GLuint> {
    GLuint::try_from(texture.as_raw())
        .ok()
        .filter(|name| *name != 0)
}

static LOAD_FUNCTIONS: Once = Once::new();

/// Resolves GL entry points through the context current on this thread.
///
/// The `gl` function table is process-wide, so it is filled by the first
/// window only; later windows, on other render threads, just check it.
pub(crate) fn load_functions(mut loader: impl FnMut(&str) -> *const c_void) -> Result<()> {
    LOAD_FUNCTIONS.call_once(|| gl::load_with(|symbol| loader(symbol)));
    if !gl::CreateShader::is_loaded() || !gl::GenVertexArrays::is_loaded() {
        bail!("OpenGL 3.0 entry points unavailable");
    }
    Ok(())
}

unsafe fn info_log(object: GLuint, is_program: bool) -> String {
    let mut len: GLint = 0;
    if is_program {
        gl::GetProgramiv(object, gl::INFO_LOG_LENGTH, &mut len);
    } else {
        gl::GetShaderiv(object, gl::INFO_LOG_LENGTH, &mut len);
    }
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written: GLint = 0;
    if is_program {
        gl::GetProgramInfoLog(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    } else {
        gl::GetShaderInfoLog(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    }
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn compile(kind: gl::types::GLenum, source: &str) -> Result<GLuint> {
    let shader = gl::CreateShader(kind);
    let source = CString::new(source)?;
    gl::ShaderSource(shader, 1, &source.as_ptr(), std::ptr::null());
    gl::CompileShader(shader);

    let mut ok: GLint = 0;
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut ok);
    if ok == 0 {
        let log = info_log(shader, false);
        gl::DeleteShader(shader);
        bail!("shader compilation failed: {}", log);
    }
    Ok(shader)
}

/// Program and vertex array for the blit. Must be released with
/// [`GlQuad::release`] while its context is still current.
pub(crate) struct GlQuad {
    program: GLuint,
    vao: GLuint,
    opaque_location: GLint,
}

impl GlQuad {
    /// Builds the program in the current context.
    pub fn new() -> Result<Self> {
        unsafe {
            let vertex = compile(gl::VERTEX_SHADER, VERTEX_SHADER)?;
            let fragment = match compile(gl::FRAGMENT_SHADER, FRAGMENT_SHADER) {
                Ok(shader) => shader,
                Err(err) => {
                    gl::DeleteShader(vertex);
                    return Err(err);
                }
            };

            let program = gl::CreateProgram();
            gl::AttachShader(program, vertex);
            gl::AttachShader(program, fragment);
            gl::BindFragDataLocation(program, 0, c"frag_color".as_ptr());
            gl::LinkProgram(program);
            gl::DeleteShader(vertex);
            gl::DeleteShader(fragment);

            let mut ok: GLint = 0;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut ok);
            if ok == 0 {
                let log = info_log(program, true);
                gl::DeleteProgram(program);
                bail!("program link failed: {}", log);
            }

            gl::UseProgram(program);
            gl::Uniform1i(gl::GetUniformLocation(program, c"u_texture".as_ptr()), 0);
            let opaque_location = gl::GetUniformLocation(program, c"u_opaque".as_ptr());
            gl::UseProgram(0);

            let mut vao = 0;
            gl::GenVertexArrays(1, &mut vao);

            debug!("🔺 GL quad program {} ready", program);
            Ok(Self {
                program,
                vao,
                opaque_location,
            })
        }
    }

    /// Clears to transparent black and draws `texture` over the whole viewport.
    pub fn draw(&self, texture: Option<GLuint>, width: i32, height: i32, opaque: bool) {
        unsafe {
            gl::Viewport(0, 0, width.max(1), height.max(1));
            gl::ClearColor(0.0, 0.0, 0.0, 0.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);

            let Some(texture) = texture else {
                return;
            };
            gl::UseProgram(self.program);
            gl::Uniform1i(self.opaque_location, GLint::from(opaque));
            gl::BindVertexArray(self.vao);
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, texture);
            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, 4);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            gl::BindVertexArray(0);
            gl::UseProgram(0);
        }
    }

    pub fn release(&mut self) {
        unsafe {
            if self.vao != 0 {
                gl::DeleteVertexArrays(1, &self.vao);
                self.vao = 0;
            }
            if self.program != 0 {
                gl::DeleteProgram(self.program);
                self.program = 0;
            }
        }
    }
}
