use anyhow::{anyhow, bail, Result};
use glow::HasContext;

pub const UI_VERTEX_SHADER: &str = include_str!("../../assets/shaders/ui.vert.glsl");
pub const UI_FRAGMENT_SHADER: &str = include_str!("../../assets/shaders/ui.frag.glsl");

fn compile_shader(gl: &glow::Context, stage: u32, source: &str) -> Result<glow::Shader> {
    let stage_name = match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    };

    unsafe {
        let shader = gl
            .create_shader(stage)
            .map_err(|e| anyhow!("Failed to create {} shader: {}", stage_name, e))?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let info = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            bail!("{} shader compilation failed: {}", stage_name, info);
        }

        Ok(shader)
    }
}

/// Compiles and links a program; the shader objects are released either way.
pub fn load_shader_program(gl: &glow::Context, vert_src: &str, frag_src: &str) -> Result<glow::Program> {
    let vertex = compile_shader(gl, glow::VERTEX_SHADER, vert_src)?;
    let fragment = match compile_shader(gl, glow::FRAGMENT_SHADER, frag_src) {
        Ok(fragment) => fragment,
        Err(e) => {
            unsafe { gl.delete_shader(vertex) };
            return Err(e);
        }
    };

    unsafe {
        let linked = gl
            .create_program()
            .map_err(|e| anyhow!("Failed to create program: {}", e))
            .and_then(|program| {
                gl.attach_shader(program, vertex);
                gl.attach_shader(program, fragment);
                gl.link_program(program);

                if gl.get_program_link_status(program) {
                    gl.detach_shader(program, vertex);
                    gl.detach_shader(program, fragment);
                    Ok(program)
                } else {
                    let info = gl.get_program_info_log(program);
                    gl.delete_program(program);
                    Err(anyhow!("Program linking failed: {}", info))
                }
            });

        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        linked
    }
}

/// The flat-colour program every clock face is drawn with.
pub fn load_ui_program(gl: &glow::Context) -> Result<glow::Program> {
    load_shader_program(gl, UI_VERTEX_SHADER, UI_FRAGMENT_SHADER)
}
