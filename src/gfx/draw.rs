use super::math::{Color, Rect, Vec2};
use super::surface::{Stroke, Surface};
use anyhow::Result;
use glow::HasContext;
use std::f32::consts::TAU;

// Seven-segment mapping, segments a..g
const SEGMENT_MAP: [[bool; 7]; 10] = [
    [true, true, true, true, true, true, false],     // 0
    [false, true, true, false, false, false, false], // 1
    [true, true, false, true, true, false, true],    // 2
    [true, true, true, true, false, false, true],    // 3
    [false, true, true, false, false, true, true],   // 4
    [true, false, true, true, false, true, true],    // 5
    [true, false, true, true, true, true, true],     // 6
    [true, true, true, false, false, false, false],  // 7
    [true, true, true, true, true, true, true],      // 8
    [true, true, true, true, false, true, true],     // 9
];

const GLYPH_WIDTH: f32 = 0.55;
const GLYPH_SPACING: f32 = 0.2;
const GLYPH_THICKNESS: f32 = 0.12;

/// Thinner strokes vanish under GLES2 without multisampling.
const MIN_STROKE: f32 = 1.0;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
}

/// Immediate-mode GLES2 renderer for clock faces.
///
/// Every primitive is uploaded and drawn with its own colour uniform.
pub struct DrawContext {
    gl: glow::Context,
    program: glow::Program,
    vbo: glow::Buffer,
    vertices: Vec<Vertex>,
    origin: Vec2,

    u_viewport: Option<glow::UniformLocation>,
    u_color: Option<glow::UniformLocation>,
    a_pos: Option<u32>,
}

impl DrawContext {
    pub fn new(gl: glow::Context, program: glow::Program) -> Result<Self> {
        let vbo = unsafe {
            gl.create_buffer()
                .map_err(|e| anyhow::anyhow!("Failed to create buffer: {}", e))?
        };

        let u_viewport = unsafe { gl.get_uniform_location(program, "uViewport") };
        let u_color = unsafe { gl.get_uniform_location(program, "uColor") };
        let a_pos = unsafe { gl.get_attrib_location(program, "aPos") };

        Ok(Self {
            gl,
            program,
            vbo,
            vertices: Vec::with_capacity(1024),
            origin: Vec2::default(),
            u_viewport,
            u_color,
            a_pos,
        })
    }

    pub fn begin(&mut self, viewport_px: [f32; 2], background: Color) {
        self.origin = Vec2::default();
        self.vertices.clear();

        unsafe {
            self.gl.viewport(0, 0, viewport_px[0] as i32, viewport_px[1] as i32);
            self.gl.clear_color(background.r, background.g, background.b, background.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);

            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            self.gl.use_program(Some(self.program));
            if let Some(loc) = self.u_viewport.as_ref() {
                self.gl.uniform_2_f32(Some(loc), viewport_px[0], viewport_px[1]);
            }
        }
    }

    /// Offsets everything drawn afterwards, so each face can paint in its
    /// own coordinates.
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    pub fn rect(&mut self, rect: Rect, color: Color) {
        let a = Vec2::new(rect.x, rect.y);
        let b = Vec2::new(rect.x + rect.width, rect.y);
        let c = Vec2::new(rect.x + rect.width, rect.y + rect.height);
        let d = Vec2::new(rect.x, rect.y + rect.height);
        self.push_quad(a, b, c, d);
        self.draw(color);
    }

    pub fn flush(&mut self) {
        unsafe {
            self.gl.flush();
        }
    }

    fn push_vertex(&mut self, p: Vec2) {
        let p = p + self.origin;
        self.vertices.push(Vertex { pos: [p.x, p.y] });
    }

    fn push_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2) {
        self.push_vertex(a);
        self.push_vertex(b);
        self.push_vertex(c);
    }

    fn push_quad(&mut self, a: Vec2, b: Vec2, c: Vec2, d: Vec2) {
        self.push_triangle(a, b, c);
        self.push_triangle(a, c, d);
    }

    fn push_segment(&mut self, from: Vec2, to: Vec2, width: f32) {
        let half = (to - from).normalized().perp() * (width.max(MIN_STROKE) / 2.0);
        self.push_quad(from + half, to + half, to - half, from - half);
    }

    fn draw(&mut self, color: Color) {
        if self.vertices.is_empty() {
            return;
        }

        unsafe {
            if let Some(loc) = self.u_color.as_ref() {
                self.gl.uniform_4_f32(Some(loc), color.r, color.g, color.b, color.a);
            }

            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&self.vertices),
                glow::DYNAMIC_DRAW,
            );

            if let Some(a_pos) = self.a_pos {
                self.gl.enable_vertex_attrib_array(a_pos);
                self.gl.vertex_attrib_pointer_f32(
                    a_pos,
                    2,
                    glow::FLOAT,
                    false,
                    std::mem::size_of::<Vertex>() as i32,
                    0,
                );
            }

            self.gl.draw_arrays(glow::TRIANGLES, 0, self.vertices.len() as i32);
        }

        self.vertices.clear();
    }
}

fn circle_steps(radius: f32) -> usize {
    ((radius * 0.75) as usize).clamp(24, 180)
}

impl Surface for DrawContext {
    fn line(&mut self, from: Vec2, to: Vec2, stroke: Stroke) {
        self.push_segment(from, to, stroke.width);
        self.draw(stroke.color);
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, stroke: Stroke) {
        let half = stroke.width.max(MIN_STROKE) / 2.0;
        let steps = circle_steps(radius);

        for i in 0..steps {
            let a0 = TAU * i as f32 / steps as f32;
            let a1 = TAU * (i + 1) as f32 / steps as f32;
            let (u0, u1) = (
                Vec2::new(a0.cos(), a0.sin()),
                Vec2::new(a1.cos(), a1.sin()),
            );
            self.push_quad(
                center + u0 * (radius - half),
                center + u0 * (radius + half),
                center + u1 * (radius + half),
                center + u1 * (radius - half),
            );
        }
        self.draw(stroke.color);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        let radius = radius.max(MIN_STROKE / 2.0);
        let steps = circle_steps(radius);

        for i in 0..steps {
            let a0 = TAU * i as f32 / steps as f32;
            let a1 = TAU * (i + 1) as f32 / steps as f32;
            self.push_triangle(
                center,
                center + Vec2::new(a0.cos(), a0.sin()) * radius,
                center + Vec2::new(a1.cos(), a1.sin()) * radius,
            );
        }
        self.draw(color);
    }

    /// Only digits are drawn; anything else leaves a blank cell.
    fn text(&mut self, text: &str, anchor: Vec2, size: f32, color: Color) {
        let glyph_width = size * GLYPH_WIDTH;
        let spacing = size * GLYPH_SPACING;
        let thickness = size * GLYPH_THICKNESS;

        let count = text.chars().count() as f32;
        let total_width = count * glyph_width + (count - 1.0).max(0.0) * spacing;
        let top = anchor.y - size;
        let mut x = anchor.x - total_width / 2.0;

        for ch in text.chars() {
            if let Some(digit) = ch.to_digit(10) {
                self.push_digit(digit as usize, Vec2::new(x, top), glyph_width, size, thickness);
            }
            x += glyph_width + spacing;
        }
        self.draw(color);
    }
}

impl DrawContext {
    fn push_digit(&mut self, digit: usize, top_left: Vec2, width: f32, height: f32, thickness: f32) {
        let (left, right) = (top_left.x, top_left.x + width);
        let (top, mid, bottom) = (top_left.y, top_left.y + height / 2.0, top_left.y + height);

        let segments = [
            (Vec2::new(left, top), Vec2::new(right, top)),
            (Vec2::new(right, top), Vec2::new(right, mid)),
            (Vec2::new(right, mid), Vec2::new(right, bottom)),
            (Vec2::new(left, bottom), Vec2::new(right, bottom)),
            (Vec2::new(left, mid), Vec2::new(left, bottom)),
            (Vec2::new(left, top), Vec2::new(left, mid)),
            (Vec2::new(left, mid), Vec2::new(right, mid)),
        ];

        for (&on, (from, to)) in SEGMENT_MAP[digit].iter().zip(segments) {
            if on {
                self.push_segment(from, to, thickness);
            }
        }
    }
}

impl Drop for DrawContext {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.vbo);
        }
    }
}
