/// CommandList trait - records one frame's draw commands

use crate::error::Result;
use crate::pass::PassId;
use crate::resource::{PoolBuffer, TextureId};
use crate::shader::MaterialId;

/// Command recording for one frame slot
///
/// A command list is bound to the frame's swapchain image: descriptor writes
/// target that image's uniform regions and descriptor sets.
pub trait CommandList {
    /// Backend pipeline objects of a loaded shader
    type Shader;

    /// Begin one of the two render passes
    ///
    /// # Arguments
    ///
    /// * `pass` - Which pass
    /// * `clear_values` - One per cleared attachment, empty for the 2D pass
    fn begin_render_pass(&mut self, pass: PassId, clear_values: &[ClearValue]) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a shader's graphics pipeline
    fn bind_pipeline(&mut self, shader: &Self::Shader) -> Result<()>;

    /// Copy scene uniform bytes into this image's region and bind set 0
    ///
    /// # Arguments
    ///
    /// * `data` - Packed scene region
    /// * `write_descriptor` - Point the descriptor set at the region first
    fn bind_scene_uniforms(&mut self, shader: &Self::Shader, data: &[u8], write_descriptor: bool) -> Result<()>;

    /// Bind a material's descriptor set (set 1)
    ///
    /// When `write_descriptor` is set the material data bytes are copied into
    /// the material's region and the sampler bindings are written from
    /// `textures` before binding.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` if a texture is not loaded.
    fn bind_material(
        &mut self,
        shader: &Self::Shader,
        material: MaterialId,
        textures: &[TextureId],
        data: &[u8],
        write_descriptor: bool,
    ) -> Result<()>;

    /// Push model-scope uniform bytes
    fn push_constants(&mut self, shader: &Self::Shader, offset: u32, data: &[u8]) -> Result<()>;

    /// Bind one pool buffer at a vertex input binding
    ///
    /// # Arguments
    ///
    /// * `binding` - Vertex input binding (the attribute's index in the shader config)
    /// * `buffer` - Which pool
    /// * `offset` - Byte offset of the mesh or instance range in the pool
    fn bind_vertex_buffer(&mut self, binding: u32, buffer: PoolBuffer, offset: u64) -> Result<()>;

    /// Bind the 16-bit index pool at a byte offset
    fn bind_index_buffer(&mut self, offset: u64) -> Result<()>;

    /// Draw indexed, optionally instanced
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-frame viewport with depth range 0..1
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32, min_depth: 0.0, max_depth: 1.0 }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
