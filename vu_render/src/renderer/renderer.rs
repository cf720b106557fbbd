/// Renderer trait - the backend capability interface

use crate::error::Result;
use crate::pass::Pass;
use crate::resource::{
    ImageData, InstanceData, InstanceId, MeshData, MeshId, TextureId, TextureInfo,
};
use crate::shader::{ShaderConfig, ShaderId};

// ============================================================================
// Common types
// ============================================================================

/// Outcome of [`Renderer::begin_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A swapchain image was acquired, the frame can be drawn
    Ready,
    /// No frame this tick (swapchain being recreated or just scheduled for
    /// recreation). Not an error: try again next tick.
    Skipped,
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Number of draw calls last frame
    pub draw_calls: u32,
    /// Number of triangles drawn last frame
    pub triangles: u32,
    /// Mesh bytes uploaded since startup
    pub mesh_bytes: u64,
    /// Instance bytes uploaded since startup
    pub instance_bytes: u64,
    /// Texture bytes uploaded since startup
    pub texture_bytes: u64,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Backend capability interface
///
/// One concrete implementation per backend, chosen at startup. The frame
/// methods are called in order `begin_frame` → `draw_frame` → `end_frame`;
/// `draw_frame` and `end_frame` are only called after `FrameStatus::Ready`.
pub trait Renderer {
    /// Wait for the current frame slot, then acquire a swapchain image
    fn begin_frame(&mut self) -> Result<FrameStatus>;

    /// Record the frame's command buffer from the passes
    ///
    /// # Arguments
    ///
    /// * `passes` - Index 0 is the 3D pass, index 1 (if present) the 2D pass
    fn draw_frame(&mut self, passes: &[Pass]) -> Result<()>;

    /// Submit and present, then advance to the next frame slot
    fn end_frame(&mut self) -> Result<()>;

    // ===== TEXTURES =====

    /// Upload an RGBA8 image
    fn load_texture(&mut self, image: &ImageData) -> Result<TextureId>;

    /// Re-upload an image in place
    ///
    /// # Errors
    ///
    /// `Error::LayoutMismatch` if the dimensions differ from the loaded texture,
    /// which is left untouched.
    fn update_texture(&mut self, id: TextureId, image: &ImageData) -> Result<()>;

    /// Release a texture. Materials still referencing it must not be drawn again.
    fn drop_texture(&mut self, id: TextureId);

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo>;

    // ===== MESHES AND INSTANCES =====

    /// Upload a batch of meshes into the shared vertex pools
    fn load_meshes(&mut self, meshes: &[MeshData]) -> Result<Vec<MeshId>>;

    /// Release a mesh's pool ranges
    fn drop_mesh(&mut self, id: MeshId);

    fn load_instance_data(&mut self, data: &InstanceData) -> Result<InstanceId>;

    /// Re-upload instance data in place
    ///
    /// # Errors
    ///
    /// `Error::LayoutMismatch` if any kind's count or stride differs.
    fn update_instance_data(&mut self, id: InstanceId, data: &InstanceData) -> Result<()>;

    fn drop_instance_data(&mut self, id: InstanceId);

    // ===== SHADERS =====

    /// Build a shader's pipeline and descriptor resources
    fn load_shader(&mut self, config: &ShaderConfig) -> Result<ShaderId>;

    /// Release a shader's pipeline and descriptor resources
    fn drop_shader(&mut self, id: ShaderId);

    // ===== FRAME STATE =====

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    /// Request a swapchain resize, applied by the next `begin_frame`
    fn resize(&mut self, width: u32, height: u32);

    /// Current frame size
    fn size(&self) -> (u32, u32);

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Idle the device and release every resource. Further calls are invalid.
    fn dispose(&mut self);
}
