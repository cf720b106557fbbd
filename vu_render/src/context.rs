//! Context facade: the application's single entry point to a renderer.

use std::time::Duration;
use crate::error::{Error, Result};
use crate::pass::Pass;
use crate::renderer::{FrameStatus, Renderer, RendererStats};
use crate::resource::{
    ImageData, InstanceData, InstanceId, MeshData, MeshId, TextureId, TextureInfo,
};
use crate::shader::{ShaderConfig, ShaderId};
use crate::engine_debug;

/// Wraps a backend and turns `draw` into begin/draw/end
///
/// Generic over the backend so the per-frame path is statically dispatched.
///
/// # Example
///
/// ```ignore
/// let mut ctx = Context::new(VulkanRenderer::new(&window, RendererConfig::default())?);
/// let mesh = ctx.load_mesh(&mesh_data)?;
/// loop {
///     ctx.draw(&passes, dt)?;
/// }
/// ```
pub struct Context<R: Renderer> {
    renderer: R,
    elapsed: Duration,
    frames: u64,
    skipped: u64,
    disposed: bool,
}

impl<R: Renderer> Context<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            elapsed: Duration::ZERO,
            frames: 0,
            skipped: 0,
            disposed: false,
        }
    }

    /// Render one frame
    ///
    /// A skipped frame (swapchain resize) is not an error; call again next tick.
    ///
    /// # Arguments
    ///
    /// * `passes` - The 3D pass, then optionally the 2D pass
    /// * `dt` - Time since the previous tick
    pub fn draw(&mut self, passes: &[Pass], dt: Duration) -> Result<()> {
        self.elapsed += dt;
        match self.renderer.begin_frame()? {
            FrameStatus::Skipped => {
                self.skipped += 1;
                engine_debug!("vu::frame", "Frame skipped (swapchain resize)");
                Ok(())
            }
            FrameStatus::Ready => {
                self.renderer.draw_frame(passes)?;
                self.renderer.end_frame()?;
                self.frames += 1;
                Ok(())
            }
        }
    }

    // ===== TEXTURES =====

    pub fn load_texture(&mut self, image: &ImageData) -> Result<TextureId> {
        self.renderer.load_texture(image)
    }

    pub fn update_texture(&mut self, id: TextureId, image: &ImageData) -> Result<()> {
        self.renderer.update_texture(id, image)
    }

    pub fn drop_texture(&mut self, id: TextureId) {
        self.renderer.drop_texture(id)
    }

    pub fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.renderer.texture_info(id)
    }

    // ===== MESHES AND INSTANCES =====

    pub fn load_mesh(&mut self, mesh: &MeshData) -> Result<MeshId> {
        self.renderer
            .load_meshes(std::slice::from_ref(mesh))?
            .first()
            .copied()
            .ok_or_else(|| Error::BackendError("load_meshes returned no ID".to_string()))
    }

    pub fn load_meshes(&mut self, meshes: &[MeshData]) -> Result<Vec<MeshId>> {
        self.renderer.load_meshes(meshes)
    }

    pub fn drop_mesh(&mut self, id: MeshId) {
        self.renderer.drop_mesh(id)
    }

    pub fn load_instance_data(&mut self, data: &InstanceData) -> Result<InstanceId> {
        self.renderer.load_instance_data(data)
    }

    pub fn update_instance_data(&mut self, id: InstanceId, data: &InstanceData) -> Result<()> {
        self.renderer.update_instance_data(id, data)
    }

    pub fn drop_instance_data(&mut self, id: InstanceId) {
        self.renderer.drop_instance_data(id)
    }

    // ===== SHADERS =====

    pub fn load_shader(&mut self, config: &ShaderConfig) -> Result<ShaderId> {
        self.renderer.load_shader(config)
    }

    pub fn drop_shader(&mut self, id: ShaderId) {
        self.renderer.drop_shader(id)
    }

    // ===== FRAME STATE =====

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.renderer.set_clear_color(r, g, b, a)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height)
    }

    pub fn size(&self) -> (u32, u32) {
        self.renderer.size()
    }

    pub fn stats(&self) -> RendererStats {
        self.renderer.stats()
    }

    /// Total `dt` passed to `draw`
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Frames rendered and frames skipped
    pub fn frame_counts(&self) -> (u64, u64) {
        (self.frames, self.skipped)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Release every GPU resource. Later calls do nothing.
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.renderer.dispose();
            self.disposed = true;
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
