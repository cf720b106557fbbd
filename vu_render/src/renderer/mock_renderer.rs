/// Mock Renderer for unit tests (no GPU required)
///
/// `MockCommandList` records one string per command so tests can assert the
/// exact command stream. `MockRenderer` drives the real frame ring, resize
/// tracker, buffer pools, shader registry and dispatcher on top of it.

use rustc_hash::FxHashSet;
use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::frame::{FrameRing, ResizeTracker};
use crate::pass::{Pass, PassId};
use crate::renderer::command_list::{ClearValue, CommandList, Rect2D, Viewport};
use crate::renderer::dispatcher::{Dispatcher, FrameTarget};
use crate::renderer::renderer::{FrameStatus, Renderer, RendererStats};
use crate::resource::{
    BufferPools, BufferUploader, ImageData, InstanceData, InstanceId, MeshData, MeshId,
    PoolBuffer, PoolCapacity, TextureId, TextureInfo, TextureTable,
};
use crate::shader::{MaterialId, ShaderConfig, ShaderEntry, ShaderId, ShaderRegistry, UniformLayout};
use crate::{engine_bail, engine_warn};

// ============================================================================
// Mock Command List
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockShader {
    pub name: String,
}

#[derive(Debug, Default)]
pub struct MockCommandList {
    pub commands: Vec<String>,
    /// Textures the command list can bind
    pub textures: FxHashSet<TextureId>,
    /// Material data handed over with each descriptor write
    pub material_data: Vec<Vec<u8>>,
}

impl MockCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_textures(textures: impl IntoIterator<Item = TextureId>) -> Self {
        Self { textures: textures.into_iter().collect(), ..Self::default() }
    }

    /// Commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl CommandList for MockCommandList {
    type Shader = MockShader;

    fn begin_render_pass(&mut self, pass: PassId, clear_values: &[ClearValue]) -> Result<()> {
        self.commands.push(format!("begin_pass {:?} clears={}", pass, clear_values.len()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.commands.push(format!("viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.commands.push(format!("scissor {}x{}", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, shader: &MockShader) -> Result<()> {
        self.commands.push(format!("pipeline {}", shader.name));
        Ok(())
    }

    fn bind_scene_uniforms(&mut self, shader: &MockShader, data: &[u8], write_descriptor: bool) -> Result<()> {
        self.commands.push(format!("scene {} bytes={} write={}", shader.name, data.len(), write_descriptor));
        Ok(())
    }

    fn bind_material(
        &mut self,
        shader: &MockShader,
        material: MaterialId,
        textures: &[TextureId],
        data: &[u8],
        write_descriptor: bool,
    ) -> Result<()> {
        if let Some(missing) = textures.iter().find(|t| !self.textures.contains(t)) {
            return Err(Error::InvalidResource(format!("texture {} is not loaded", missing)));
        }
        if write_descriptor {
            self.material_data.push(data.to_vec());
        }
        self.commands.push(format!("material {} {} write={}", shader.name, material, write_descriptor));
        Ok(())
    }

    fn push_constants(&mut self, shader: &MockShader, offset: u32, data: &[u8]) -> Result<()> {
        self.commands.push(format!("push {} {}+{}", shader.name, offset, data.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: PoolBuffer, offset: u64) -> Result<()> {
        self.commands.push(format!("vertex {} {:?} @{}", binding, buffer, offset));
        Ok(())
    }

    fn bind_index_buffer(&mut self, offset: u64) -> Result<()> {
        self.commands.push(format!("index @{}", offset));
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.commands.push(format!(
            "draw {} x{} {} {} {}", index_count, instance_count, first_index, vertex_offset, first_instance
        ));
        Ok(())
    }
}

// ============================================================================
// Mock Uploader
// ============================================================================

/// Keeps pool contents in memory
#[derive(Debug, Default)]
pub struct MockUploader {
    pub uploads: Vec<(PoolBuffer, u64, usize)>,
}

impl BufferUploader for MockUploader {
    fn upload(&mut self, buffer: PoolBuffer, offset: u64, bytes: &[u8]) -> Result<()> {
        self.uploads.push((buffer, offset, bytes.len()));
        Ok(())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

pub struct MockRenderer {
    config: RendererConfig,
    pools: BufferPools,
    uploader: MockUploader,
    textures: TextureTable<ImageData>,
    shaders: ShaderRegistry<MockShader>,
    ring: FrameRing,
    resize: ResizeTracker,
    dispatcher: Dispatcher,
    clear_color: [f32; 4],
    image_index: usize,
    recording: Option<MockCommandList>,
    stats: RendererStats,
    /// Command streams of every submitted frame
    pub submitted: Vec<Vec<String>>,
    /// Number of swapchain recreations
    pub recreations: u32,
    /// Simulate an out-of-date surface on the next acquire
    pub out_of_date_next: bool,
    pub disposed: bool,
}

impl MockRenderer {
    pub fn new(config: RendererConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pools: BufferPools::new(PoolCapacity::from_space(config.vertex_space, config.instance_space)),
            uploader: MockUploader::default(),
            textures: TextureTable::new(),
            shaders: ShaderRegistry::new(),
            ring: FrameRing::new(config.frame_count as usize),
            resize: ResizeTracker::new(config.width, config.height),
            dispatcher: Dispatcher::new(),
            clear_color: config.clear_color,
            image_index: 0,
            recording: None,
            stats: RendererStats::default(),
            submitted: Vec::new(),
            recreations: 0,
            out_of_date_next: false,
            disposed: false,
            config,
        })
    }

    pub fn ring(&self) -> &FrameRing {
        &self.ring
    }

    pub fn pools(&self) -> &BufferPools {
        &self.pools
    }

    pub fn texture_pixels(&self, id: TextureId) -> Option<&[u8]> {
        self.textures.get(id).map(|image| image.pixels.as_slice())
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }
}

impl Renderer for MockRenderer {
    fn begin_frame(&mut self) -> Result<FrameStatus> {
        if self.resize.is_resizing() {
            if let Some((w, h)) = self.resize.begin_recreate() {
                self.recreations += 1;
                self.resize.finish(w, h);
            }
            return Ok(FrameStatus::Skipped);
        }

        self.ring.mark_waited();

        if self.out_of_date_next {
            self.out_of_date_next = false;
            self.resize.schedule();
            return Ok(FrameStatus::Skipped);
        }
        self.image_index = (self.image_index + 1) % self.config.image_count as usize;
        Ok(FrameStatus::Ready)
    }

    fn draw_frame(&mut self, passes: &[Pass]) -> Result<()> {
        self.ring.begin_recording()?;
        let mut cmd = MockCommandList::with_textures(self.textures.ids());
        let (width, height) = self.resize.size();
        let target = FrameTarget {
            width,
            height,
            clear_color: self.clear_color,
            image_index: self.image_index,
        };
        let frame = self.dispatcher.record(&mut cmd, &mut self.shaders, &self.pools, passes, &target)?;
        self.stats.draw_calls = frame.draw_calls;
        self.stats.triangles = frame.triangles;
        self.recording = Some(cmd);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let Some(cmd) = self.recording.take() else {
            engine_bail!("vu::render", "end_frame called without a recorded frame");
        };
        self.ring.mark_submitted()?;
        self.submitted.push(cmd.commands);
        self.ring.advance();
        Ok(())
    }

    fn load_texture(&mut self, image: &ImageData) -> Result<TextureId> {
        image.validate()?;
        self.stats.texture_bytes += image.byte_len();
        let info = TextureInfo { width: image.width, height: image.height };
        Ok(self.textures.insert(info, image.clone()))
    }

    fn update_texture(&mut self, id: TextureId, image: &ImageData) -> Result<()> {
        self.textures.check_update(id, image)?;
        if let Some(pixels) = self.textures.get_mut(id) {
            *pixels = image.clone();
        }
        self.stats.texture_bytes += image.byte_len();
        Ok(())
    }

    fn drop_texture(&mut self, id: TextureId) {
        self.textures.remove(id);
    }

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.textures.info(id)
    }

    fn load_meshes(&mut self, meshes: &[MeshData]) -> Result<Vec<MeshId>> {
        self.pools.load_meshes(&mut self.uploader, meshes)
    }

    fn drop_mesh(&mut self, id: MeshId) {
        self.pools.drop_mesh(id);
    }

    fn load_instance_data(&mut self, data: &InstanceData) -> Result<InstanceId> {
        self.pools.load_instance_data(&mut self.uploader, data)
    }

    fn update_instance_data(&mut self, id: InstanceId, data: &InstanceData) -> Result<()> {
        self.pools.update_instance_data(&mut self.uploader, id, data)
    }

    fn drop_instance_data(&mut self, id: InstanceId) {
        self.pools.drop_instance_data(id);
    }

    fn load_shader(&mut self, config: &ShaderConfig) -> Result<ShaderId> {
        config.validate()?;
        let layout = UniformLayout::derive(config)?;
        let entry = ShaderEntry::new(
            config.clone(),
            layout,
            self.config.max_materials as usize,
            self.config.image_count as usize,
            MockShader { name: config.name.clone() },
        );
        self.shaders.insert(entry).map_err(|(e, _)| e)
    }

    fn drop_shader(&mut self, id: ShaderId) {
        if self.shaders.remove(id).is_none() {
            engine_warn!("vu::render", "drop_shader: shader {} is not loaded", id);
        }
    }

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = [r, g, b, a];
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resize.request(width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.resize.size()
    }

    fn stats(&self) -> RendererStats {
        RendererStats {
            mesh_bytes: self.pools.mesh_bytes(),
            instance_bytes: self.pools.instance_bytes(),
            ..self.stats
        }
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn dispose(&mut self) {
        self.shaders.drain();
        self.textures.drain().for_each(drop);
        self.disposed = true;
    }
}

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
