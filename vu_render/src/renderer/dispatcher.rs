//! Draw Dispatcher: turns the frame's passes into recorded commands.
//!
//! Passes are drawn 3D then 2D, each packet in list order. Within a pass the
//! pipeline (and scene uniforms) are rebound only when the packet's shader
//! changes, and the material set only when its textures or material data change. Model
//! uniforms are pushed before every draw. Each pass starts with nothing bound.
//!
//! A packet that cannot be drawn (unknown shader, mesh or instance data,
//! shader of the other pass, missing attribute, wrong texture count, material
//! slots exhausted, unloaded texture) is logged and skipped; the frame goes on.

use crate::error::Result;
use crate::pass::{Packet, Pass, PassId};
use crate::renderer::command_list::{ClearValue, CommandList, Rect2D, Viewport};
use crate::resource::{BufferPools, PoolBuffer, VertexKind};
use crate::shader::{
    AttributeSource, MaterialId, RenderFlags, ShaderEntry, ShaderId, ShaderRegistry,
};
use crate::{engine_trace, engine_warn};

/// What the dispatcher needs to know about the frame being recorded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTarget {
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    /// Swapchain image being rendered; selects uniform regions and descriptor sets
    pub image_index: usize,
}

/// Counters for one recorded frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub draw_calls: u32,
    pub triangles: u32,
    pub skipped: u32,
}

/// Records frames, reusing its scratch buffers across frames
#[derive(Debug, Default)]
pub struct Dispatcher {
    scene: Vec<u8>,
    model: Vec<u8>,
    material: Vec<u8>,
    bindings: Vec<(u32, PoolBuffer, u64)>,
}

/// Per-pass binding state
#[derive(Default)]
struct Bound {
    shader: Option<ShaderId>,
    material: Option<MaterialId>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record both passes into `cmd`
    ///
    /// # Errors
    ///
    /// Only command recording errors are returned. Undrawable packets are skipped.
    pub fn record<C: CommandList>(
        &mut self,
        cmd: &mut C,
        shaders: &mut ShaderRegistry<C::Shader>,
        pools: &BufferPools,
        passes: &[Pass],
        target: &FrameTarget,
    ) -> Result<DrawStats> {
        let mut stats = DrawStats::default();
        shaders.reset_scene_flags();

        if passes.len() > PassId::ALL.len() {
            engine_warn!("vu::render", "{} passes submitted, only the first {} are drawn",
                passes.len(), PassId::ALL.len());
        }

        cmd.set_viewport(Viewport::full(target.width, target.height))?;
        cmd.set_scissor(Rect2D::full(target.width, target.height))?;

        for pass_id in PassId::ALL {
            let clear_values = match pass_id {
                PassId::Pass3D => vec![
                    ClearValue::Color(target.clear_color),
                    ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
                ],
                PassId::Pass2D => Vec::new(),
            };
            cmd.begin_render_pass(pass_id, &clear_values)?;

            if let Some(pass) = passes.get(pass_id.index()) {
                if pass.id() != pass_id {
                    engine_warn!("vu::render", "Pass at index {} is {:?}, expected {:?}; its packets are skipped",
                        pass_id.index(), pass.id(), pass_id);
                    stats.skipped += pass.packets.len() as u32;
                } else {
                    let mut bound = Bound::default();
                    for packet in pass.packets.iter() {
                        if !self.draw_packet(cmd, shaders, pools, pass, packet, target, &mut bound, &mut stats)? {
                            stats.skipped += 1;
                        }
                    }
                }
            }

            cmd.end_render_pass()?;
        }

        engine_trace!("vu::render", "Recorded frame: {} draws, {} triangles, {} skipped",
            stats.draw_calls, stats.triangles, stats.skipped);
        Ok(stats)
    }

    /// Record one packet. `Ok(false)` means the packet was skipped.
    #[allow(clippy::too_many_arguments)]
    fn draw_packet<C: CommandList>(
        &mut self,
        cmd: &mut C,
        shaders: &mut ShaderRegistry<C::Shader>,
        pools: &BufferPools,
        pass: &Pass,
        packet: &Packet,
        target: &FrameTarget,
        bound: &mut Bound,
        stats: &mut DrawStats,
    ) -> Result<bool> {
        let Some(entry) = shaders.get_mut(packet.shader) else {
            engine_warn!("vu::render", "Packet {}: shader {} is not loaded", packet.tag, packet.shader);
            return Ok(false);
        };
        if entry.config.pass != pass.id() {
            engine_warn!("vu::render", "Packet {}: shader '{}' belongs to {:?}, not {:?}",
                packet.tag, entry.config.name, entry.config.pass, pass.id());
            return Ok(false);
        }
        let Some(mesh) = pools.mesh(packet.mesh) else {
            engine_warn!("vu::render", "Packet {}: mesh {} is not loaded", packet.tag, packet.mesh);
            return Ok(false);
        };
        if mesh.index_count() == 0 {
            engine_warn!("vu::render", "Packet {}: mesh {} has no indices", packet.tag, packet.mesh);
            return Ok(false);
        }
        let instance = match packet.instance {
            Some(r) => match pools.instance(r.id) {
                Some(record) => Some((record, r.count)),
                None => {
                    engine_warn!("vu::render", "Packet {}: instance data {} is not loaded", packet.tag, r.id);
                    return Ok(false);
                }
            },
            None => None,
        };

        // Resolve vertex inputs before binding anything
        self.bindings.clear();
        for (binding, attr) in entry.config.attributes.iter().enumerate() {
            let (buffer, range) = match attr.name.source() {
                AttributeSource::Vertex(kind) => (PoolBuffer::Vertex(kind), mesh.range(kind)),
                AttributeSource::Instance(kind) => match instance {
                    Some((record, _)) => (PoolBuffer::Instance(kind), record.range(kind)),
                    None => {
                        engine_warn!("vu::render", "Packet {}: shader '{}' is instanced but the packet has no instance data",
                            packet.tag, entry.config.name);
                        return Ok(false);
                    }
                },
            };
            if range.count == 0 {
                engine_warn!("vu::render", "Packet {}: no {:?} data for shader '{}'",
                    packet.tag, attr.name, entry.config.name);
                return Ok(false);
            }
            self.bindings.push((binding as u32, buffer, range.offset));
        }

        let layout_has_material = entry.layout.has_material();
        if layout_has_material && packet.textures.len() != entry.layout.samplers.len() {
            engine_warn!("vu::render", "Packet {}: shader '{}' samples {} texture(s), packet has {}",
                packet.tag, entry.config.name, entry.layout.samplers.len(), packet.textures.len());
            return Ok(false);
        }

        if bound.shader != Some(packet.shader) {
            cmd.bind_pipeline(&entry.backend)?;
            if entry.layout.has_scene() {
                entry.layout.pack_scene(pass, &mut self.scene);
                let write = !entry.is_scene_written(target.image_index);
                cmd.bind_scene_uniforms(&entry.backend, &self.scene, write)?;
                entry.mark_scene_written(target.image_index);
            }
            bound.shader = Some(packet.shader);
            bound.material = None;
        }

        if layout_has_material && !self.bind_material(cmd, entry, packet, target, bound)? {
            return Ok(false);
        }

        if entry.layout.has_model() {
            entry.layout.pack_model(packet, &mut self.model);
            cmd.push_constants(&entry.backend, 0, &self.model)?;
        }

        for &(binding, buffer, offset) in &self.bindings {
            cmd.bind_vertex_buffer(binding, buffer, offset)?;
        }
        cmd.bind_index_buffer(mesh.range(VertexKind::Index).offset)?;

        let index_count = mesh.index_count();
        let instances = instance.map(|(_, count)| count).unwrap_or(1);
        cmd.draw_indexed(index_count, instances, 0, 0, 0)?;

        stats.draw_calls += 1;
        if !entry.config.render.contains(RenderFlags::DRAW_LINES) {
            stats.triangles += index_count / 3 * instances;
        }
        Ok(true)
    }

    /// Resolve and bind the packet's material. `Ok(false)` means skip the packet.
    fn bind_material<C: CommandList>(
        &mut self,
        cmd: &mut C,
        entry: &mut ShaderEntry<C::Shader>,
        packet: &Packet,
        target: &FrameTarget,
        bound: &mut Bound,
    ) -> Result<bool> {
        entry.layout.pack_material(packet, &mut self.material);
        let material = match entry.materials.resolve(&packet.textures, &self.material) {
            Ok(id) => id,
            Err(e) => {
                engine_warn!("vu::render", "Packet {}: shader '{}': {}", packet.tag, entry.config.name, e);
                return Ok(false);
            }
        };
        if bound.material == Some(material) {
            return Ok(true);
        }

        let write = !entry.materials.is_written(material, target.image_index);
        if let Err(e) = cmd.bind_material(&entry.backend, material, &packet.textures, &self.material, write) {
            engine_warn!("vu::render", "Packet {}: material {} of shader '{}' not bound: {}",
                packet.tag, material, entry.config.name, e);
            return Ok(false);
        }
        if write {
            entry.materials.mark_written(material, target.image_index);
        }
        bound.material = Some(material);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
