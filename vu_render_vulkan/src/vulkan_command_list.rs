/// VulkanCommandList - records one frame into a frame slot's command buffer

use ash::vk;
use vu_render::vu::pass::PassId;
use vu_render::vu::render::{ClearValue, CommandList, Rect2D, Viewport};
use vu_render::vu::resource::{PoolBuffer, TextureId, TextureTable, VertexKind};
use vu_render::vu::shader::MaterialId;
use vu_render::vu::{Error, Result};
use vu_render::engine_err;

use crate::vulkan_buffer_pool::GpuPools;
use crate::vulkan_context::GpuContext;
use crate::vulkan_pipeline::{material_offset, scene_offset, VulkanShader};
use crate::vulkan_render_pass::{Framebuffers, RenderPasses};
use crate::vulkan_texture::GpuTexture;

fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match *value {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

/// Command list bound to one frame slot and one swapchain image
pub struct VulkanCommandList<'a> {
    ctx: &'a GpuContext,
    command_buffer: vk::CommandBuffer,
    image_index: usize,
    extent: vk::Extent2D,
    passes: &'a RenderPasses,
    framebuffers: &'a Framebuffers,
    pools: &'a GpuPools,
    textures: &'a TextureTable<GpuTexture>,
    sampler: vk::Sampler,
}

impl<'a> VulkanCommandList<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &'a GpuContext,
        command_buffer: vk::CommandBuffer,
        image_index: usize,
        extent: vk::Extent2D,
        passes: &'a RenderPasses,
        framebuffers: &'a Framebuffers,
        pools: &'a GpuPools,
        textures: &'a TextureTable<GpuTexture>,
        sampler: vk::Sampler,
    ) -> Self {
        Self { ctx, command_buffer, image_index, extent, passes, framebuffers, pools, textures, sampler }
    }

    fn device(&self) -> &ash::Device {
        &self.ctx.device
    }

    /// Image views of `textures`, in order
    fn texture_views(&self, textures: &[TextureId]) -> Result<Vec<vk::ImageView>> {
        textures
            .iter()
            .map(|&id| {
                self.textures
                    .get(id)
                    .map(GpuTexture::view)
                    .ok_or_else(|| Error::InvalidResource(format!("texture {} is not loaded", id)))
            })
            .collect()
    }
}

impl CommandList for VulkanCommandList<'_> {
    type Shader = VulkanShader;

    fn begin_render_pass(&mut self, pass: PassId, clear_values: &[ClearValue]) -> Result<()> {
        let framebuffer = self.framebuffers.get(pass, self.image_index).ok_or_else(|| {
            engine_err!("vu::vulkan", "No {:?} framebuffer for swapchain image {}", pass, self.image_index)
        })?;

        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.passes.get(pass))
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.extent,
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device().cmd_begin_render_pass(self.command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        unsafe {
            self.device().cmd_end_render_pass(self.command_buffer);
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.device().cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.device().cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, shader: &VulkanShader) -> Result<()> {
        unsafe {
            self.device().cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, shader.pipeline);
        }
        Ok(())
    }

    fn bind_scene_uniforms(&mut self, shader: &VulkanShader, data: &[u8], write_descriptor: bool) -> Result<()> {
        let set = shader.scene_set(self.image_index)?;
        let Some(buffer) = shader.scene_uniforms.as_ref() else {
            return Err(Error::InvalidResource("shader has no scene uniforms".to_string()));
        };
        let offset = scene_offset(self.image_index);
        buffer.write(offset, data)?;

        if write_descriptor {
            let buffer_info = [vk::DescriptorBufferInfo {
                buffer: buffer.buffer,
                offset,
                range: shader.scene_size.max(data.len() as u64),
            }];
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_info);
            unsafe {
                self.device().update_descriptor_sets(&[write], &[]);
            }
        }

        unsafe {
            self.device().cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                shader.pipeline_layout,
                0,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    fn bind_material(
        &mut self,
        shader: &VulkanShader,
        material: MaterialId,
        textures: &[TextureId],
        data: &[u8],
        write_descriptor: bool,
    ) -> Result<()> {
        // Everything is checked before anything is written or recorded
        let views = self.texture_views(textures)?;
        let set = shader.material_set(material as usize, self.image_index)?;

        if write_descriptor {
            let mut buffer_info = Vec::new();
            if let Some(buffer) = shader.material_uniforms.as_ref() {
                let offset = material_offset(material as usize, self.image_index, shader.image_count);
                buffer.write(offset, data)?;
                buffer_info.push(vk::DescriptorBufferInfo {
                    buffer: buffer.buffer,
                    offset,
                    range: shader.material_size.max(data.len() as u64),
                });
            }

            let image_infos: Vec<[vk::DescriptorImageInfo; 1]> = views
                .iter()
                .map(|&view| [vk::DescriptorImageInfo {
                    sampler: self.sampler,
                    image_view: view,
                    image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                }])
                .collect();

            let mut writes = Vec::with_capacity(1 + image_infos.len());
            if !buffer_info.is_empty() {
                writes.push(vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_info));
            }
            for (i, image_info) in image_infos.iter().enumerate() {
                writes.push(vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(shader.first_sampler_binding + i as u32)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(image_info));
            }

            unsafe {
                self.device().update_descriptor_sets(&writes, &[]);
            }
        }

        unsafe {
            self.device().cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                shader.pipeline_layout,
                1,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, shader: &VulkanShader, offset: u32, data: &[u8]) -> Result<()> {
        if !shader.push_constants {
            return Err(Error::InvalidResource("shader declares no push constants".to_string()));
        }
        unsafe {
            self.device().cmd_push_constants(
                self.command_buffer,
                shader.pipeline_layout,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: PoolBuffer, offset: u64) -> Result<()> {
        let vk_buffer = self.pools.buffer(buffer).buffer;
        unsafe {
            self.device().cmd_bind_vertex_buffers(self.command_buffer, binding, &[vk_buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, offset: u64) -> Result<()> {
        let vk_buffer = self.pools.buffer(PoolBuffer::Vertex(VertexKind::Index)).buffer;
        unsafe {
            self.device().cmd_bind_index_buffer(self.command_buffer, vk_buffer, offset, vk::IndexType::UINT16);
        }
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
        unsafe {
            self.device().cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_clear_value() {
        let value = clear_value_to_vk(&ClearValue::Color([0.1, 0.2, 0.3, 1.0]));
        assert_eq!(unsafe { value.color.float32 }, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_depth_clear_value() {
        let value = clear_value_to_vk(&ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
        let depth_stencil = unsafe { value.depth_stencil };
        assert_eq!(depth_stencil.depth, 1.0);
        assert_eq!(depth_stencil.stencil, 0);
    }
}
