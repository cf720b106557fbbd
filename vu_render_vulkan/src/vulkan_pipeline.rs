/// VulkanShader - graphics pipeline plus the descriptor state of one shader
///
/// Descriptor set 0 holds the scene uniform buffer, set 1 the material
/// uniform buffer followed by one combined image sampler per declared
/// sampler. Model uniforms are push constants.
///
/// Every descriptor set is allocated up front: one scene set per swapchain
/// image and one material set per material slot per image. Each set owns a
/// fixed 256-byte region of a persistently mapped uniform buffer.

use ash::vk;
use std::path::Path;
use std::sync::Arc;
use vu_render::vu::pass::PassId;
use vu_render::vu::shader::{DataType, RenderFlags, ShaderConfig, UniformLayout};
use vu_render::vu::{Error, Result, MODEL_UNIFORM_BUDGET, SCENE_UNIFORM_BUDGET};
use vu_render::{engine_debug, engine_err};

use crate::vulkan_buffer::GpuBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_memory::uniform_memory_flags;
use crate::vulkan_shader::ShaderModule;

/// Size of each per-image (scene) or per-material-per-image region
pub const REGION_STRIDE: u64 = SCENE_UNIFORM_BUDGET as u64;

/// Stages every descriptor and push range is visible to
const SHADER_VISIBILITY: vk::ShaderStageFlags =
    vk::ShaderStageFlags::from_raw(vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw());

pub fn attribute_format(data: DataType) -> Option<vk::Format> {
    match data {
        DataType::Float => Some(vk::Format::R32_SFLOAT),
        DataType::Vec2 => Some(vk::Format::R32G32_SFLOAT),
        DataType::Vec3 => Some(vk::Format::R32G32B32_SFLOAT),
        DataType::Vec4 => Some(vk::Format::R32G32B32A32_SFLOAT),
        _ => None,
    }
}

/// Byte offset of an image's scene region
pub fn scene_offset(image: usize) -> u64 {
    image as u64 * REGION_STRIDE
}

/// Byte offset of a material's region for one image
pub fn material_offset(material: usize, image: usize, image_count: usize) -> u64 {
    (material * image_count + image) as u64 * REGION_STRIDE
}

/// Descriptor pool sizes and set count for a layout
///
/// Zero-sized entries are left out; a shader without uniforms needs no pool.
pub fn descriptor_pool_sizes(
    layout: &UniformLayout,
    max_materials: usize,
    image_count: usize,
) -> (Vec<vk::DescriptorPoolSize>, u32) {
    let scene_sets = if layout.has_scene() { image_count } else { 0 };
    let material_sets = if layout.has_material() { max_materials * image_count } else { 0 };

    let uniform_buffers = scene_sets + if layout.has_material_data() { material_sets } else { 0 };
    let samplers = layout.samplers.len() * material_sets;

    let sizes = [
        (vk::DescriptorType::UNIFORM_BUFFER, uniform_buffers),
        (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, samplers),
    ]
    .into_iter()
    .filter(|&(_, count)| count > 0)
    .map(|(ty, count)| vk::DescriptorPoolSize { ty, descriptor_count: count as u32 })
    .collect();

    (sizes, (scene_sets + material_sets) as u32)
}

/// Bindings of the material set
pub fn material_bindings(layout: &UniformLayout) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    let mut bindings = Vec::new();
    if layout.has_material_data() {
        bindings.push(vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(SHADER_VISIBILITY));
    }
    let first = layout.first_sampler_binding();
    for i in 0..layout.samplers.len() as u32 {
        bindings.push(vk::DescriptorSetLayoutBinding::default()
            .binding(first + i)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(SHADER_VISIBILITY));
    }
    bindings
}

/// Pipeline and descriptor resources of a loaded shader
pub struct VulkanShader {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// Set 0 (empty when the shader only has material uniforms) and set 1
    set_layouts: Vec<vk::DescriptorSetLayout>,
    descriptor_pool: vk::DescriptorPool,
    pub(crate) scene_sets: Vec<vk::DescriptorSet>,
    /// Indexed by `material * image_count + image`
    pub(crate) material_sets: Vec<vk::DescriptorSet>,
    pub(crate) scene_uniforms: Option<GpuBuffer>,
    pub(crate) material_uniforms: Option<GpuBuffer>,
    pub(crate) scene_size: u64,
    pub(crate) material_size: u64,
    pub(crate) first_sampler_binding: u32,
    pub(crate) image_count: usize,
    pub(crate) max_materials: usize,
    pub(crate) push_constants: bool,
}

impl VulkanShader {
    /// Load byte-code and build every object a shader needs
    ///
    /// # Arguments
    ///
    /// * `render_pass` - Render pass of `config.pass`
    /// * `image_count` - Swapchain images, one descriptor set copy each
    pub fn new(
        ctx: Arc<GpuContext>,
        config: &ShaderConfig,
        layout: &UniformLayout,
        shader_dir: &Path,
        render_pass: vk::RenderPass,
        max_materials: usize,
        image_count: usize,
    ) -> Result<Self> {
        let modules = ShaderModule::load_all(&ctx, shader_dir, &config.name, config.stages)?;

        let mut shader = Self {
            ctx,
            pipeline: vk::Pipeline::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            set_layouts: Vec::new(),
            descriptor_pool: vk::DescriptorPool::null(),
            scene_sets: Vec::new(),
            material_sets: Vec::new(),
            scene_uniforms: None,
            material_uniforms: None,
            scene_size: layout.scene_size as u64,
            material_size: layout.material_size as u64,
            first_sampler_binding: layout.first_sampler_binding(),
            image_count,
            max_materials,
            push_constants: layout.has_model(),
        };

        // Drop releases whatever was created if a later step fails
        shader.create_set_layouts(layout)?;
        shader.create_uniform_buffers(layout)?;
        shader.create_descriptor_sets(layout)?;

        let reflected = modules
            .iter()
            .map(|m| m.push_size)
            .max()
            .unwrap_or(0);
        shader.push_constants |= reflected > 0;

        shader.create_pipeline(config, &modules, render_pass)?;

        engine_debug!("vu::vulkan", "Shader '{}' ready: {} scene set(s), {} material set(s), push constants: {}",
            config.name, shader.scene_sets.len(), shader.material_sets.len(), shader.push_constants);

        Ok(shader)
    }

    fn create_set_layouts(&mut self, layout: &UniformLayout) -> Result<()> {
        if !layout.has_scene() && !layout.has_material() {
            return Ok(());
        }

        let scene_bindings = if layout.has_scene() {
            vec![vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(SHADER_VISIBILITY)]
        } else {
            Vec::new()
        };

        let mut all_bindings = vec![scene_bindings];
        if layout.has_material() {
            all_bindings.push(material_bindings(layout));
        }

        for bindings in &all_bindings {
            let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
            let set_layout = unsafe {
                self.ctx.device.create_descriptor_set_layout(&create_info, None)
                    .map_err(|e| engine_err!("vu::vulkan", "Failed to create descriptor set layout: {:?}", e))?
            };
            self.set_layouts.push(set_layout);
        }
        Ok(())
    }

    fn create_uniform_buffers(&mut self, layout: &UniformLayout) -> Result<()> {
        let flags = uniform_memory_flags(self.ctx.selection.device_local_host_visible);
        let usage = vk::BufferUsageFlags::UNIFORM_BUFFER;

        if layout.has_scene() {
            let size = self.image_count as u64 * REGION_STRIDE;
            self.scene_uniforms = Some(GpuBuffer::new(Arc::clone(&self.ctx), size, usage, flags)?);
        }
        if layout.has_material_data() {
            let size = (self.max_materials * self.image_count) as u64 * REGION_STRIDE;
            self.material_uniforms = Some(GpuBuffer::new(Arc::clone(&self.ctx), size, usage, flags)?);
        }
        Ok(())
    }

    fn create_descriptor_sets(&mut self, layout: &UniformLayout) -> Result<()> {
        let (pool_sizes, max_sets) = descriptor_pool_sizes(layout, self.max_materials, self.image_count);
        if max_sets == 0 {
            return Ok(());
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets);

        unsafe {
            self.descriptor_pool = self.ctx.device.create_descriptor_pool(&pool_info, None)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to create descriptor pool ({} sets): {:?}", max_sets, e))?;

            if layout.has_scene() {
                self.scene_sets = self.allocate_sets(self.set_layouts[0], self.image_count)?;
            }
            if layout.has_material() {
                let count = self.max_materials * self.image_count;
                self.material_sets = self.allocate_sets(self.set_layouts[1], count)?;
            }
        }
        Ok(())
    }

    unsafe fn allocate_sets(&self, set_layout: vk::DescriptorSetLayout, count: usize) -> Result<Vec<vk::DescriptorSet>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let layouts = vec![set_layout; count];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&layouts);

        self.ctx.device.allocate_descriptor_sets(&allocate_info)
            .map_err(|e| engine_err!("vu::vulkan", "Failed to allocate {} descriptor sets: {:?}", count, e))
    }

    fn create_pipeline(&mut self, config: &ShaderConfig, modules: &[ShaderModule], render_pass: vk::RenderPass) -> Result<()> {
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = modules
            .iter()
            .map(|m| vk::PipelineShaderStageCreateInfo::default()
                .stage(m.stage)
                .module(m.module)
                .name(c"main"))
            .collect();

        // One binding per attribute, location == binding
        let mut vertex_bindings = Vec::with_capacity(config.attributes.len());
        let mut vertex_attributes = Vec::with_capacity(config.attributes.len());
        for (i, attr) in config.attributes.iter().enumerate() {
            let format = attribute_format(attr.data).ok_or_else(|| {
                Error::InvalidResource(format!("shader '{}': attribute {:?} cannot be {:?}", config.name, attr.name, attr.data))
            })?;
            vertex_bindings.push(vk::VertexInputBindingDescription {
                binding: i as u32,
                stride: attr.data.size(),
                input_rate: if attr.name.is_instanced() {
                    vk::VertexInputRate::INSTANCE
                } else {
                    vk::VertexInputRate::VERTEX
                },
            });
            vertex_attributes.push(vk::VertexInputAttributeDescription {
                location: i as u32,
                binding: i as u32,
                format,
                offset: 0,
            });
        }

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let topology = if config.render.contains(RenderFlags::DRAW_LINES) {
            vk::PrimitiveTopology::LINE_LIST
        } else {
            vk::PrimitiveTopology::TRIANGLE_LIST
        };
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology)
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let cull_mode = if config.render.contains(RenderFlags::CULL_OFF) {
            vk::CullModeFlags::NONE
        } else {
            vk::CullModeFlags::BACK
        };
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        // Only the 3D pass has a depth attachment
        let depth = config.pass == PassId::Pass3D;
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(depth)
            .depth_write_enable(depth)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD);

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: SHADER_VISIBILITY,
            offset: 0,
            size: MODEL_UNIFORM_BUDGET,
        }];

        let mut layout_create_info = vk::PipelineLayoutCreateInfo::default();
        if !self.set_layouts.is_empty() {
            layout_create_info = layout_create_info.set_layouts(&self.set_layouts);
        }
        if self.push_constants {
            layout_create_info = layout_create_info.push_constant_ranges(&push_constant_ranges);
        }

        unsafe {
            self.pipeline_layout = self.ctx.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to create pipeline layout for '{}': {:?}", config.name, e))?;

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(self.pipeline_layout)
                .render_pass(render_pass)
                .subpass(0);

            let pipelines = self.ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            )
            .map_err(|e| engine_err!("vu::vulkan", "Failed to create graphics pipeline for '{}': {:?}", config.name, e.1))?;

            self.pipeline = pipelines.into_iter().next().ok_or_else(|| {
                engine_err!("vu::vulkan", "Pipeline creation for '{}' returned nothing", config.name)
            })?;
        }
        Ok(())
    }

    /// Scene set of `image`
    pub(crate) fn scene_set(&self, image: usize) -> Result<vk::DescriptorSet> {
        self.scene_sets.get(image).copied().ok_or_else(|| {
            Error::InvalidResource(format!("no scene descriptor set for image {} ({} sets)", image, self.scene_sets.len()))
        })
    }

    /// Material set of `material` for `image`
    pub(crate) fn material_set(&self, material: usize, image: usize) -> Result<vk::DescriptorSet> {
        if image >= self.image_count || material >= self.max_materials {
            return Err(Error::InvalidResource(format!(
                "no descriptor set for material {} image {} ({} materials x {} images)",
                material, image, self.max_materials, self.image_count
            )));
        }
        self.material_sets
            .get(material * self.image_count + image)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("shader has no material set {}", material)))
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            // Sets are freed with their pool
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            }
            if self.descriptor_pool != vk::DescriptorPool::null() {
                self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
            }
            for set_layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
