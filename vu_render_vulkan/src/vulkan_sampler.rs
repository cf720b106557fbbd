/// Shared sampler - one linear/repeat/anisotropic VkSampler for every texture
///
/// Created once at startup and destroyed after all shaders, so material
/// descriptor sets never point at a destroyed sampler.

use ash::vk;
use std::sync::Arc;
use vu_render::vu::Result;
use vu_render::engine_err;

use crate::vulkan_context::GpuContext;

pub struct SharedSampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
}

impl SharedSampler {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .anisotropy_enable(true)
            .max_anisotropy(ctx.selection.max_anisotropy.max(1.0));

        let sampler = unsafe {
            ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to create sampler: {:?}", e))?
        };

        Ok(Self { ctx, sampler })
    }
}

impl Drop for SharedSampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
