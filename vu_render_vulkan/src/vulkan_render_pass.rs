/// Render passes and framebuffers
///
/// Two passes exist for the renderer's whole life. The 3D pass clears color
/// and depth and leaves color in COLOR_ATTACHMENT_OPTIMAL; the 2D pass loads
/// that color (no depth) and leaves it ready for presentation. Framebuffers
/// (one per swapchain image per pass) follow the swapchain.

use ash::vk;
use std::sync::Arc;
use vu_render::vu::pass::PassId;
use vu_render::vu::{Error, Result};
use vu_render::{engine_err, engine_error};

use crate::vulkan_context::GpuContext;
use crate::vulkan_swapchain::Swapchain;

/// How a pass treats its attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub color_load: vk::AttachmentLoadOp,
    pub color_initial: vk::ImageLayout,
    pub color_final: vk::ImageLayout,
    pub depth: bool,
}

pub fn pass_plan(pass: PassId) -> PassPlan {
    match pass {
        PassId::Pass3D => PassPlan {
            color_load: vk::AttachmentLoadOp::CLEAR,
            color_initial: vk::ImageLayout::UNDEFINED,
            color_final: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            depth: true,
        },
        PassId::Pass2D => PassPlan {
            color_load: vk::AttachmentLoadOp::LOAD,
            color_initial: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            color_final: vk::ImageLayout::PRESENT_SRC_KHR,
            depth: false,
        },
    }
}

unsafe fn create_render_pass(
    device: &ash::Device,
    plan: PassPlan,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let mut attachments = vec![vk::AttachmentDescription::default()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(plan.color_load)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(plan.color_initial)
        .final_layout(plan.color_final)];

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let depth_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);

    let (stage_mask, access_mask) = if plan.depth {
        attachments.push(vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL));
        subpass = subpass.depth_stencil_attachment(&depth_ref);
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
    };

    // 2D waits for the 3D pass's color writes; 3D waits for the acquire
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stage_mask)
        .src_access_mask(if plan.depth { vk::AccessFlags::empty() } else { vk::AccessFlags::COLOR_ATTACHMENT_WRITE })
        .dst_stage_mask(stage_mask)
        .dst_access_mask(access_mask);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    device.create_render_pass(&render_pass_info, None).map_err(|e| {
        engine_error!("vu::vulkan", "Failed to create render pass: {:?}", e);
        Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
    })
}

/// The 3D and 2D render passes
pub struct RenderPasses {
    ctx: Arc<GpuContext>,
    passes: [vk::RenderPass; 2],
}

impl RenderPasses {
    pub fn new(ctx: Arc<GpuContext>, color_format: vk::Format, depth_format: vk::Format) -> Result<Self> {
        unsafe {
            let world = create_render_pass(&ctx.device, pass_plan(PassId::Pass3D), color_format, depth_format)?;
            let overlay = match create_render_pass(&ctx.device, pass_plan(PassId::Pass2D), color_format, depth_format) {
                Ok(pass) => pass,
                Err(e) => {
                    ctx.device.destroy_render_pass(world, None);
                    return Err(e);
                }
            };
            Ok(Self { ctx, passes: [world, overlay] })
        }
    }

    pub fn get(&self, pass: PassId) -> vk::RenderPass {
        self.passes[pass.index()]
    }
}

impl Drop for RenderPasses {
    fn drop(&mut self) {
        unsafe {
            for pass in self.passes {
                self.ctx.device.destroy_render_pass(pass, None);
            }
        }
    }
}

/// One framebuffer per swapchain image per pass
pub struct Framebuffers {
    ctx: Arc<GpuContext>,
    framebuffers: [Vec<vk::Framebuffer>; 2],
}

impl Framebuffers {
    pub fn new(ctx: Arc<GpuContext>, passes: &RenderPasses, swapchain: &Swapchain) -> Result<Self> {
        let extent = swapchain.extent();
        let mut framebuffers = Self { ctx, framebuffers: [Vec::new(), Vec::new()] };

        for pass in PassId::ALL {
            for &view in swapchain.views() {
                let with_depth = [view, swapchain.depth_view()];
                let attachments: &[vk::ImageView] = if pass_plan(pass).depth { &with_depth } else { &with_depth[..1] };

                let framebuffer_info = vk::FramebufferCreateInfo::default()
                    .render_pass(passes.get(pass))
                    .attachments(attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);

                let framebuffer = unsafe {
                    framebuffers.ctx.device.create_framebuffer(&framebuffer_info, None)
                        .map_err(|e| engine_err!("vu::vulkan", "Failed to create {:?} framebuffer: {:?}", pass, e))?
                };
                framebuffers.framebuffers[pass.index()].push(framebuffer);
            }
        }

        Ok(framebuffers)
    }

    pub fn get(&self, pass: PassId, image_index: usize) -> Option<vk::Framebuffer> {
        self.framebuffers[pass.index()].get(image_index).copied()
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        unsafe {
            for framebuffer in self.framebuffers.iter_mut().flat_map(|f| f.drain(..)) {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
