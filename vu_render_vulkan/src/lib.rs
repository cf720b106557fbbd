/*!
# vu renderer - Vulkan backend

Vulkan implementation of [`vu_render::vu::Renderer`], built on ash.

Every GPU object holds an `Arc<GpuContext>` and destroys itself on drop.
The device and instance are destroyed by [`VulkanRenderer`] once everything
else is gone.

## Example

```no_run
use vu_render::vu::{Context, RendererConfig};
use vu_render_vulkan::VulkanRenderer;
# fn run(window: &winit::window::Window) -> vu_render::vu::Result<()> {
let config = RendererConfig { app_name: "demo".to_string(), ..RendererConfig::default() };
let mut context = Context::new(VulkanRenderer::new(window, config)?);
context.set_clear_color(0.1, 0.1, 0.2, 1.0);
# Ok(())
# }
```

Validation layers are compiled in with the `vulkan-validation` feature and
enabled per renderer with `RendererConfig::enable_validation`.
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_memory;
mod vulkan_buffer;
mod vulkan_buffer_pool;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_frame;
mod vulkan_command_list;
mod vulkan_renderer;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_renderer::VulkanRenderer;
pub use vulkan_context::GpuContext;
pub use vulkan_device::{DeviceSelection, GpuKind, QueueFamilies};

#[cfg(feature = "vulkan-validation")]
pub use debug::{print_validation_stats_report, validation_stats, ValidationStats};
