/// VulkanRenderer - Vulkan implementation of the Renderer trait
///
/// Owns the instance, device and every GPU object. Resources hold an
/// `Arc<GpuContext>` and destroy themselves on drop; the device and instance
/// are destroyed last, by `dispose()`.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;
use vu_render::vu::pass::Pass;
use vu_render::vu::render::{Dispatcher, DrawStats, FrameRing, FrameTarget, ResizeTracker, SlotState};
use vu_render::vu::resource::{
    BufferPools, ImageData, InstanceData, InstanceId, MeshData, MeshId, PoolCapacity, TextureId,
    TextureInfo, TextureTable,
};
use vu_render::vu::shader::{ShaderConfig, ShaderEntry, ShaderId, ShaderRegistry, UniformLayout};
use vu_render::vu::{Error, FrameStatus, Renderer, RendererConfig, RendererStats, Result};
use vu_render::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_buffer_pool::GpuPools;
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_device::{app_name, create_logical_device, select_device};
use crate::vulkan_frame::FrameSync;
use crate::vulkan_pipeline::VulkanShader;
use crate::vulkan_render_pass::{Framebuffers, RenderPasses};
use crate::vulkan_sampler::SharedSampler;
use crate::vulkan_swapchain::{Acquired, Swapchain};
use crate::vulkan_texture::GpuTexture;

type DebugMessenger = (ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT);

#[cfg(feature = "vulkan-validation")]
unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: &RendererConfig,
) -> Result<Option<DebugMessenger>> {
    if !config.enable_validation {
        return Ok(None);
    }
    crate::debug::reset_validation_stats();

    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(crate::debug::subscribed_severities())
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    let messenger = debug_utils
        .create_debug_utils_messenger(&debug_info, None)
        .map_err(|e| {
            engine_error!("vu::vulkan", "Failed to create debug messenger: {:?}", e);
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        })?;

    Ok(Some((debug_utils, messenger)))
}

#[cfg(not(feature = "vulkan-validation"))]
unsafe fn create_debug_messenger(
    _entry: &ash::Entry,
    _instance: &ash::Instance,
    config: &RendererConfig,
) -> Result<Option<DebugMessenger>> {
    if config.enable_validation {
        engine_debug!("vu::vulkan", "Validation requested but the vulkan-validation feature is off");
    }
    Ok(None)
}

fn validation_layers(config: &RendererConfig) -> bool {
    cfg!(feature = "vulkan-validation") && config.enable_validation
}

unsafe fn destroy_instance(instance: &ash::Instance, debug: Option<&DebugMessenger>) {
    if let Some((debug_utils, messenger)) = debug {
        debug_utils.destroy_debug_utils_messenger(*messenger, None);
    }
    instance.destroy_instance(None);
}

/// GPU objects that exist between creation and `dispose()`
///
/// Fields drop in declaration order: shaders and textures before the sampler
/// they reference, framebuffers before the passes and swapchain views.
struct Resources {
    shaders: ShaderRegistry<VulkanShader>,
    textures: TextureTable<GpuTexture>,
    sampler: SharedSampler,
    gpu_pools: GpuPools,
    /// `None` while a failed swapchain recreation waits for its retry
    framebuffers: Option<Framebuffers>,
    passes: RenderPasses,
    swapchain: Swapchain,
    frames: FrameSync,
}

impl Resources {
    fn new(
        ctx: &Arc<GpuContext>,
        surface_loader: ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        config: &RendererConfig,
    ) -> Result<Self> {
        // Takes the surface first so it is released on any failure below
        let swapchain = Swapchain::new(
            Arc::clone(ctx),
            surface_loader,
            surface,
            config.width,
            config.height,
            config.image_count,
            config.prefer_mailbox,
        )?;
        let frames = FrameSync::new(Arc::clone(ctx), config.frame_count as usize, swapchain.image_count())?;
        let passes = RenderPasses::new(Arc::clone(ctx), swapchain.color_format(), swapchain.depth_format())?;
        let framebuffers = Framebuffers::new(Arc::clone(ctx), &passes, &swapchain)?;
        let capacity = PoolCapacity::from_space(config.vertex_space, config.instance_space);
        let gpu_pools = GpuPools::new(ctx, &capacity)?;
        let sampler = SharedSampler::new(Arc::clone(ctx))?;

        Ok(Self {
            shaders: ShaderRegistry::new(),
            textures: TextureTable::new(),
            sampler,
            gpu_pools,
            framebuffers: Some(framebuffers),
            passes,
            swapchain,
            frames,
        })
    }

    /// Rebuild the swapchain and everything sized from it
    fn recreate_swapchain(&mut self, ctx: &Arc<GpuContext>, width: u32, height: u32) -> Result<vk::Extent2D> {
        self.framebuffers = None;
        self.swapchain.recreate(width, height)?;
        self.frames.resize_images(self.swapchain.image_count())?;
        self.framebuffers = Some(Framebuffers::new(Arc::clone(ctx), &self.passes, &self.swapchain)?);
        Ok(self.swapchain.extent())
    }

    /// Record both passes into the slot's command buffer
    fn record_frame(
        &mut self,
        ctx: &GpuContext,
        dispatcher: &mut Dispatcher,
        pools: &BufferPools,
        passes: &[Pass],
        command_buffer: vk::CommandBuffer,
        target: &FrameTarget,
    ) -> Result<DrawStats> {
        let framebuffers = self.framebuffers.as_ref().ok_or_else(|| {
            engine_err!("vu::vulkan", "Frame recorded without framebuffers")
        })?;

        unsafe {
            ctx.device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("vu::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            ctx.device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        let mut cmd = VulkanCommandList::new(
            ctx,
            command_buffer,
            target.image_index,
            self.swapchain.extent(),
            &self.passes,
            framebuffers,
            &self.gpu_pools,
            &self.textures,
            self.sampler.sampler,
        );
        let stats = dispatcher.record(&mut cmd, &mut self.shaders, pools, passes, target);

        // The buffer is ended even when recording failed, so it can be reset
        let ended = unsafe {
            ctx.device.end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to end command buffer: {:?}", e))
        };
        let stats = stats?;
        ended?;
        Ok(stats)
    }
}

/// Vulkan renderer
pub struct VulkanRenderer {
    config: RendererConfig,
    /// Keeps the Vulkan library loaded
    _entry: ash::Entry,
    ctx: Arc<GpuContext>,
    debug: Option<DebugMessenger>,
    resources: Option<Resources>,
    pools: BufferPools,
    ring: FrameRing,
    resize: ResizeTracker,
    dispatcher: Dispatcher,
    clear_color: [f32; 4],
    image_index: u32,
    /// An image was acquired and its frame not yet submitted
    image_held: bool,
    stats: RendererStats,
    disposed: bool,
}

impl VulkanRenderer {
    /// Create a renderer drawing into `window`
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` when the configuration is invalid or no
    /// GPU meets the requirements (graphics + present queues, swapchain
    /// support, sampler anisotropy, a depth format).
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: RendererConfig) -> Result<Self> {
        config.validate()?;

        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("vu::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let application_name = app_name(&config.app_name);
            let app_info = vk::ApplicationInfo::default()
                .application_name(&application_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"vu")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("vu::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("vu::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("vu::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            let validation = validation_layers(&config);
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("vu::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let debug = match create_debug_messenger(&entry, &instance, &config) {
                Ok(debug) => debug,
                Err(e) => {
                    destroy_instance(&instance, None);
                    return Err(e);
                }
            };

            let surface = match ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            ) {
                Ok(surface) => surface,
                Err(e) => {
                    engine_error!("vu::vulkan", "Failed to create surface: {:?}", e);
                    destroy_instance(&instance, debug.as_ref());
                    return Err(Error::InitializationFailed(format!("Failed to create surface: {:?}", e)));
                }
            };
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let device_setup = select_device(&instance, &surface_loader, surface).and_then(|selection| {
                let device = create_logical_device(&instance, &selection)?;
                Ok((selection, device))
            });
            let (selection, device) = match device_setup {
                Ok(setup) => setup,
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    destroy_instance(&instance, debug.as_ref());
                    return Err(e);
                }
            };

            let graphics_queue = device.get_device_queue(selection.families.graphics, 0);
            let present_queue = device.get_device_queue(selection.families.present, 0);
            let transfer_queue = device.get_device_queue(selection.families.transfer, 0);

            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(selection.families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = match device.create_command_pool(&upload_pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    engine_error!("vu::vulkan", "Failed to create upload command pool: {:?}", e);
                    device.destroy_device(None);
                    surface_loader.destroy_surface(surface, None);
                    destroy_instance(&instance, debug.as_ref());
                    return Err(Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e)));
                }
            };

            let memory_properties = instance.get_physical_device_memory_properties(selection.physical_device);

            let ctx = Arc::new(GpuContext {
                instance,
                device,
                selection,
                graphics_queue,
                transfer_queue,
                present_queue,
                upload_command_pool,
                memory_properties,
            });

            // From here on Drop tears everything down
            let mut renderer = Self {
                pools: BufferPools::new(PoolCapacity::from_space(config.vertex_space, config.instance_space)),
                ring: FrameRing::new(config.frame_count as usize),
                resize: ResizeTracker::new(config.width, config.height),
                dispatcher: Dispatcher::new(),
                clear_color: config.clear_color,
                image_index: 0,
                image_held: false,
                stats: RendererStats::default(),
                resources: None,
                debug,
                ctx,
                _entry: entry,
                disposed: false,
                config,
            };

            let resources = Resources::new(&renderer.ctx, surface_loader, surface, &renderer.config)?;
            let extent = resources.swapchain.extent();
            renderer.resize = ResizeTracker::new(extent.width, extent.height);
            renderer.resources = Some(resources);

            engine_info!("vu::vulkan", "Renderer ready: {}x{}, {} frames in flight, validation {}",
                extent.width, extent.height, renderer.config.frame_count,
                if validation { "on" } else { "off" });

            Ok(renderer)
        }
    }

    /// GPU and queue families in use
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn resources(&self) -> Result<&Resources> {
        self.resources.as_ref().ok_or_else(|| Error::BackendError("renderer disposed".to_string()))
    }

    fn resources_mut(&mut self) -> Result<&mut Resources> {
        self.resources.as_mut().ok_or_else(|| Error::BackendError("renderer disposed".to_string()))
    }

    /// Idle the GPU before destroying something a frame in flight may use
    fn idle_before_release(&self, what: &str) {
        if let Err(e) = self.ctx.wait_idle() {
            engine_warn!("vu::vulkan", "Releasing {} without idle GPU: {}", what, e);
        }
    }
}

impl Renderer for VulkanRenderer {
    fn begin_frame(&mut self) -> Result<FrameStatus> {
        let ctx = Arc::clone(&self.ctx);
        let fence_timeout = self.config.fence_timeout_ns();
        let Some(res) = self.resources.as_mut() else {
            engine_bail!("vu::vulkan", "begin_frame called on a disposed renderer");
        };

        if self.resize.is_resizing() {
            if let Some((width, height)) = self.resize.begin_recreate() {
                let slot = self.ring.current();
                let recreated = res.recreate_swapchain(&ctx, width, height).and_then(|extent| {
                    if self.image_held {
                        res.frames.renew_image_available(slot)?;
                    }
                    Ok(extent)
                });
                match recreated {
                    Ok(extent) => {
                        self.image_held = false;
                        self.resize.finish(extent.width, extent.height);
                    }
                    Err(e) => {
                        engine_warn!("vu::vulkan", "Swapchain recreation at {}x{} failed, retrying next frame: {}",
                            width, height, e);
                        self.resize.fail(width, height);
                    }
                }
            }
            return Ok(FrameStatus::Skipped);
        }

        // A frame aborted in draw_frame still owns its image
        if self.image_held {
            return Ok(FrameStatus::Ready);
        }

        let slot = self.ring.current();
        res.frames.wait(slot, fence_timeout)?;
        self.ring.mark_waited();

        match res.swapchain.acquire(res.frames.slot(slot).image_available)? {
            Acquired::OutOfDate => {
                engine_debug!("vu::vulkan", "Swapchain out of date, frame skipped");
                self.resize.schedule();
                Ok(FrameStatus::Skipped)
            }
            Acquired::Image { index, suboptimal } => {
                if suboptimal {
                    self.resize.schedule();
                }
                self.image_index = index;
                self.image_held = true;
                Ok(FrameStatus::Ready)
            }
        }
    }

    fn draw_frame(&mut self, passes: &[Pass]) -> Result<()> {
        let Some(res) = self.resources.as_mut() else {
            engine_bail!("vu::vulkan", "draw_frame called on a disposed renderer");
        };
        self.ring.begin_recording()?;

        let extent = res.swapchain.extent();
        let target = FrameTarget {
            width: extent.width,
            height: extent.height,
            clear_color: self.clear_color,
            image_index: self.image_index as usize,
        };
        let command_buffer = res.frames.slot(self.ring.current()).command_buffer;

        match res.record_frame(&self.ctx, &mut self.dispatcher, &self.pools, passes, command_buffer, &target) {
            Ok(frame) => {
                self.stats.draw_calls = frame.draw_calls;
                self.stats.triangles = frame.triangles;
                Ok(())
            }
            Err(e) => {
                self.ring.abort();
                Err(e)
            }
        }
    }

    fn end_frame(&mut self) -> Result<()> {
        let Some(res) = self.resources.as_ref() else {
            engine_bail!("vu::vulkan", "end_frame called on a disposed renderer");
        };
        if self.ring.state() != SlotState::Recording {
            engine_bail!("vu::vulkan", "end_frame called without a recorded frame");
        }

        let slot_index = self.ring.current();
        let slot = res.frames.slot(slot_index);
        let render_complete = res.frames.render_complete(self.image_index as usize)?;

        res.frames.reset_fence(slot_index)?;

        let wait_semaphores = [slot.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [slot.command_buffer];
        let signal_semaphores = [render_complete];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx.device.queue_submit(self.ctx.graphics_queue, &[submit_info], slot.in_flight)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to submit frame: {:?}", e))?;
        }
        self.ring.mark_submitted()?;
        self.image_held = false;

        let presented = res.swapchain.present(render_complete, self.image_index);
        self.ring.advance();

        if presented? {
            self.resize.schedule();
        }
        Ok(())
    }

    fn load_texture(&mut self, image: &ImageData) -> Result<TextureId> {
        image.validate()?;
        let texture = GpuTexture::new(Arc::clone(&self.ctx), image)?;
        let info = texture.info();
        let id = self.resources_mut()?.textures.insert(info, texture);
        self.stats.texture_bytes += image.byte_len();
        engine_debug!("vu::vulkan", "Texture {} loaded ({}x{})", id, info.width, info.height);
        Ok(id)
    }

    fn update_texture(&mut self, id: TextureId, image: &ImageData) -> Result<()> {
        let res = self.resources()?;
        res.textures.check_update(id, image)?.upload(image)?;
        self.stats.texture_bytes += image.byte_len();
        Ok(())
    }

    fn drop_texture(&mut self, id: TextureId) {
        let loaded = self.resources.as_ref().is_some_and(|res| res.textures.get(id).is_some());
        if !loaded {
            engine_warn!("vu::vulkan", "drop_texture: texture {} is not loaded", id);
            return;
        }
        self.idle_before_release("texture");
        if let Some(res) = self.resources.as_mut() {
            res.textures.remove(id);
        }
    }

    fn texture_info(&self, id: TextureId) -> Option<TextureInfo> {
        self.resources.as_ref().and_then(|res| res.textures.info(id))
    }

    fn load_meshes(&mut self, meshes: &[MeshData]) -> Result<Vec<MeshId>> {
        let Some(res) = self.resources.as_mut() else {
            engine_bail!("vu::vulkan", "load_meshes called on a disposed renderer");
        };
        self.pools.load_meshes(&mut res.gpu_pools, meshes)
    }

    fn drop_mesh(&mut self, id: MeshId) {
        self.pools.drop_mesh(id);
    }

    fn load_instance_data(&mut self, data: &InstanceData) -> Result<InstanceId> {
        let Some(res) = self.resources.as_mut() else {
            engine_bail!("vu::vulkan", "load_instance_data called on a disposed renderer");
        };
        self.pools.load_instance_data(&mut res.gpu_pools, data)
    }

    fn update_instance_data(&mut self, id: InstanceId, data: &InstanceData) -> Result<()> {
        let Some(res) = self.resources.as_mut() else {
            engine_bail!("vu::vulkan", "update_instance_data called on a disposed renderer");
        };
        self.pools.update_instance_data(&mut res.gpu_pools, id, data)
    }

    fn drop_instance_data(&mut self, id: InstanceId) {
        self.pools.drop_instance_data(id);
    }

    fn load_shader(&mut self, config: &ShaderConfig) -> Result<ShaderId> {
        config.validate()?;
        let layout = UniformLayout::derive(config)?;
        let max_materials = self.config.max_materials as usize;
        let ctx = Arc::clone(&self.ctx);
        let shader_dir = self.config.shader_dir.clone();

        let res = self.resources_mut()?;
        let image_count = res.swapchain.image_count();
        let backend = VulkanShader::new(
            ctx,
            config,
            &layout,
            &shader_dir,
            res.passes.get(config.pass),
            max_materials,
            image_count,
        )?;

        let entry = ShaderEntry::new(config.clone(), layout, max_materials, image_count, backend);
        let id = res.shaders.insert(entry).map_err(|(e, _entry)| e)?;
        engine_debug!("vu::vulkan", "Shader '{}' loaded as {}", config.name, id);
        Ok(id)
    }

    fn drop_shader(&mut self, id: ShaderId) {
        let loaded = self.resources.as_ref().is_some_and(|res| res.shaders.get(id).is_some());
        if !loaded {
            engine_warn!("vu::vulkan", "drop_shader: shader {} is not loaded", id);
            return;
        }
        self.idle_before_release("shader");
        if let Some(res) = self.resources.as_mut() {
            res.shaders.remove(id);
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
        self.ctx.wait_idle()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.idle_before_release("renderer");

        if let Some(mut res) = self.resources.take() {
            let shaders = res.shaders.drain().len();
            let textures = res.textures.drain().count();
            engine_debug!("vu::vulkan", "Released {} shader(s) and {} texture(s)", shaders, textures);
        }

        if Arc::strong_count(&self.ctx) > 1 {
            engine_warn!("vu::vulkan", "{} GPU context reference(s) still alive at dispose",
                Arc::strong_count(&self.ctx) - 1);
        }

        unsafe {
            self.ctx.device.destroy_command_pool(self.ctx.upload_command_pool, None);
            self.ctx.device.destroy_device(None);
            destroy_instance(&self.ctx.instance, self.debug.as_ref());
        }
        self.debug = None;

        #[cfg(feature = "vulkan-validation")]
        {
            let stats = crate::debug::validation_stats();
            if stats.total() > 0 {
                engine_info!("vu::vulkan", "Validation: {} error(s), {} warning(s)", stats.errors, stats.warnings);
            }
        }

        engine_info!("vu::vulkan", "Renderer disposed");
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}
