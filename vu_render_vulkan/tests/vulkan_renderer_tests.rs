//! Integration tests for VulkanRenderer
//!
//! All tests require a GPU and a display, and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_renderer_tests -- --ignored

use vu_render::vu::pass::{Pass, PassId};
use vu_render::vu::resource::{BufferData, ImageData, InstanceData, InstanceKind, MeshData, VertexKind};
use vu_render::vu::{Error, FrameStatus, Renderer, RendererConfig};
use vu_render_vulkan::VulkanRenderer;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Helper to create a hidden test window
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("vu Vulkan test")
        .with_inner_size(winit::dpi::PhysicalSize::new(320, 240))
        .with_visible(false);
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

fn test_config() -> RendererConfig {
    RendererConfig {
        app_name: "vu renderer tests".to_string(),
        width: 320,
        height: 240,
        vertex_space: 1024,
        instance_space: 64,
        max_materials: 8,
        ..RendererConfig::default()
    }
}

fn triangle() -> MeshData {
    let positions: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
    MeshData::new()
        .with(VertexKind::Position, BufferData::from_slice(&positions, 3))
        .with(VertexKind::Index, BufferData::from_indices(&[0, 1, 2]))
}

/// Draw until a frame is presented, skipping through pending resizes
fn draw_presented(renderer: &mut VulkanRenderer, passes: &[Pass]) -> u32 {
    for attempt in 0..4 {
        if renderer.begin_frame().unwrap() == FrameStatus::Ready {
            renderer.draw_frame(passes).unwrap();
            renderer.end_frame().unwrap();
            return attempt;
        }
    }
    panic!("no frame presented after 4 attempts");
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_renderer() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();

    let (width, height) = renderer.size();
    assert!(width > 0 && height > 0);
    assert!(!renderer.context().selection.name.is_empty());
    renderer.wait_idle().unwrap();
    renderer.dispose();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_rejects_invalid_config() {
    let (window, _event_loop) = create_test_window();
    let config = RendererConfig { frame_count: 0, ..test_config() };
    assert!(matches!(VulkanRenderer::new(&window, config), Err(Error::InitializationFailed(_))));
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_load_and_update_texture() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();

    let id = renderer.load_texture(&ImageData::filled(4, 4, [255, 0, 0, 255])).unwrap();
    let info = renderer.texture_info(id).unwrap();
    assert_eq!((info.width, info.height), (4, 4));

    renderer.update_texture(id, &ImageData::filled(4, 4, [0, 255, 0, 255])).unwrap();
    assert_eq!(renderer.stats().texture_bytes, 2 * 4 * 4 * 4);

    let mismatch = renderer.update_texture(id, &ImageData::filled(8, 8, [0, 0, 255, 255]));
    assert!(matches!(mismatch, Err(Error::LayoutMismatch(_))));
    assert_eq!(renderer.texture_info(id).unwrap().width, 4);

    renderer.drop_texture(id);
    assert!(renderer.texture_info(id).is_none());
}

// ============================================================================
// MESHES AND INSTANCES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_load_meshes_and_instances() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();

    let ids = renderer.load_meshes(&[triangle(), triangle()]).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(renderer.stats().mesh_bytes > 0);

    let offsets: [f32; 6] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0];
    let instances = InstanceData::new().with(InstanceKind::Position, BufferData::from_slice(&offsets, 3));
    let instance = renderer.load_instance_data(&instances).unwrap();
    renderer.update_instance_data(instance, &instances).unwrap();

    renderer.drop_instance_data(instance);
    renderer.drop_mesh(ids[0]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_mesh_overflow_is_capacity_error() {
    let (window, _event_loop) = create_test_window();
    let config = RendererConfig { vertex_space: 4, ..test_config() };
    let mut renderer = VulkanRenderer::new(&window, config).unwrap();

    renderer.load_meshes(&[triangle()]).unwrap();
    let overflow = renderer.load_meshes(&[triangle()]);
    assert!(matches!(overflow, Err(Error::CapacityExceeded(_))));
}

// ============================================================================
// FRAMES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_draw_empty_passes() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();
    renderer.set_clear_color(0.2, 0.3, 0.4, 1.0);

    let passes = [Pass::new(PassId::Pass3D), Pass::new(PassId::Pass2D)];
    for _ in 0..5 {
        draw_presented(&mut renderer, &passes);
    }
    assert_eq!(renderer.stats().draw_calls, 0);
    renderer.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_end_without_draw_is_error() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();

    if renderer.begin_frame().unwrap() == FrameStatus::Ready {
        assert!(renderer.end_frame().is_err());
        // The acquired image is still usable
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::Ready);
        renderer.draw_frame(&[]).unwrap();
        renderer.end_frame().unwrap();
    }
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_resize_skips_one_frame() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();
    let passes = [Pass::new(PassId::Pass3D)];
    draw_presented(&mut renderer, &passes);

    renderer.resize(200, 150);
    assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::Skipped);
    draw_presented(&mut renderer, &passes);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_zero_size_keeps_skipping() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();

    renderer.resize(0, 0);
    for _ in 0..3 {
        assert_eq!(renderer.begin_frame().unwrap(), FrameStatus::Skipped);
    }
    renderer.resize(320, 240);
    draw_presented(&mut renderer, &[]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_dispose_twice() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = VulkanRenderer::new(&window, test_config()).unwrap();
    renderer.dispose();
    renderer.dispose();
    assert!(renderer.begin_frame().is_err());
}
