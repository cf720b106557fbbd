use super::*;

fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR { format, color_space }
}

fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min,
        max_image_count: max,
        current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
        min_image_extent: vk::Extent2D { width: 16, height: 16 },
        max_image_extent: vk::Extent2D { width: 4096, height: 2048 },
        current_transform: vk::SurfaceTransformFlagsKHR::ROTATE_90,
        supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY | vk::SurfaceTransformFlagsKHR::ROTATE_90,
        ..Default::default()
    }
}

// ============================================================================
// Surface format
// ============================================================================

#[test]
fn test_srgb_bgra_preferred() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);
}

#[test]
fn test_srgb_rgba_second_choice() {
    let formats = [
        surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::R8G8B8A8_SRGB);
}

#[test]
fn test_falls_back_to_first_format() {
    let formats = [
        surface_format(vk::Format::A2B10G10R10_UNORM_PACK32, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::A2B10G10R10_UNORM_PACK32);
}

#[test]
fn test_undefined_surface_format_means_any() {
    let formats = [surface_format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
    assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);
}

#[test]
fn test_no_formats() {
    assert!(choose_surface_format(&[]).is_none());
}

// ============================================================================
// Present mode, transform, extent, image count
// ============================================================================

#[test]
fn test_present_mode() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
    assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::MAILBOX);
    assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::FIFO);
    assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO], true), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_identity_transform_preferred() {
    assert_eq!(choose_transform(&caps(2, 3)), vk::SurfaceTransformFlagsKHR::IDENTITY);

    let mut rotated = caps(2, 3);
    rotated.supported_transforms = vk::SurfaceTransformFlagsKHR::ROTATE_90;
    assert_eq!(choose_transform(&rotated), vk::SurfaceTransformFlagsKHR::ROTATE_90);
}

#[test]
fn test_extent_clamped_to_surface_limits() {
    let c = caps(2, 3);
    assert_eq!(choose_extent(&c, 800, 600), vk::Extent2D { width: 800, height: 600 });
    assert_eq!(choose_extent(&c, 8, 9000), vk::Extent2D { width: 16, height: 2048 });
}

#[test]
fn test_fixed_surface_extent_wins() {
    let mut c = caps(2, 3);
    c.current_extent = vk::Extent2D { width: 1024, height: 768 };
    assert_eq!(choose_extent(&c, 800, 600), vk::Extent2D { width: 1024, height: 768 });
}

#[test]
fn test_image_count() {
    assert_eq!(choose_image_count(&caps(2, 8), 3), 3);
    assert_eq!(choose_image_count(&caps(2, 2), 3), 2);
    assert_eq!(choose_image_count(&caps(4, 8), 3), 4);
    assert_eq!(choose_image_count(&caps(2, 0), 5), 5);
}

// ============================================================================
// Depth format
// ============================================================================

#[test]
fn test_depth_format_first_supported() {
    let format = choose_depth_format(|f| {
        let mut props = vk::FormatProperties::default();
        if f == vk::Format::D32_SFLOAT_S8_UINT {
            props.optimal_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        props
    });
    assert_eq!(format, Some(vk::Format::D32_SFLOAT_S8_UINT));
}

#[test]
fn test_depth_format_linear_tiling_accepted() {
    let format = choose_depth_format(|f| {
        let mut props = vk::FormatProperties::default();
        if f == vk::Format::D24_UNORM_S8_UINT {
            props.linear_tiling_features = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        props
    });
    assert_eq!(format, Some(vk::Format::D24_UNORM_S8_UINT));
}

#[test]
fn test_no_depth_format() {
    assert_eq!(choose_depth_format(|_| vk::FormatProperties::default()), None);
}
