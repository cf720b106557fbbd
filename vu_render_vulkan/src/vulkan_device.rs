/// Device selection - pick the physical device and its queue families
///
/// Every candidate must support presentation to the window surface, the
/// swapchain extension (with at least one surface format and present mode) and
/// anisotropic sampling. Candidates are ranked discrete GPU first.

use ash::vk;
use std::ffi::CString;
use vu_render::vu::{Error, Result};
use vu_render::{engine_debug, engine_error, engine_info};

/// Kind of the selected GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuKind {
    Discrete,
    Integrated,
    Virtual,
    Cpu,
    Other,
}

impl GpuKind {
    /// Lower ranks are preferred
    pub fn rank(self) -> u32 {
        match self {
            GpuKind::Discrete => 0,
            GpuKind::Integrated => 1,
            GpuKind::Virtual => 2,
            GpuKind::Cpu => 3,
            GpuKind::Other => 4,
        }
    }
}

impl From<vk::PhysicalDeviceType> for GpuKind {
    fn from(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => GpuKind::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => GpuKind::Integrated,
            vk::PhysicalDeviceType::VIRTUAL_GPU => GpuKind::Virtual,
            vk::PhysicalDeviceType::CPU => GpuKind::Cpu,
            _ => GpuKind::Other,
        }
    }
}

/// Queue family indices of a candidate device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
    pub transfer: u32,
}

impl QueueFamilies {
    /// Distinct family indices, for queue creation
    pub fn unique(&self) -> Vec<u32> {
        let mut families = vec![self.graphics, self.present, self.transfer];
        families.sort_unstable();
        families.dedup();
        families
    }
}

/// The physical device chosen at startup and what was learned about it
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub kind: GpuKind,
    pub families: QueueFamilies,
    /// Some memory type is both DEVICE_LOCAL and HOST_VISIBLE
    pub device_local_host_visible: bool,
    pub max_anisotropy: f32,
}

// ============================================================================
// Pure selection helpers
// ============================================================================

/// First family with graphics support that can also present, else the first
/// graphics family paired with the first presenting family
pub fn choose_graphics_and_present(
    families: &[vk::QueueFamilyProperties],
    can_present: &[bool],
) -> Option<(u32, u32)> {
    let graphics: Vec<u32> = families
        .iter()
        .enumerate()
        .filter(|(_, f)| f.queue_count > 0 && f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(i, _)| i as u32)
        .collect();

    let presents = |i: u32| can_present.get(i as usize).copied().unwrap_or(false);

    if let Some(&both) = graphics.iter().find(|&&i| presents(i)) {
        return Some((both, both));
    }
    let present = (0..families.len() as u32).find(|&i| presents(i))?;
    graphics.first().map(|&g| (g, present))
}

/// Transfer family with the fewest graphics/compute capabilities
///
/// A dedicated transfer family scores 0. Ties go to the lowest index.
pub fn choose_transfer(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.queue_count > 0
                && f.queue_flags.intersects(vk::QueueFlags::TRANSFER | vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
        })
        .min_by_key(|(_, f)| {
            let mut score = 0;
            if f.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                score += 1;
            }
            if f.queue_flags.contains(vk::QueueFlags::COMPUTE) {
                score += 1;
            }
            score
        })
        .map(|(i, _)| i as u32)
}

/// Whether any memory type is both device-local and host-visible
pub fn has_device_local_host_visible(props: &vk::PhysicalDeviceMemoryProperties) -> bool {
    let wanted = vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE;
    props.memory_types[..props.memory_type_count as usize]
        .iter()
        .any(|t| t.property_flags.contains(wanted))
}

// ============================================================================
// Device queries
// ============================================================================

/// Check one physical device against the requirements
///
/// Returns `None` (with a debug log) when the device cannot be used.
unsafe fn evaluate(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Option<DeviceSelection> {
    let properties = instance.get_physical_device_properties(physical_device);
    let name = properties
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());

    let families = instance.get_physical_device_queue_family_properties(physical_device);
    let can_present: Vec<bool> = (0..families.len() as u32)
        .map(|i| {
            surface_loader
                .get_physical_device_surface_support(physical_device, i, surface)
                .unwrap_or(false)
        })
        .collect();

    let Some((graphics, present)) = choose_graphics_and_present(&families, &can_present) else {
        engine_debug!("vu::vulkan", "Skipping '{}': no graphics or present queue", name);
        return None;
    };
    let transfer = choose_transfer(&families).unwrap_or(graphics);

    let extensions = instance
        .enumerate_device_extension_properties(physical_device)
        .unwrap_or_default();
    let has_swapchain = extensions.iter().any(|ext| {
        ext.extension_name_as_c_str().map(|n| n == ash::khr::swapchain::NAME).unwrap_or(false)
    });
    if !has_swapchain {
        engine_debug!("vu::vulkan", "Skipping '{}': no {:?}", name, ash::khr::swapchain::NAME);
        return None;
    }

    let formats = surface_loader
        .get_physical_device_surface_formats(physical_device, surface)
        .unwrap_or_default();
    let present_modes = surface_loader
        .get_physical_device_surface_present_modes(physical_device, surface)
        .unwrap_or_default();
    if formats.is_empty() || present_modes.is_empty() {
        engine_debug!("vu::vulkan", "Skipping '{}': surface has no formats or present modes", name);
        return None;
    }

    let features = instance.get_physical_device_features(physical_device);
    if features.sampler_anisotropy == vk::FALSE {
        engine_debug!("vu::vulkan", "Skipping '{}': no sampler anisotropy", name);
        return None;
    }

    let memory = instance.get_physical_device_memory_properties(physical_device);

    Some(DeviceSelection {
        physical_device,
        name,
        kind: GpuKind::from(properties.device_type),
        families: QueueFamilies { graphics, present, transfer },
        device_local_host_visible: has_device_local_host_visible(&memory),
        max_anisotropy: properties.limits.max_sampler_anisotropy,
    })
}

/// Pick the best physical device for `surface`
///
/// # Errors
///
/// `Error::InitializationFailed` when no device meets the requirements.
pub fn select_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<DeviceSelection> {
    unsafe {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("vu::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        let mut candidates: Vec<DeviceSelection> = physical_devices
            .into_iter()
            .filter_map(|pd| evaluate(instance, surface_loader, surface, pd))
            .collect();
        candidates.sort_by_key(|c| c.kind.rank());

        let selection = candidates.into_iter().next().ok_or_else(|| {
            engine_error!("vu::vulkan", "No suitable Vulkan GPU found");
            Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
        })?;

        engine_info!("vu::vulkan", "Selected GPU '{}' ({:?}), queues graphics={} present={} transfer={}",
            selection.name, selection.kind,
            selection.families.graphics, selection.families.present, selection.families.transfer);

        Ok(selection)
    }
}

/// Create the logical device with one queue per distinct family
pub fn create_logical_device(instance: &ash::Instance, selection: &DeviceSelection) -> Result<ash::Device> {
    let queue_priorities = [1.0];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = selection
        .families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect();

    let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

    let device_features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(true);

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&device_extension_names)
        .enabled_features(&device_features);

    unsafe {
        instance
            .create_device(selection.physical_device, &device_create_info, None)
            .map_err(|e| {
                engine_error!("vu::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })
    }
}

/// Application name as a C string, falling back to a fixed name on interior NULs
pub fn app_name(name: &str) -> CString {
    CString::new(name).unwrap_or_else(|_| c"vu application".to_owned())
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
