//! Manual memory-type selection.

use ash::vk;

/// First memory type allowed by `type_bits` whose properties contain `flags`
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = (props.memory_type_count as usize).min(props.memory_types.len());
    props.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(i, t)| type_bits & (1 << i) != 0 && t.property_flags.contains(flags))
        .map(|(i, _)| i as u32)
}

/// Flags for per-image uniform buffers: mapped, coherent, device-local if possible
pub fn uniform_memory_flags(device_local_host_visible: bool) -> vk::MemoryPropertyFlags {
    let flags = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
    if device_local_host_visible {
        flags | vk::MemoryPropertyFlags::DEVICE_LOCAL
    } else {
        flags
    }
}

#[cfg(test)]
#[path = "vulkan_memory_tests.rs"]
mod tests;
