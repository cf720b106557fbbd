//! Renderer configuration

use std::path::PathBuf;
use std::time::Duration;
use crate::error::{Error, Result};

/// Bytes reserved per image for scene-scope uniforms
pub const SCENE_UNIFORM_BUDGET: u32 = 256;

/// Bytes reserved per material per image for material-scope uniforms
pub const MATERIAL_UNIFORM_BUDGET: u32 = 256;

/// Bytes available for model-scope uniforms (push constants)
pub const MODEL_UNIFORM_BUDGET: u32 = 128;

/// Maximum number of lights a pass can carry
pub const MAX_LIGHTS: usize = 3;

/// Renderer configuration
///
/// Every field has a usable default; a typical application only sets
/// `app_name`, the initial size and `shader_dir`.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Initial frame width in pixels
    pub width: u32,
    /// Initial frame height in pixels
    pub height: u32,
    /// Frames in flight (frame ring size)
    pub frame_count: u32,
    /// Preferred swapchain image count (clamped to what the surface allows)
    pub image_count: u32,
    /// Material descriptor slots per shader
    pub max_materials: u32,
    /// Vertex pool size, in vertices per attribute kind
    pub vertex_space: u64,
    /// Instance pool size, in instances per attribute kind
    pub instance_space: u64,
    /// Directory holding `<name>.<stage>.spv` files
    pub shader_dir: PathBuf,
    /// Use MAILBOX presentation when available (FIFO otherwise)
    pub prefer_mailbox: bool,
    /// Fence wait limit; a timeout is fatal
    pub fence_timeout: Duration,
    /// Initial clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Enable validation layers (only honored with the `vulkan-validation` feature)
    pub enable_validation: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "vu application".to_string(),
            width: 800,
            height: 600,
            frame_count: 2,
            image_count: 3,
            max_materials: 256,
            vertex_space: 1_000_000,
            instance_space: 100_000,
            shader_dir: PathBuf::from("shaders"),
            prefer_mailbox: true,
            fence_timeout: Duration::from_secs(5),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl RendererConfig {
    /// Check the configuration before any GPU object is created
    ///
    /// # Errors
    ///
    /// Returns `Error::InitializationFailed` when a count or pool size is zero,
    /// or when `max_materials` does not fit a material ID.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("frame_count", self.frame_count as u64),
            ("image_count", self.image_count as u64),
            ("max_materials", self.max_materials as u64),
            ("vertex_space", self.vertex_space),
            ("instance_space", self.instance_space),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, v)| *v == 0) {
            return Err(Error::InitializationFailed(format!("{} must be greater than zero", name)));
        }
        if self.max_materials > u16::MAX as u32 + 1 {
            return Err(Error::InitializationFailed(format!(
                "max_materials {} exceeds {}", self.max_materials, u16::MAX as u32 + 1
            )));
        }
        if self.fence_timeout.is_zero() {
            return Err(Error::InitializationFailed("fence_timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Fence timeout in nanoseconds, as the GPU API expects it
    pub fn fence_timeout_ns(&self) -> u64 {
        u64::try_from(self.fence_timeout.as_nanos()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
