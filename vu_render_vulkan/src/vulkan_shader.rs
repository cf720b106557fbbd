/// Shader stages - SPIR-V loading, reflection and shader modules
///
/// Byte-code lives in `<shader_dir>/<name>.<stage>.spv`, one file per stage.

use ash::vk;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vu_render::vu::shader::ShaderStages;
use vu_render::vu::{Error, Result, MODEL_UNIFORM_BUDGET};
use vu_render::{engine_bail_warn, engine_err, engine_warn_err};

use crate::vulkan_context::GpuContext;

/// Path of one stage's byte-code
pub fn stage_path(dir: &Path, name: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{}.{}.spv", name, suffix))
}

/// SPIR-V words from raw bytes (little-endian)
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        engine_bail_warn!("vu::vulkan", "Shader code not 4-byte aligned (size: {} bytes)", bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Largest push-constant block declared by the code, in bytes
pub fn reflect_push_constant_size(code: &[u32]) -> Result<u32> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_warn_err!("vu::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let size = entry_points
        .iter()
        .flat_map(|entry_point| entry_point.vars.iter())
        .filter_map(|var| match var {
            spirq::var::Variable::PushConstant { ty, .. } => ty.nbyte(),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    Ok(size as u32)
}

/// A compiled stage
pub struct ShaderModule {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
    /// Push constant bytes the code declares
    pub(crate) push_size: u32,
}

impl ShaderModule {
    /// Create a module from SPIR-V words
    ///
    /// # Errors
    ///
    /// `Error::CapacityExceeded` when the push constants exceed the model budget.
    pub fn new(ctx: Arc<GpuContext>, name: &str, stage: vk::ShaderStageFlags, code: &[u32]) -> Result<Self> {
        let push_size = reflect_push_constant_size(code)?;
        if push_size > MODEL_UNIFORM_BUDGET {
            return Err(Error::CapacityExceeded(format!(
                "shader '{}' {:?}: push constants need {} bytes, limit is {}",
                name, stage, push_size, MODEL_UNIFORM_BUDGET
            )));
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe {
            ctx.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("vu::vulkan", "Failed to create shader module for '{}': {:?}", name, e))?
        };

        Ok(Self { ctx, module, stage, push_size })
    }

    /// Load every stage of `stages` for shader `name` from `dir`
    pub fn load_all(ctx: &Arc<GpuContext>, dir: &Path, name: &str, stages: ShaderStages) -> Result<Vec<Self>> {
        stages
            .suffixes()
            .into_iter()
            .map(|suffix| {
                let stage: ShaderStages = suffix.parse()?;
                let path = stage_path(dir, name, suffix);
                let bytes = std::fs::read(&path).map_err(|e| {
                    Error::InvalidResource(format!("shader '{}': cannot read {}: {}", name, path.display(), e))
                })?;
                let code = spirv_words(&bytes)?;
                ShaderModule::new(Arc::clone(ctx), name, stage_flags(stage), &code)
            })
            .collect()
    }
}

/// Vulkan stage flags for a set of stages
pub fn stage_flags(stages: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStages::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStages::GEOMETRY) {
        flags |= vk::ShaderStageFlags::GEOMETRY;
    }
    if stages.contains(ShaderStages::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
