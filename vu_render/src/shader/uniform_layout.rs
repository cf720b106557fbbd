//! Uniform layout derivation.
//!
//! Declared uniforms are split by scope and packed in declaration order with
//! std140 alignment into three fixed regions:
//!
//! | scope    | storage                               | budget |
//! |----------|---------------------------------------|--------|
//! | scene    | uniform buffer, set 0 binding 0       | 256 B  |
//! | material | uniform buffer + samplers, set 1      | 256 B  |
//! | model    | push constants                        | 128 B  |

use std::str::FromStr;
use crate::config::{MATERIAL_UNIFORM_BUDGET, MODEL_UNIFORM_BUDGET, SCENE_UNIFORM_BUDGET};
use crate::error::{Error, Result};
use crate::pass::{Packet, PacketUniform, Pass, PassUniform};
use crate::shader::shader_config::{DataType, ShaderConfig, UniformScope};

/// A uniform placed inside its scope's region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot<N> {
    pub name: N,
    pub data: DataType,
    pub offset: u32,
}

impl<N> UniformSlot<N> {
    pub fn end(&self) -> u32 {
        self.offset + self.data.size()
    }
}

/// Where every uniform of a shader lives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    pub scene: Vec<UniformSlot<PassUniform>>,
    pub scene_size: u32,
    pub material: Vec<UniformSlot<PacketUniform>>,
    pub material_size: u32,
    /// Sampler names in declaration order; binding `i + 1` when material data
    /// exists, binding `i` otherwise
    pub samplers: Vec<String>,
    pub model: Vec<UniformSlot<PacketUniform>>,
    pub model_size: u32,
}

fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) / align * align
}

/// Append `data` at the next aligned offset, returning the slot offset
fn place(cursor: &mut u32, data: DataType) -> u32 {
    let offset = align_up(*cursor, data.alignment());
    *cursor = offset + data.size();
    offset
}

fn parse_name<N: FromStr<Err = Error>>(shader: &str, name: &str, scope: UniformScope) -> Result<N> {
    name.parse::<N>().map_err(|_| {
        Error::InvalidResource(format!(
            "shader '{}': '{}' is not a {:?}-scope uniform", shader, name, scope
        ))
    })
}

fn check_budget(shader: &str, scope: &str, size: u32, budget: u32) -> Result<()> {
    if size > budget {
        return Err(Error::CapacityExceeded(format!(
            "shader '{}': {} uniforms need {} bytes, limit is {}", shader, scope, size, budget
        )));
    }
    Ok(())
}

impl UniformLayout {
    /// Derive the layout for a shader
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` for a name outside its scope's vocabulary, a
    ///   sampler outside material scope, or `light3` on anything but `lights`
    /// - `Error::CapacityExceeded` when a region exceeds its budget
    pub fn derive(config: &ShaderConfig) -> Result<Self> {
        let mut layout = UniformLayout::default();

        for uniform in &config.uniforms {
            let is_sampler = uniform.data == DataType::Sampler;
            if is_sampler && uniform.scope != UniformScope::Material {
                return Err(Error::InvalidResource(format!(
                    "shader '{}': sampler '{}' must be material scope", config.name, uniform.name
                )));
            }
            match uniform.scope {
                UniformScope::Scene => {
                    let name: PassUniform = parse_name(&config.name, &uniform.name, uniform.scope)?;
                    if (name == PassUniform::Lights) != (uniform.data == DataType::Light3) {
                        return Err(Error::InvalidResource(format!(
                            "shader '{}': '{}' cannot be {:?}", config.name, uniform.name, uniform.data
                        )));
                    }
                    let offset = place(&mut layout.scene_size, uniform.data);
                    layout.scene.push(UniformSlot { name, data: uniform.data, offset });
                }
                UniformScope::Material if is_sampler => {
                    layout.samplers.push(uniform.name.clone());
                }
                UniformScope::Material | UniformScope::Model => {
                    let name: PacketUniform = parse_name(&config.name, &uniform.name, uniform.scope)?;
                    if uniform.data == DataType::Light3 {
                        return Err(Error::InvalidResource(format!(
                            "shader '{}': '{}' cannot be light3", config.name, uniform.name
                        )));
                    }
                    let (slots, cursor) = if uniform.scope == UniformScope::Material {
                        (&mut layout.material, &mut layout.material_size)
                    } else {
                        (&mut layout.model, &mut layout.model_size)
                    };
                    let offset = place(cursor, uniform.data);
                    slots.push(UniformSlot { name, data: uniform.data, offset });
                }
            }
        }

        check_budget(&config.name, "scene", layout.scene_size, SCENE_UNIFORM_BUDGET)?;
        check_budget(&config.name, "material", layout.material_size, MATERIAL_UNIFORM_BUDGET)?;
        check_budget(&config.name, "model", layout.model_size, MODEL_UNIFORM_BUDGET)?;
        Ok(layout)
    }

    pub fn has_scene(&self) -> bool {
        !self.scene.is_empty()
    }

    /// Whether the shader has a material descriptor set (data or samplers)
    pub fn has_material(&self) -> bool {
        !self.material.is_empty() || !self.samplers.is_empty()
    }

    pub fn has_material_data(&self) -> bool {
        !self.material.is_empty()
    }

    pub fn has_model(&self) -> bool {
        !self.model.is_empty()
    }

    /// Binding of the first sampler in the material set
    pub fn first_sampler_binding(&self) -> u32 {
        if self.has_material_data() { 1 } else { 0 }
    }

    /// Pack the scene region from a pass into `out` (resized to `scene_size`)
    ///
    /// `lights` and `nlights` come from the pass lights unless set explicitly.
    /// Missing values are zero.
    pub fn pack_scene(&self, pass: &Pass, out: &mut Vec<u8>) {
        out.clear();
        out.resize(self.scene_size as usize, 0);
        for slot in &self.scene {
            let dst = &mut out[slot.offset as usize..slot.end() as usize];
            match (slot.name, pass.uniform(slot.name)) {
                (_, Some(bytes)) => copy_clamped(dst, bytes),
                (PassUniform::Lights, None) => {
                    copy_clamped(dst, bytemuck::cast_slice(&pass.light_block()));
                }
                (PassUniform::NLights, None) => {
                    let count = pass.lights().len() as i32;
                    copy_clamped(dst, bytemuck::bytes_of(&count));
                }
                (_, None) => {}
            }
        }
    }

    /// Pack the model region from a packet into `out` (resized to `model_size`)
    pub fn pack_model(&self, packet: &Packet, out: &mut Vec<u8>) {
        pack_packet(&self.model, self.model_size, packet, out);
    }

    /// Pack the material data region from a packet into `out`
    pub fn pack_material(&self, packet: &Packet, out: &mut Vec<u8>) {
        pack_packet(&self.material, self.material_size, packet, out);
    }
}

fn pack_packet(slots: &[UniformSlot<PacketUniform>], size: u32, packet: &Packet, out: &mut Vec<u8>) {
    out.clear();
    out.resize(size as usize, 0);
    for slot in slots {
        if let Some(bytes) = packet.data(slot.name) {
            copy_clamped(&mut out[slot.offset as usize..slot.end() as usize], bytes);
        }
    }
}

/// Copy as much of `src` as fits in `dst`
fn copy_clamped(dst: &mut [u8], src: &[u8]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

#[cfg(test)]
#[path = "uniform_layout_tests.rs"]
mod tests;
