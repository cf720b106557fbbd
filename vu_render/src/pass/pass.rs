//! Render passes as submitted by the application each frame.

use std::str::FromStr;
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use crate::config::MAX_LIGHTS;
use crate::error::Error;
use crate::pass::packet::Packets;
use crate::engine_warn;

/// The two fixed render passes, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    /// World geometry: clears color and depth
    Pass3D = 0,
    /// Overlay: loads the 3D result and draws on top
    Pass2D = 1,
}

impl PassId {
    pub const ALL: [PassId; 2] = [PassId::Pass3D, PassId::Pass2D];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for PassId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3D" => Ok(PassId::Pass3D),
            "2D" => Ok(PassId::Pass2D),
            other => Err(Error::InvalidResource(format!("unknown pass '{}'", other))),
        }
    }
}

/// Scene-scope uniforms a pass provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassUniform {
    Proj,
    View,
    Cam,
    Lights,
    NLights,
}

impl PassUniform {
    pub fn name(self) -> &'static str {
        match self {
            PassUniform::Proj => "proj",
            PassUniform::View => "view",
            PassUniform::Cam => "cam",
            PassUniform::Lights => "lights",
            PassUniform::NLights => "nlights",
        }
    }
}

impl FromStr for PassUniform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proj" => Ok(PassUniform::Proj),
            "view" => Ok(PassUniform::View),
            "cam" => Ok(PassUniform::Cam),
            "lights" => Ok(PassUniform::Lights),
            "nlights" => Ok(PassUniform::NLights),
            other => Err(Error::InvalidResource(format!("unknown pass uniform '{}'", other))),
        }
    }
}

/// A point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Light {
    /// Bytes per light in the `lights` uniform: two vec4
    pub const STRIDE: usize = 32;

    /// `[x, y, z, intensity, r, g, b, 0]`
    pub fn to_floats(&self) -> [f32; 8] {
        [
            self.position.x, self.position.y, self.position.z, self.intensity,
            self.color.x, self.color.y, self.color.z, 0.0,
        ]
    }
}

/// One render pass worth of packets plus its scene uniforms and lights
///
/// Passes are meant to be kept by the application and reset every frame.
#[derive(Debug)]
pub struct Pass {
    id: PassId,
    pub packets: Packets,
    uniforms: FxHashMap<PassUniform, Vec<u8>>,
    lights: Vec<Light>,
}

impl Pass {
    pub fn new(id: PassId) -> Self {
        Self {
            id,
            packets: Packets::new(),
            uniforms: FxHashMap::default(),
            lights: Vec::with_capacity(MAX_LIGHTS),
        }
    }

    pub fn id(&self) -> PassId {
        self.id
    }

    /// Set raw uniform bytes. `Lights` and `NLights` are derived from
    /// [`add_light`](Self::add_light) unless set here.
    pub fn set_uniform(&mut self, uniform: PassUniform, bytes: &[u8]) {
        let slot = self.uniforms.entry(uniform).or_default();
        slot.clear();
        slot.extend_from_slice(bytes);
    }

    pub fn set_mat4(&mut self, uniform: PassUniform, value: &Mat4) {
        self.set_uniform(uniform, bytemuck::bytes_of(value));
    }

    pub fn set_vec3(&mut self, uniform: PassUniform, value: Vec3) {
        self.set_uniform(uniform, bytemuck::bytes_of(&value));
    }

    /// Uniform bytes, if set this frame
    pub fn uniform(&self, uniform: PassUniform) -> Option<&[u8]> {
        self.uniforms
            .get(&uniform)
            .filter(|bytes| !bytes.is_empty())
            .map(Vec::as_slice)
    }

    /// Add a light; lights beyond the third are ignored
    pub fn add_light(&mut self, light: Light) -> bool {
        if self.lights.len() >= MAX_LIGHTS {
            engine_warn!("vu::render", "Pass {:?} already has {} lights, light ignored", self.id, MAX_LIGHTS);
            return false;
        }
        self.lights.push(light);
        true
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Light block as laid out in the `lights` uniform (unused lights are zero)
    pub fn light_block(&self) -> [f32; 8 * MAX_LIGHTS] {
        let mut block = [0.0f32; 8 * MAX_LIGHTS];
        for (i, light) in self.lights.iter().enumerate() {
            block[i * 8..(i + 1) * 8].copy_from_slice(&light.to_floats());
        }
        block
    }

    /// Clear packets, uniforms and lights, keeping allocations
    pub fn reset(&mut self) {
        self.packets.reset();
        for bytes in self.uniforms.values_mut() {
            bytes.clear();
        }
        self.lights.clear();
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
