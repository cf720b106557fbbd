//! Draw packets: one packet is one draw call.

use std::str::FromStr;
use glam::{Mat4, Vec4};
use rustc_hash::FxHashMap;
use crate::error::Error;
use crate::resource::{InstanceId, MeshId, TextureId};
use crate::shader::ShaderId;

/// Model-scope uniforms a packet can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketUniform {
    Model,
    Scale,
    Color,
    Material,
}

impl PacketUniform {
    pub fn name(self) -> &'static str {
        match self {
            PacketUniform::Model => "model",
            PacketUniform::Scale => "scale",
            PacketUniform::Color => "color",
            PacketUniform::Material => "material",
        }
    }
}

impl FromStr for PacketUniform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(PacketUniform::Model),
            "scale" => Ok(PacketUniform::Scale),
            "color" => Ok(PacketUniform::Color),
            "material" => Ok(PacketUniform::Material),
            other => Err(Error::InvalidResource(format!("unknown packet uniform '{}'", other))),
        }
    }
}

/// Instanced-draw reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceRef {
    pub id: InstanceId,
    pub count: u32,
}

/// One draw call: what to draw, with which shader and textures
///
/// Packets are pooled inside [`Packets`]; `reset` clears the values but keeps
/// the allocations for the next frame.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    pub shader: ShaderId,
    pub mesh: MeshId,
    /// Texture per sampler uniform, in declaration order
    pub textures: Vec<TextureId>,
    pub instance: Option<InstanceRef>,
    /// Caller-defined identifier, ignored by the renderer
    pub tag: u32,
    /// Caller-defined sort key, ignored by the renderer
    pub bucket: u64,
    data: FxHashMap<PacketUniform, Vec<u8>>,
}

impl Packet {
    /// Set raw uniform bytes
    pub fn set_data(&mut self, uniform: PacketUniform, bytes: &[u8]) -> &mut Self {
        let slot = self.data.entry(uniform).or_default();
        slot.clear();
        slot.extend_from_slice(bytes);
        self
    }

    pub fn set_mat4(&mut self, uniform: PacketUniform, value: &Mat4) -> &mut Self {
        self.set_data(uniform, bytemuck::bytes_of(value))
    }

    pub fn set_vec4(&mut self, uniform: PacketUniform, value: Vec4) -> &mut Self {
        self.set_data(uniform, bytemuck::bytes_of(&value))
    }

    pub fn set_f32(&mut self, uniform: PacketUniform, value: f32) -> &mut Self {
        self.set_data(uniform, bytemuck::bytes_of(&value))
    }

    /// Uniform bytes, if set this frame
    pub fn data(&self, uniform: PacketUniform) -> Option<&[u8]> {
        self.data
            .get(&uniform)
            .filter(|bytes| !bytes.is_empty())
            .map(Vec::as_slice)
    }

    pub fn is_instanced(&self) -> bool {
        self.instance.is_some()
    }

    pub fn reset(&mut self) {
        self.shader = 0;
        self.mesh = 0;
        self.textures.clear();
        self.instance = None;
        self.tag = 0;
        self.bucket = 0;
        for bytes in self.data.values_mut() {
            bytes.clear();
        }
    }
}

/// Growable packet list that reuses packets across frames
#[derive(Debug, Default)]
pub struct Packets {
    pool: Vec<Packet>,
    len: usize,
}

impl Packets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a packet, reusing a pooled one when available
    pub fn next(&mut self) -> &mut Packet {
        if self.len == self.pool.len() {
            self.pool.push(Packet::default());
        } else {
            self.pool[self.len].reset();
        }
        self.len += 1;
        &mut self.pool[self.len - 1]
    }

    pub fn as_slice(&self) -> &[Packet] {
        &self.pool[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Empty the list without freeing pooled packets
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Packets allocated so far, used or not
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
