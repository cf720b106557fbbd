//! Per-shader material slots.
//!
//! A material is an ordered texture set plus the packed material-scope uniform
//! bytes, bound through the shader's material descriptor set. Both are matched
//! exactly (same IDs in the same order, same bytes) so identical materials
//! resolve to the same slot and packets with different material data get
//! slots of their own. Slots are never evicted and a slot's contents never
//! change after creation: descriptor and data writes for a slot happen at
//! most once per swapchain image.

use crate::error::{Error, Result};
use crate::resource::TextureId;

/// Material slot index, unique per shader
pub type MaterialId = u16;

#[derive(Debug, Clone)]
struct Material {
    textures: Vec<TextureId>,
    /// Packed material-scope uniforms
    data: Vec<u8>,
    /// Descriptor written, per swapchain image
    written: Vec<bool>,
}

/// Material slots of one shader
#[derive(Debug, Clone)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    max_materials: usize,
    image_count: usize,
}

impl MaterialRegistry {
    pub fn new(max_materials: usize, image_count: usize) -> Self {
        Self {
            materials: Vec::new(),
            max_materials,
            image_count,
        }
    }

    /// Resolve a texture set and its material data to a slot, creating one on first use
    ///
    /// # Errors
    ///
    /// `Error::CapacityExceeded` once `max_materials` distinct materials exist.
    pub fn resolve(&mut self, textures: &[TextureId], data: &[u8]) -> Result<MaterialId> {
        if let Some(index) = self.materials.iter().position(|m| m.textures == textures && m.data == data) {
            return Ok(index as MaterialId);
        }
        if self.materials.len() >= self.max_materials {
            return Err(Error::CapacityExceeded(format!(
                "material slots exhausted ({} in use)", self.max_materials
            )));
        }
        self.materials.push(Material {
            textures: textures.to_vec(),
            data: data.to_vec(),
            written: vec![false; self.image_count],
        });
        Ok((self.materials.len() - 1) as MaterialId)
    }

    pub fn textures(&self, id: MaterialId) -> Option<&[TextureId]> {
        self.materials.get(id as usize).map(|m| m.textures.as_slice())
    }

    pub fn data(&self, id: MaterialId) -> Option<&[u8]> {
        self.materials.get(id as usize).map(|m| m.data.as_slice())
    }

    /// Whether the descriptor of `id` for `image` was already written
    pub fn is_written(&self, id: MaterialId, image: usize) -> bool {
        self.materials
            .get(id as usize)
            .and_then(|m| m.written.get(image))
            .copied()
            .unwrap_or(false)
    }

    /// Flag the descriptor of `id` for `image` as written.
    /// Returns true when the caller must write it now.
    pub fn mark_written(&mut self, id: MaterialId, image: usize) -> bool {
        match self.materials.get_mut(id as usize).and_then(|m| m.written.get_mut(image)) {
            Some(written) if !*written => {
                *written = true;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn max_materials(&self) -> usize {
        self.max_materials
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
