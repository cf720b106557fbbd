//! Texture bookkeeping shared by all backends.
//!
//! Texture IDs are indices into an append-only table. A dropped texture
//! leaves an empty slot and its ID is never reissued, so a material created
//! from a set of texture IDs can never silently start sampling a different
//! image.

use crate::error::{Error, Result};

/// Texture identifier
pub type TextureId = u32;

/// RGBA8 pixels, row-major, top row first
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let image = Self { width, height, pixels };
        image.validate()?;
        Ok(image)
    }

    /// A single-color image
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self { width, height, pixels }
    }

    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidResource(format!(
                "image has zero size ({}x{})", self.width, self.height
            )));
        }
        if self.pixels.len() as u64 != self.byte_len() {
            return Err(Error::InvalidResource(format!(
                "{}x{} image needs {} bytes, got {}",
                self.width, self.height, self.byte_len(), self.pixels.len()
            )));
        }
        Ok(())
    }
}

/// Dimensions of a loaded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}

/// Backend texture objects keyed by [`TextureId`]
pub struct TextureTable<T> {
    slots: Vec<Option<(TextureInfo, T)>>,
}

impl<T> TextureTable<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Store a texture under the next ID
    pub fn insert(&mut self, info: TextureInfo, texture: T) -> TextureId {
        self.slots.push(Some((info, texture)));
        (self.slots.len() - 1) as TextureId
    }

    pub fn get(&self, id: TextureId) -> Option<&T> {
        self.slots.get(id as usize).and_then(|s| s.as_ref()).map(|(_, t)| t)
    }

    pub fn get_mut(&mut self, id: TextureId) -> Option<&mut T> {
        self.slots.get_mut(id as usize).and_then(|s| s.as_mut()).map(|(_, t)| t)
    }

    /// IDs of the loaded textures
    pub fn ids(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i as TextureId)
    }

    pub fn info(&self, id: TextureId) -> Option<TextureInfo> {
        self.slots.get(id as usize).and_then(|s| s.as_ref()).map(|(i, _)| *i)
    }

    /// Check that `image` may replace texture `id` in place
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` if `id` is not loaded or `image` is malformed
    /// - `Error::LayoutMismatch` if the dimensions differ
    pub fn check_update(&self, id: TextureId, image: &ImageData) -> Result<&T> {
        image.validate()?;
        let (info, texture) = self
            .slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .ok_or_else(|| Error::InvalidResource(format!("texture {} is not loaded", id)))?;
        if info.width != image.width || info.height != image.height {
            return Err(Error::LayoutMismatch(format!(
                "texture {} is {}x{}, update is {}x{}",
                id, info.width, info.height, image.width, image.height
            )));
        }
        Ok(texture)
    }

    /// Remove a texture, returning its backend object
    pub fn remove(&mut self, id: TextureId) -> Option<T> {
        self.slots.get_mut(id as usize).and_then(Option::take).map(|(_, t)| t)
    }

    /// Remove every texture; IDs issued so far stay retired
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.slots.iter_mut().filter_map(Option::take).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for TextureTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
