//! Loaded shaders and their per-shader binding state

use crate::error::{Error, Result};
use crate::shader::material::MaterialRegistry;
use crate::shader::shader_config::{ShaderConfig, ShaderId};
use crate::shader::uniform_layout::UniformLayout;
use crate::utils::IdAllocator;

/// A loaded shader: its configuration, uniform layout, material slots and
/// the backend's pipeline objects
#[derive(Debug)]
pub struct ShaderEntry<S> {
    pub config: ShaderConfig,
    pub layout: UniformLayout,
    pub materials: MaterialRegistry,
    scene_written: Vec<bool>,
    pub backend: S,
}

impl<S> ShaderEntry<S> {
    pub fn new(
        config: ShaderConfig,
        layout: UniformLayout,
        max_materials: usize,
        image_count: usize,
        backend: S,
    ) -> Self {
        Self {
            config,
            layout,
            materials: MaterialRegistry::new(max_materials, image_count),
            scene_written: vec![false; image_count],
            backend,
        }
    }

    /// Whether the scene descriptor for `image` was written this frame
    pub fn is_scene_written(&self, image: usize) -> bool {
        self.scene_written.get(image).copied().unwrap_or(false)
    }

    /// Flag the scene descriptor for `image` as written.
    /// Returns true when the caller must write it now.
    pub fn mark_scene_written(&mut self, image: usize) -> bool {
        match self.scene_written.get_mut(image) {
            Some(written) if !*written => {
                *written = true;
                true
            }
            _ => false,
        }
    }

    fn reset_scene_flags(&mut self) {
        self.scene_written.iter_mut().for_each(|w| *w = false);
    }
}

/// Shader table indexed by [`ShaderId`]. IDs of dropped shaders are reused.
#[derive(Debug)]
pub struct ShaderRegistry<S> {
    ids: IdAllocator,
    entries: Vec<Option<ShaderEntry<S>>>,
}

impl<S> ShaderRegistry<S> {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
            entries: Vec::new(),
        }
    }

    /// Register a shader
    ///
    /// # Errors
    ///
    /// `Error::CapacityExceeded` when every 16-bit ID is in use. The entry
    /// is handed back so the caller can release its backend objects.
    pub fn insert(&mut self, entry: ShaderEntry<S>) -> std::result::Result<ShaderId, (Error, ShaderEntry<S>)> {
        let id = self.ids.alloc();
        if id > ShaderId::MAX as u32 {
            self.ids.free(id);
            return Err((Error::CapacityExceeded("shader IDs exhausted".to_string()), entry));
        }
        let index = id as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        self.entries[index] = Some(entry);
        Ok(id as ShaderId)
    }

    pub fn get(&self, id: ShaderId) -> Option<&ShaderEntry<S>> {
        self.entries.get(id as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ShaderId) -> Option<&mut ShaderEntry<S>> {
        self.entries.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Remove a shader, returning it so its backend objects can be released
    pub fn remove(&mut self, id: ShaderId) -> Option<ShaderEntry<S>> {
        let entry = self.entries.get_mut(id as usize).and_then(Option::take)?;
        self.ids.free(id as u32);
        Some(entry)
    }

    /// Start of frame: scene descriptors are rewritten once per image per frame
    pub fn reset_scene_flags(&mut self) {
        self.entries.iter_mut().flatten().for_each(ShaderEntry::reset_scene_flags);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShaderId, &ShaderEntry<S>)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i as ShaderId, e)))
    }

    /// Remove every shader
    pub fn drain(&mut self) -> Vec<ShaderEntry<S>> {
        self.ids = IdAllocator::new();
        self.entries.drain(..).flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S> Default for ShaderRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
