//! Shader configuration, uniform layout and the per-shader binding state

pub mod shader_config;
pub mod uniform_layout;
pub mod material;
pub mod registry;

pub use shader_config::{
    Attribute, AttributeName, AttributeSource, DataType, RenderFlags, ShaderConfig, ShaderId,
    ShaderStages, Uniform, UniformScope,
};
pub use uniform_layout::{UniformLayout, UniformSlot};
pub use material::{MaterialId, MaterialRegistry};
pub use registry::{ShaderEntry, ShaderRegistry};
