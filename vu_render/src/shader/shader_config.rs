//! Shader configuration: stages, vertex inputs, uniforms and render flags.
//!
//! Names follow the vocabulary of the shader description files
//! ("position", "i_locus", "proj", "mat4", "cullOff", ...), so a loader can
//! build a [`ShaderConfig`] with `str::parse`.

use std::str::FromStr;
use bitflags::bitflags;
use crate::error::{Error, Result};
use crate::pass::PassId;
use crate::resource::{InstanceKind, VertexKind};

/// Shader identifier
pub type ShaderId = u16;

bitflags! {
    /// Programmable stages present in a shader
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 0x1;
        const GEOMETRY = 0x2;
        const FRAGMENT = 0x4;
    }
}

impl ShaderStages {
    /// File-name suffixes of the byte-code blobs, in pipeline order
    pub fn suffixes(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(ShaderStages::VERTEX) {
            out.push("vert");
        }
        if self.contains(ShaderStages::GEOMETRY) {
            out.push("geom");
        }
        if self.contains(ShaderStages::FRAGMENT) {
            out.push("frag");
        }
        out
    }
}

impl FromStr for ShaderStages {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vert" => Ok(ShaderStages::VERTEX),
            "geom" => Ok(ShaderStages::GEOMETRY),
            "frag" => Ok(ShaderStages::FRAGMENT),
            other => Err(Error::InvalidResource(format!("unknown shader stage '{}'", other))),
        }
    }
}

bitflags! {
    /// Fixed-function overrides
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        /// Disable back-face culling
        const CULL_OFF = 0x1;
        /// Line-list topology instead of triangle-list
        const DRAW_LINES = 0x2;
    }
}

impl FromStr for RenderFlags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cullOff" => Ok(RenderFlags::CULL_OFF),
            "drawLines" => Ok(RenderFlags::DRAW_LINES),
            other => Err(Error::InvalidResource(format!("unknown render flag '{}'", other))),
        }
    }
}

// ============================================================================
// DATA TYPES
// ============================================================================

/// Data type of an attribute or uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    /// Block of three lights (see [`crate::pass::Light`])
    Light3,
    Sampler,
}

impl DataType {
    /// Bytes a value occupies in a std140 block (mat3 columns are padded to vec4)
    pub fn size(self) -> u32 {
        match self {
            DataType::Int | DataType::Float => 4,
            DataType::Vec2 => 8,
            DataType::Vec3 => 12,
            DataType::Vec4 => 16,
            DataType::Mat3 => 48,
            DataType::Mat4 => 64,
            DataType::Light3 => 96,
            DataType::Sampler => 0,
        }
    }

    /// Offset alignment inside a uniform block
    pub fn alignment(self) -> u32 {
        match self {
            DataType::Int | DataType::Float | DataType::Sampler => 4,
            DataType::Vec2 => 8,
            _ => 16,
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int" => Ok(DataType::Int),
            "float" => Ok(DataType::Float),
            "vec2" => Ok(DataType::Vec2),
            "vec3" => Ok(DataType::Vec3),
            "vec4" => Ok(DataType::Vec4),
            "mat3" => Ok(DataType::Mat3),
            "mat4" => Ok(DataType::Mat4),
            "light3" => Ok(DataType::Light3),
            "sampler" => Ok(DataType::Sampler),
            other => Err(Error::InvalidResource(format!("unknown data type '{}'", other))),
        }
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Vertex shader inputs, each fed from one shared pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeName {
    Position,
    Texcoord,
    Normal,
    Color,
    InstanceLocus,
    InstanceColor,
    InstanceScale,
}

/// Where an attribute's data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSource {
    Vertex(VertexKind),
    Instance(InstanceKind),
}

impl AttributeName {
    pub fn source(self) -> AttributeSource {
        match self {
            AttributeName::Position => AttributeSource::Vertex(VertexKind::Position),
            AttributeName::Texcoord => AttributeSource::Vertex(VertexKind::Texcoord),
            AttributeName::Normal => AttributeSource::Vertex(VertexKind::Normal),
            AttributeName::Color => AttributeSource::Vertex(VertexKind::Color),
            AttributeName::InstanceLocus => AttributeSource::Instance(InstanceKind::Position),
            AttributeName::InstanceColor => AttributeSource::Instance(InstanceKind::Color),
            AttributeName::InstanceScale => AttributeSource::Instance(InstanceKind::Scale),
        }
    }

    pub fn is_instanced(self) -> bool {
        matches!(self.source(), AttributeSource::Instance(_))
    }
}

impl FromStr for AttributeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "position" => Ok(AttributeName::Position),
            "texcoord" => Ok(AttributeName::Texcoord),
            "normal" => Ok(AttributeName::Normal),
            "v_color" => Ok(AttributeName::Color),
            "i_locus" => Ok(AttributeName::InstanceLocus),
            "i_color" => Ok(AttributeName::InstanceColor),
            "i_scale" => Ok(AttributeName::InstanceScale),
            other => Err(Error::InvalidResource(format!("unknown attribute '{}'", other))),
        }
    }
}

/// One vertex input. Its binding and location are its index in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: AttributeName,
    pub data: DataType,
}

// ============================================================================
// UNIFORMS
// ============================================================================

/// How often a uniform changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformScope {
    /// Once per pass
    Scene,
    /// Once per material (texture set)
    Material,
    /// Once per packet, sent as push constants
    Model,
}

impl FromStr for UniformScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scene" => Ok(UniformScope::Scene),
            "material" => Ok(UniformScope::Material),
            "model" => Ok(UniformScope::Model),
            other => Err(Error::InvalidResource(format!("unknown uniform scope '{}'", other))),
        }
    }
}

/// A declared uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniform {
    pub name: String,
    pub scope: UniformScope,
    pub data: DataType,
}

impl Uniform {
    pub fn new(name: &str, scope: UniformScope, data: DataType) -> Self {
        Self { name: name.to_string(), scope, data }
    }
}

// ============================================================================
// SHADER CONFIG
// ============================================================================

/// Everything needed to build a pipeline for one shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderConfig {
    /// Byte-code is read from `<name>.<stage>.spv`
    pub name: String,
    pub pass: PassId,
    pub stages: ShaderStages,
    pub attributes: Vec<Attribute>,
    pub uniforms: Vec<Uniform>,
    pub render: RenderFlags,
}

impl ShaderConfig {
    /// A vertex+fragment shader for `pass` with no inputs yet
    pub fn new(name: &str, pass: PassId) -> Self {
        Self {
            name: name.to_string(),
            pass,
            stages: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            attributes: Vec::new(),
            uniforms: Vec::new(),
            render: RenderFlags::empty(),
        }
    }

    pub fn with_attribute(mut self, name: AttributeName, data: DataType) -> Self {
        self.attributes.push(Attribute { name, data });
        self
    }

    pub fn with_uniform(mut self, name: &str, scope: UniformScope, data: DataType) -> Self {
        self.uniforms.push(Uniform::new(name, scope, data));
        self
    }

    pub fn with_flags(mut self, flags: RenderFlags) -> Self {
        self.render |= flags;
        self
    }

    /// Structural checks done before any GPU work
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when the stage set is not exactly vertex+fragment,
    /// an attribute is declared twice, or an attribute uses a matrix/sampler type.
    pub fn validate(&self) -> Result<()> {
        if self.stages != ShaderStages::VERTEX | ShaderStages::FRAGMENT {
            return Err(Error::InvalidResource(format!(
                "shader '{}': only vertex+fragment stage sets are supported, got {:?}",
                self.name, self.stages
            )));
        }
        for (i, attr) in self.attributes.iter().enumerate() {
            if self.attributes[..i].iter().any(|a| a.name == attr.name) {
                return Err(Error::InvalidResource(format!(
                    "shader '{}': attribute {:?} declared twice", self.name, attr.name
                )));
            }
            if !matches!(attr.data, DataType::Float | DataType::Vec2 | DataType::Vec3 | DataType::Vec4) {
                return Err(Error::InvalidResource(format!(
                    "shader '{}': attribute {:?} cannot be {:?}", self.name, attr.name, attr.data
                )));
            }
        }
        Ok(())
    }

    pub fn has_instance_attributes(&self) -> bool {
        self.attributes.iter().any(|a| a.name.is_instanced())
    }
}

#[cfg(test)]
#[path = "shader_config_tests.rs"]
mod tests;
