/*!
# vu renderer core

Backend-agnostic core of the vu renderer: a two-pass (3D world, 2D overlay)
frame pipeline fed with passes of draw packets.

This crate holds everything that does not need a GPU. Backends (Vulkan in
`vu_render_vulkan`) implement [`vu::Renderer`] and [`vu::render::CommandList`]
and reuse the bookkeeping defined here.

## Architecture

- **Context**: facade turning `draw(passes, dt)` into begin/draw/end frame
- **Renderer**: backend capability trait (frames, textures, meshes, shaders)
- **Dispatcher**: records passes into a `CommandList`, binding lazily
- **BufferPools**: range placement of meshes and instance data in shared pools
- **ShaderRegistry**: loaded shaders with their uniform layout and materials
- **FrameRing / ResizeTracker**: frame-slot state machine and deferred resize
*/

// Internal modules
mod error;
mod engine;
mod config;
mod context;
mod log;
mod utils;
mod frame;
mod pass;
mod renderer;
mod resource;
mod shader;

// Main vu namespace module
pub mod vu {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger registry
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{
        RendererConfig, MATERIAL_UNIFORM_BUDGET, MAX_LIGHTS, MODEL_UNIFORM_BUDGET,
        SCENE_UNIFORM_BUDGET,
    };

    // Facade and backend trait
    pub use crate::context::Context;
    pub use crate::renderer::{FrameStatus, Renderer, RendererStats};

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Command recording and frame dispatch, for backends
    pub mod render {
        pub use crate::renderer::{
            ClearValue, CommandList, Dispatcher, DrawStats, FrameTarget, Rect2D, Viewport,
        };
        pub use crate::frame::{FrameRing, ResizeTracker, SlotState};
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Shader sub-module
    pub mod shader {
        pub use crate::shader::*;
    }

    // Passes and packets
    pub mod pass {
        pub use crate::pass::*;
    }

    // Utilities shared with backends
    pub mod utils {
        pub use crate::utils::{IdAllocator, RangeAllocator};
    }
}

// Re-export math library at crate root
pub use glam;
