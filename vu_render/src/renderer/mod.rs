/// Renderer module - backend trait, command recording and the draw dispatcher

pub mod renderer;
pub mod command_list;
pub mod dispatcher;

#[cfg(test)]
pub mod mock_renderer;

pub use renderer::*;
pub use command_list::*;
pub use dispatcher::*;
