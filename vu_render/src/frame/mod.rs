//! Frame pacing: the frame-slot ring and deferred resize

pub mod frame_ring;
pub mod resize;

pub use frame_ring::{FrameRing, SlotState};
pub use resize::ResizeTracker;
