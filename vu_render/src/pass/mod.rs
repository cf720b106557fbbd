//! Per-frame draw input: passes and their packets

pub mod pass;
pub mod packet;

pub use pass::{Light, Pass, PassId, PassUniform};
pub use packet::{InstanceRef, Packet, PacketUniform, Packets};
