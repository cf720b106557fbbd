//! Frame ring state machine.
//!
//! Each slot owns a command buffer, a fence and a pair of semaphores on the
//! backend side. The ring only tracks where each slot is in its cycle:
//!
//! ```text
//! Idle(fenced) --begin_recording--> Recording --mark_submitted--> Submitted
//!      ^                               |                              |
//!      +------------abort--------------+                              |
//!      +--------------------------mark_waited-------------------------+
//! ```
//!
//! A slot's command buffer may only be re-recorded after its fence wait
//! succeeded, so the GPU never executes a buffer the CPU is rewriting.

use crate::error::{Error, Result};

/// Where a frame slot is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence waited, command buffer free
    Idle,
    /// Command buffer being recorded
    Recording,
    /// Submitted, fence pending until the GPU retires it
    Submitted,
}

#[derive(Debug, Clone)]
pub struct FrameRing {
    slots: Vec<SlotState>,
    index: usize,
}

impl FrameRing {
    /// Slots start as `Submitted`: their fences are created signaled and are
    /// waited on like any other submission.
    pub fn new(frame_count: usize) -> Self {
        Self {
            slots: vec![SlotState::Submitted; frame_count.max(1)],
            index: 0,
        }
    }

    /// Index of the current slot
    pub fn current(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.slots[self.index]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The current slot's fence wait succeeded
    pub fn mark_waited(&mut self) {
        if self.slots[self.index] == SlotState::Submitted {
            self.slots[self.index] = SlotState::Idle;
        }
    }

    /// Start recording the current slot
    ///
    /// # Errors
    ///
    /// `Error::BackendError` unless the slot's fence was waited since its
    /// last submission.
    pub fn begin_recording(&mut self) -> Result<()> {
        match self.slots[self.index] {
            SlotState::Idle | SlotState::Recording => {
                self.slots[self.index] = SlotState::Recording;
                Ok(())
            }
            SlotState::Submitted => Err(Error::BackendError(format!(
                "frame slot {} re-recorded before its fence was waited", self.index
            ))),
        }
    }

    /// The current slot's command buffer was submitted
    ///
    /// # Errors
    ///
    /// `Error::BackendError` if the slot was not recording.
    pub fn mark_submitted(&mut self) -> Result<()> {
        if self.slots[self.index] != SlotState::Recording {
            return Err(Error::BackendError(format!(
                "frame slot {} submitted while {:?}", self.index, self.slots[self.index]
            )));
        }
        self.slots[self.index] = SlotState::Submitted;
        Ok(())
    }

    /// Drop the frame without submitting. The slot stays waited.
    pub fn abort(&mut self) {
        if self.slots[self.index] == SlotState::Recording {
            self.slots[self.index] = SlotState::Idle;
        }
    }

    /// Move to the next slot
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.slots.len();
    }
}

#[cfg(test)]
#[path = "frame_ring_tests.rs"]
mod tests;
