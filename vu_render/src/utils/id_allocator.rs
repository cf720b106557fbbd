/// Allocates and recycles integer resource IDs.
///
/// Used for mesh, instance-data and shader IDs: a dropped ID goes back to the
/// pool and is handed out again by a later load.
///
/// # Example
///
/// ```ignore
/// let mut ids = IdAllocator::new();
/// let a = ids.alloc();  // 0
/// let b = ids.alloc();  // 1
/// ids.free(a);          // 0 is now available
/// let c = ids.alloc();  // 0 (recycled)
/// ```
#[derive(Debug)]
pub struct IdAllocator {
    free_list: Vec<u32>,
    live: Vec<bool>,
    len: u32,
}

impl IdAllocator {
    /// Create a new empty allocator
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            live: Vec::new(),
            len: 0,
        }
    }

    /// Allocate the next available ID
    pub fn alloc(&mut self) -> u32 {
        self.len += 1;
        match self.free_list.pop() {
            Some(id) => {
                self.live[id as usize] = true;
                id
            }
            None => {
                self.live.push(true);
                (self.live.len() - 1) as u32
            }
        }
    }

    /// Return an ID to the pool. Returns false if it was not allocated.
    pub fn free(&mut self, id: u32) -> bool {
        match self.live.get_mut(id as usize) {
            Some(live) if *live => {
                *live = false;
                self.len -= 1;
                self.free_list.push(id);
                true
            }
            _ => false,
        }
    }

    /// Whether `id` is currently allocated
    pub fn is_live(&self, id: u32) -> bool {
        self.live.get(id as usize).copied().unwrap_or(false)
    }

    /// Highest ID ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.live.len() as u32
    }

    /// Number of currently allocated IDs
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no IDs are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "id_allocator_tests.rs"]
mod tests;
