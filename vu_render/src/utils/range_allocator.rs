/// Byte-range allocator for the shared vertex and instance pools.
///
/// New ranges are appended at the end of the used area. Freed ranges go to an
/// offset-sorted free list; adjacent free ranges are merged, and a range freed
/// at the end of the used area shrinks it instead. Allocation reuses the first
/// free range that fits before appending.
///
/// Without frees, allocation is strictly append-only: each range starts where
/// the previous one ended.
#[derive(Debug, Clone)]
pub struct RangeAllocator {
    capacity: u64,
    end: u64,
    free: Vec<(u64, u64)>,
}

impl RangeAllocator {
    /// Create an allocator managing `capacity` bytes
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            end: 0,
            free: Vec::new(),
        }
    }

    /// Allocate `size` bytes, returning the offset or `None` if the pool is full.
    ///
    /// A zero-size request succeeds at the current end and reserves nothing.
    pub fn allocate(&mut self, size: u64) -> Option<u64> {
        if size == 0 {
            return Some(self.end);
        }
        if let Some(i) = self.free.iter().position(|&(_, len)| len >= size) {
            let (offset, len) = self.free[i];
            if len == size {
                self.free.remove(i);
            } else {
                self.free[i] = (offset + size, len - size);
            }
            return Some(offset);
        }
        let new_end = self.end.checked_add(size)?;
        if new_end > self.capacity {
            return None;
        }
        let offset = self.end;
        self.end = new_end;
        Some(offset)
    }

    /// Release a range previously returned by [`allocate`](Self::allocate)
    pub fn free(&mut self, offset: u64, size: u64) {
        if size == 0 {
            return;
        }
        debug_assert!(offset + size <= self.end, "freeing beyond the used area");

        if offset + size == self.end {
            self.end = offset;
            // Absorb a free range that now touches the end
            while let Some(&(last_offset, last_len)) = self.free.last() {
                if last_offset + last_len != self.end {
                    break;
                }
                self.end = last_offset;
                self.free.pop();
            }
            return;
        }

        let i = self.free.partition_point(|&(o, _)| o < offset);
        self.free.insert(i, (offset, size));

        // Merge with the next range, then with the previous one
        if i + 1 < self.free.len() && self.free[i].0 + self.free[i].1 == self.free[i + 1].0 {
            self.free[i].1 += self.free[i + 1].1;
            self.free.remove(i + 1);
        }
        if i > 0 && self.free[i - 1].0 + self.free[i - 1].1 == self.free[i].0 {
            self.free[i - 1].1 += self.free[i].1;
            self.free.remove(i);
        }
    }

    /// Offset one past the last used byte
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Total managed bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes currently allocated
    pub fn used(&self) -> u64 {
        self.end - self.free.iter().map(|&(_, len)| len).sum::<u64>()
    }

    /// Number of holes in the used area
    pub fn fragment_count(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
#[path = "range_allocator_tests.rs"]
mod tests;
