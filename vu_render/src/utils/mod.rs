pub mod id_allocator;
pub mod range_allocator;

pub use id_allocator::IdAllocator;
pub use range_allocator::RangeAllocator;
