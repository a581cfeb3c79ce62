pub mod allocator;
pub mod booking;
pub mod lifecycle;
pub mod locks;
