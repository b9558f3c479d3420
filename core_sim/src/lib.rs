pub mod addr;
pub mod cache;
pub mod geometry;
pub mod sim;

#[cfg(feature = "stat")]
pub mod stat;
