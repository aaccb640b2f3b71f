pub mod frames;
pub mod transform;
pub mod window;
