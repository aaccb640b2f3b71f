pub mod colormap;
pub mod pipeline;
