pub mod pipeline;
pub mod sniff;
pub mod scan;
pub mod normalize;

pub use pipeline::*;
