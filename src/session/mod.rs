pub mod pool;
pub mod progress;
pub mod stitcher;
