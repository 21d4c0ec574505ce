//! Clip media: provider abstraction, the clip source loader and the built-in providers.

pub mod ffmpeg;
pub mod loader;
pub mod source;
pub mod synthetic;
