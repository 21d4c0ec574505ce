pub mod codec;
pub mod ffmpeg;
pub mod sink;
