//! Converter module for remuxing acquired media.
//!
//! Conversion is a lossless stream copy into MP4 so the result plays in
//! browsers and common players. It never re-encodes.
//!
//! # Example
//!
//! ```ignore
//! use ripline_core::converter::{ConverterConfig, RemuxCommand};
//!
//! let command = RemuxCommand::new("stream/clip.mkv", "stream/clip.mp4")?;
//! let output = runner.run(&command.invocation(&ConverterConfig::default()), &token).await?;
//! ```

mod config;
mod ffmpeg;
mod types;

pub use config::ConverterConfig;
pub use ffmpeg::RemuxCommand;
pub use types::ContainerFormat;
