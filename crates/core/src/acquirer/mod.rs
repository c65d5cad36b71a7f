//! Acquisition stage: N_m3u8DL-RE downloads, decrypts and muxes a stream.

mod command;
mod config;

pub use command::AcquisitionCommand;
pub use config::AcquirerConfig;
