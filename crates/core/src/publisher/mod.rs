//! Publication of finished artifacts to a remote store.

mod config;
mod error;
mod http;
mod traits;

pub use config::PublisherConfig;
pub use error::PublishError;
pub use http::{extract_link, HttpPublisher};
pub use traits::Publisher;
