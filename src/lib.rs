pub mod config;
pub mod metadata;
pub mod s3_client;
pub mod upload;

pub use config::Config;
pub use s3_client::ObjectSummary;
pub use upload::{UploadRequest, UploadResult};
