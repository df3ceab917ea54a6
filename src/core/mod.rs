pub mod admin_client;
pub mod error;
pub mod multipart;
pub mod operations;
pub mod order_annotation;
pub mod raw_http;
pub mod staged_upload;
pub mod submission;
