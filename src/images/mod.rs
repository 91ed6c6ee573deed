pub mod host;
pub mod services;

pub use host::{CloudinaryHost, ImageHost};
pub use services::UploadItem;
