pub mod multipart;
pub mod request_id;

pub use multipart::{MultipartConfig, MultipartToJson};
pub use request_id::UuidRequestId;
