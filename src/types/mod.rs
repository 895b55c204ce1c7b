// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod completion_link;
pub mod message;
pub mod progress;
pub mod upload;
pub mod user_data;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response::ChatResponse;
pub use completion_link::{CompletionLink, DOWNLOAD_LABEL};
pub use message::{Message, Sender};
pub use progress::Progress;
pub use upload::{PHOTO_FIELD, PhotoUpload, UploadResponse};
pub use user_data::UserData;
