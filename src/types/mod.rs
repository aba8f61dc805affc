pub mod errors;
pub mod message;

pub use errors::{AppError, ModelError};
pub use message::{ErrorResponse, Message, QueryRequest, QueryResponse, Role};
