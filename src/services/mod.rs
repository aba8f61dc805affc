pub mod bedrock;
pub mod session;
pub mod transport;

pub use bedrock::{BedrockClient, ModelClient};
pub use session::{ChatController, ConversationState, SessionStatus, SubmitHandle};
pub use transport::{HttpTransport, QueryTransport, TransportError};
