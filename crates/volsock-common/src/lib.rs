pub mod errors;
pub mod id;
pub mod protocol;

pub use errors::{ConfigError, ProtocolError, VolsockError};
pub use id::GroupId;
pub use protocol::Message;

pub type Result<T> = std::result::Result<T, VolsockError>;
