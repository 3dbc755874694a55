pub mod protocol;
pub mod session;

pub use protocol::{parse_line, EngineCommand, EngineOutput};
pub use session::EngineSession;
