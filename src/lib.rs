pub mod config;
pub mod error;
pub mod logging;
pub mod ops;
pub mod tui;


pub use error::{DiscoveryFailure, RemoteError};
pub use ops::config::{Container, Server, ServerRegistry};
pub use ops::discovery::Discovery;
pub use ops::shell::{Direction, Shell};
pub use ops::target::{resolve, RemoteTarget, Selection};
