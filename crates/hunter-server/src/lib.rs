pub mod auth;
pub mod client;
pub mod command;
pub mod frame;
pub mod server;
pub mod session;
pub mod transport;

pub use server::{start, ServerConfig, ServerHandle};
pub use session::{Session, SessionSettings};
