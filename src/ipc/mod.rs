//! Control socket for driving and observing the popup from outside

pub mod client;
mod codec;
mod protocol;
mod server;

pub use protocol::{Request, Status};
pub use server::Server;
