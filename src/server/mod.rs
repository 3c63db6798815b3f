mod server;
mod service;
mod ticket;

pub use server::*;
pub use service::*;
pub use ticket::*;
