mod counter;
mod persister;

pub use counter::*;
pub use persister::*;
