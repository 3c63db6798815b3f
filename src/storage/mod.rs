mod state;
mod store;
#[cfg(test)]
mod memory;

pub use state::*;
pub use store::*;
#[cfg(test)]
pub use memory::*;
