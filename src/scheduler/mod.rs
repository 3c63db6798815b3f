mod midnight;

pub use midnight::*;
