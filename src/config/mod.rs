mod settings;
mod workdir;

pub use settings::*;
pub use workdir::*;
