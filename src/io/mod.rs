//! Input/output helpers.
//!
//! - runcard YAML (`runcard`)
//! - MC run discovery (`discover`)
//! - YODA scatter read/write (`yoda`)
//! - surrogate / minimizer / benchmark JSON (`inputs`)
//! - comparison table export to CSV (`export`)

pub mod discover;
pub mod export;
pub mod inputs;
pub mod runcard;
pub mod yoda;

pub use discover::*;
pub use export::*;
pub use inputs::*;
pub use runcard::*;
pub use yoda::*;
