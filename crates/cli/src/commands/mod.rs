pub mod config;
pub mod patch;
pub mod restore;
pub mod run;
pub mod select;
pub mod util;
pub mod verify;

pub use config::*;
pub use patch::*;
pub use restore::*;
pub use run::*;
pub use select::*;
pub use util::*;
pub use verify::*;
