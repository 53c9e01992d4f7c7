//! Site generation: scaffolds a disposable build workspace, synthesizes the
//! static-site sources from a canonical layout, and runs the build toolchain
//! to produce an asset bundle.

pub mod build;
pub mod scaffold;
pub mod synthesize;

pub use build::{BuildCommands, run_build};
pub use scaffold::scaffold;
pub use synthesize::synthesize;
