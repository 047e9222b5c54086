mod commands;
mod environment;
mod paths;

pub use commands::{Detach, launch_detached};
pub use environment::{ProcessEnvironment, VariableSource};
pub use paths::{AppPaths, AppPathsError};
