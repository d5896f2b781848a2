mod launch;
mod paths;

pub use launch::open_url;
pub use paths::{AppPaths, AppPathsError};
