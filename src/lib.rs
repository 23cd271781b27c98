pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod ops;
pub mod redact;
pub mod step;
pub mod workdir;

mod app;
#[cfg(test)]
mod testing;

pub use app::App;
pub use app::RunSettings;
pub use app::Shutdown;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
