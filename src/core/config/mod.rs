pub mod data;
pub mod io;
pub mod printing;


pub use data::{path_display, Config, DEFAULT_BASE_URL};
pub use io::ConfigError;
