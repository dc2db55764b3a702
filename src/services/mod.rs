//! Syncthing API service implementations.

mod config;
mod devices;
mod folders;
mod urls;

pub use config::ConfigService;
pub use devices::DevicesService;
pub use folders::FoldersService;
