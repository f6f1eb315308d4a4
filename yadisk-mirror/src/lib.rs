pub mod check;
pub mod config;
pub mod logging;
pub mod paths;
pub mod transfer;
pub mod walker;
