pub mod core;
pub mod services;
pub mod steps;
pub mod ui;
pub mod utils;
