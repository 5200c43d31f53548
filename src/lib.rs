pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod repositories;
pub mod server;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
