pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod maintenance;
pub mod middleware;
pub mod models;
pub mod populate;
pub mod seed;
pub mod services;

pub use app::{app, AppState};
