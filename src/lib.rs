pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod excel;
pub mod models;
pub mod notify;
pub mod server;
pub mod ws;
