pub mod api;
pub mod app;
pub mod bulletin;
pub mod cache;
pub mod config;
pub mod coordinates;
pub mod corpus;
pub mod export;
pub mod fetch_error;
pub mod fetcher;
pub mod scheduler;
pub mod services;
pub mod stations;
pub mod utils;
