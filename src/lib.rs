pub mod app;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod kv;
pub mod models;
pub mod tmdb;
pub mod views;
