pub mod analytics;
pub mod app;
pub mod color;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod render;
pub mod report;
pub mod state;
pub mod ui;
