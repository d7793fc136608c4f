pub mod app;
pub mod clock;
pub mod config;
pub mod engine;
pub mod format;
pub mod live;
pub mod models;
pub mod storage;
