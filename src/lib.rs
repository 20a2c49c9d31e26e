pub mod catalog;
pub mod config;
pub mod driver;
pub mod llm;
pub mod models;
pub mod session;
pub mod stylist;
pub mod utils;
