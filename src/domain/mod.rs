// Domain module - Errors and configuration types shared by every layer
pub mod config;
pub mod error;
