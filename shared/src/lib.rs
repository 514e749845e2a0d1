//! Shared configuration types for the ReadNest backend
//!
//! This crate provides the configuration structures used across the
//! server modules:
//! - JWT and session-security configuration
//! - Database connection configuration
//! - Environment detection and logging configuration

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, DatabaseConfig, Environment, JwtConfig, LoggingConfig, SecurityConfig,
};
