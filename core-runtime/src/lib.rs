//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the migration tool:
//! - Logging and tracing infrastructure
//! - Configuration management (credentials and run settings)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the service and the command
//! line front end depend on. It establishes the logging conventions and the
//! validated configuration every run starts from.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
