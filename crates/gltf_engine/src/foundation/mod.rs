//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Bounding volumes
//! - Logging utilities

pub mod bounding_box;
pub mod logging;
pub mod math;

pub use bounding_box::BoundingBox;
