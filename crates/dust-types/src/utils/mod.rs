//! Utility functions shared across the sweeper.

/// Amount conversion between base units and human-decimal strings.
pub mod conversion;
/// String formatting helpers for hex prefixes.
pub mod formatting;
/// Timestamp helpers.
pub mod helpers;

pub use conversion::{format_units, parse_units, ConversionError};
pub use formatting::{with_0x_prefix, without_0x_prefix};
pub use helpers::current_timestamp_millis;
