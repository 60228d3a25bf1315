//! Amount conversion between base units and human-decimal strings.
//!
//! Token amounts travel through the system as `U256` base units; these
//! helpers convert to and from the human-decimal representation without
//! going through floats, so 18-decimal precision is never lost.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors that can occur while parsing a decimal amount.
#[derive(Debug, Error)]
pub enum ConversionError {
	/// The input string is not a valid decimal number.
	#[error("Invalid decimal amount: {0}")]
	InvalidAmount(String),
	/// The fractional part has more digits than the token's decimals.
	#[error("Too many decimal places: {0} (max {1})")]
	TooManyDecimals(String, u8),
}

/// Formats a base-unit amount as a human-decimal string.
///
/// Trailing zeros in the fractional part are trimmed; whole amounts come out
/// without a decimal point (e.g., `1500000` at 6 decimals -> "1.5",
/// `2000000` -> "2").
pub fn format_units(amount: U256, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let raw = amount.to_string();
	let places = decimals as usize;

	let (integer_part, decimal_part) = if raw.len() <= places {
		("0".to_string(), format!("{:0>width$}", raw, width = places))
	} else {
		let split = raw.len() - places;
		(raw[..split].to_string(), raw[split..].to_string())
	};

	let trimmed = decimal_part.trim_end_matches('0');
	if trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, trimmed)
	}
}

/// Parses a human-decimal string into a base-unit amount.
///
/// # Errors
///
/// Returns `ConversionError` when the string is not a decimal number or
/// carries more fractional digits than the token supports.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, ConversionError> {
	let amount = amount.trim();
	let (integer_part, decimal_part) = match amount.split_once('.') {
		Some((i, d)) => (i, d),
		None => (amount, ""),
	};

	if integer_part.is_empty() && decimal_part.is_empty() {
		return Err(ConversionError::InvalidAmount(amount.to_string()));
	}
	if decimal_part.len() > decimals as usize {
		return Err(ConversionError::TooManyDecimals(
			amount.to_string(),
			decimals,
		));
	}

	let mut digits = String::with_capacity(integer_part.len() + decimals as usize);
	digits.push_str(if integer_part.is_empty() {
		"0"
	} else {
		integer_part
	});
	digits.push_str(decimal_part);
	for _ in 0..(decimals as usize - decimal_part.len()) {
		digits.push('0');
	}

	digits
		.parse::<U256>()
		.map_err(|_| ConversionError::InvalidAmount(amount.to_string()))
}
