//! Timestamp helpers.

/// Helper function to get the current UNIX timestamp in milliseconds,
/// returning 0 if the system time is somehow before the UNIX epoch.
pub fn current_timestamp_millis() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}
