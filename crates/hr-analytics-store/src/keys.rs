//! Key encoding utilities.
//!
//! Timestamps are encoded as the big-endian microsecond epoch with the sign
//! bit flipped, so byte order matches time order across the whole `i64` range.

use chrono::{DateTime, Utc};

/// Encoded length of a timestamp.
pub const TIME_LEN: usize = 8;

/// Separator between the user id and the time in a record key.
const USER_SEPARATOR: u8 = 0x00;

/// Encode a timestamp as 8 order-preserving bytes (microsecond precision).
#[must_use]
pub fn encode_time(timestamp: DateTime<Utc>) -> [u8; TIME_LEN] {
    let mut bytes = timestamp.timestamp_micros().to_be_bytes();
    bytes[0] ^= 0x80;
    bytes
}

/// Decode a timestamp produced by [`encode_time`].
#[must_use]
pub fn decode_time(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let mut raw: [u8; TIME_LEN] = bytes.get(..TIME_LEN)?.try_into().ok()?;
    raw[0] ^= 0x80;
    let micros = i64::from_be_bytes(raw);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
    DateTime::from_timestamp(micros.div_euclid(1_000_000), nanos)
}

/// Create a primary record key.
///
/// Format: `user_id || 0x00 || time (8 bytes)`
#[must_use]
pub fn record_key(user_id: &str, timestamp: DateTime<Utc>) -> Vec<u8> {
    let mut key = user_prefix(user_id);
    key.extend_from_slice(&encode_time(timestamp));
    key
}

/// Prefix shared by every record key of one user.
#[must_use]
pub fn user_prefix(user_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + TIME_LEN);
    key.extend_from_slice(user_id.as_bytes());
    key.push(USER_SEPARATOR);
    key
}

/// A key that sorts after every record key of one user.
#[must_use]
pub fn user_upper_bound(user_id: &str) -> Vec<u8> {
    let mut key = user_id.as_bytes().to_vec();
    key.push(USER_SEPARATOR + 1);
    key
}

/// Create a time index key.
///
/// Format: `time (8 bytes) || user_id`
#[must_use]
pub fn time_index_key(user_id: &str, timestamp: DateTime<Utc>) -> Vec<u8> {
    let mut key = Vec::with_capacity(TIME_LEN + user_id.len());
    key.extend_from_slice(&encode_time(timestamp));
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// Split a time index key back into its timestamp and user id.
#[must_use]
pub fn split_time_index_key(key: &[u8]) -> Option<(DateTime<Utc>, &str)> {
    let timestamp = decode_time(key)?;
    let user_id = std::str::from_utf8(key.get(TIME_LEN..)?).ok()?;
    Some((timestamp, user_id))
}
