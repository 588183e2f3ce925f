//! Client deadline extraction from gRPC request metadata.
//!
//! gRPC clients send their remaining budget in the `grpc-timeout` header as
//! up to eight ASCII digits followed by a unit (`H`, `M`, `S`, `m`, `u`, `n`).

use std::time::Duration;

use tonic::metadata::MetadataMap;

/// gRPC metadata key carrying the client's timeout.
pub const GRPC_TIMEOUT_KEY: &str = "grpc-timeout";

const MAX_TIMEOUT_DIGITS: usize = 8;

/// Parse a `grpc-timeout` header value into a duration.
///
/// Returns `None` for malformed values; a malformed timeout is treated as
/// "no deadline" rather than rejecting the call.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > MAX_TIMEOUT_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount.checked_mul(60 * 60)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}

/// Read the client timeout from request metadata, if one was sent.
pub fn timeout_from_metadata(metadata: &MetadataMap) -> Option<Duration> {
    let raw = metadata.get(GRPC_TIMEOUT_KEY)?.to_str().ok()?;
    let timeout = parse_grpc_timeout(raw);
    if timeout.is_none() {
        tracing::debug!(grpc_timeout = %raw, "Ignoring malformed grpc-timeout header");
    }
    timeout
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_grpc_timeout("2H"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_grpc_timeout("3M"), Some(Duration::from_secs(180)));
        assert_eq!(parse_grpc_timeout("10S"), Some(Duration::from_secs(10)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("90u"), Some(Duration::from_micros(90)));
        assert_eq!(parse_grpc_timeout("5n"), Some(Duration::from_nanos(5)));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("10s"), None);
        assert_eq!(parse_grpc_timeout("-1S"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
    }

    #[test]
    fn reads_header_from_metadata() {
        let mut metadata = MetadataMap::new();
        assert_eq!(timeout_from_metadata(&metadata), None);

        metadata.insert(GRPC_TIMEOUT_KEY, "1500m".parse().unwrap());
        assert_eq!(
            timeout_from_metadata(&metadata),
            Some(Duration::from_millis(1500))
        );
    }
}
