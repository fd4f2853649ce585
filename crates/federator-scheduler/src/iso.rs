//! ISO-8601 duration parsing for interval-scheduled jobs (e.g. `PT5M` every five
//! minutes). Cron-scheduled jobs use a plain cron expression instead and never go
//! through this module.

use std::time::Duration;

use federator_common::FederatorError;

pub fn parse_interval(expression: &str) -> Result<Duration, FederatorError> {
    let parsed = iso8601_duration::Duration::parse(expression).map_err(|e| {
        FederatorError::Configuration(format!(
            "invalid ISO-8601 interval '{expression}': {e:?}"
        ))
    })?;

    parsed.to_std().ok_or_else(|| {
        FederatorError::Configuration(format!(
            "ISO-8601 interval '{expression}' has no fixed duration (contains years/months)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes() {
        let duration = parse_interval("PT5M").unwrap();
        assert_eq!(duration, Duration::from_secs(300));
    }

    #[test]
    fn parses_hours_and_minutes() {
        let duration = parse_interval("PT1H30M").unwrap();
        assert_eq!(duration, Duration::from_secs(5400));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_interval("not-a-duration").is_err());
    }
}
