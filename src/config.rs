//! Process configuration read from the environment at startup

use crate::advisor::AdvisorConfig;
use crate::gateway::PollPolicy;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Everything `main` needs to assemble the service
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openai_api_key: Option<String>,
    /// Alternate Assistants API base URL (proxies, tests)
    pub openai_base_url: Option<String>,
    pub poll: PollPolicy,
    /// Sessions idle for longer than this are torn down
    pub session_ttl: Duration,
    pub advisors: AdvisorConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
        };

        let mut poll = PollPolicy::default();
        if let Some(max_wait) = secs("SOLAR_ADVISOR_POLL_MAX_WAIT_SECS") {
            poll = poll.with_max_wait(max_wait);
        }

        Self {
            port: lookup("SOLAR_ADVISOR_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            openai_base_url: lookup("OPENAI_BASE_URL").filter(|u| !u.is_empty()),
            poll,
            session_ttl: secs("SOLAR_ADVISOR_SESSION_TTL_SECS").unwrap_or(DEFAULT_SESSION_TTL),
            advisors: AdvisorConfig::from_lookup(&lookup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8000);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert!(config.advisors.assistant_ids.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SOLAR_ADVISOR_PORT", "9001"),
            ("OPENAI_API_KEY", "sk-test"),
            ("SOLAR_ADVISOR_POLL_MAX_WAIT_SECS", "30"),
            ("SOLAR_ADVISOR_SESSION_TTL_SECS", "600"),
            ("NY_ADVISOR", "asst_ny"),
        ]);
        assert_eq!(config.port, 9001);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.poll.max_wait, Duration::from_secs(30));
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert_eq!(config.advisors.assistant_ids.get("ny").map(String::as_str), Some("asst_ny"));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("SOLAR_ADVISOR_PORT", "not-a-port"),
            ("SOLAR_ADVISOR_POLL_MAX_WAIT_SECS", "0"),
        ]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.poll.max_wait, PollPolicy::default().max_wait);
    }
}
