use std::time::Duration;

pub const DEFAULT_SESSION_LIFETIME_MINUTES: u64 = 30;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;
pub const DEFAULT_LOGIN_RATE_LIMIT_PER_MINUTE: u32 = 5;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub session_lifetime: Duration,
    pub secure_cookies: bool,
    pub rate_limit_per_minute: u32,
    pub login_rate_limit_per_minute: u32,
}

impl GlobalArgs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_lifetime: Duration::from_secs(DEFAULT_SESSION_LIFETIME_MINUTES * 60),
            secure_cookies: true,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            login_rate_limit_per_minute: DEFAULT_LOGIN_RATE_LIMIT_PER_MINUTE,
        }
    }

    #[must_use]
    pub fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            session_lifetime: Duration::from_secs(
                matches
                    .get_one::<u64>("session-lifetime")
                    .copied()
                    .unwrap_or(DEFAULT_SESSION_LIFETIME_MINUTES)
                    * 60,
            ),
            secure_cookies: !matches.get_flag("insecure-cookies"),
            rate_limit_per_minute: matches
                .get_one::<u32>("rate-limit")
                .copied()
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE),
            login_rate_limit_per_minute: matches
                .get_one::<u32>("login-rate-limit")
                .copied()
                .unwrap_or(DEFAULT_LOGIN_RATE_LIMIT_PER_MINUTE),
        }
    }
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self::new()
    }
}
