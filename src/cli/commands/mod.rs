use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("ensaluti")
        .about("Login and session service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ENSALUTI_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .default_value("sqlite://ensaluti.db")
                .env("ENSALUTI_DSN")
                .global(true),
        )
        .arg(
            Arg::new("session-lifetime")
                .long("session-lifetime")
                .help("Session lifetime in minutes")
                .default_value("30")
                .env("ENSALUTI_SESSION_LIFETIME")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("rate-limit")
                .long("rate-limit")
                .help("Requests per minute allowed per client across all routes")
                .default_value("10")
                .env("ENSALUTI_RATE_LIMIT")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("login-rate-limit")
                .long("login-rate-limit")
                .help("Login attempts per minute allowed per client")
                .default_value("5")
                .env("ENSALUTI_LOGIN_RATE_LIMIT")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("insecure-cookies")
                .long("insecure-cookies")
                .help("Drop the Secure cookie attribute, for plain-HTTP local testing only")
                .env("ENSALUTI_INSECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ENSALUTI_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("passwd")
                .about("Set a user's password, reading it from stdin")
                .arg(
                    Arg::new("username")
                        .help("Username to provision")
                        .required(true),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "ensaluti");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Login and session service"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_port_and_dsn() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "ensaluti",
            "--port",
            "8080",
            "--dsn",
            "sqlite://ensaluti.db",
        ]);

        assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(8080));
        assert_eq!(
            matches.get_one::<String>("dsn").map(|s| s.to_string()),
            Some("sqlite://ensaluti.db".to_string())
        );
    }

    #[test]
    fn test_defaults() {
        let command = new();
        let matches = command.get_matches_from(vec!["ensaluti"]);

        assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(8080));
        assert_eq!(
            matches.get_one::<String>("dsn").map(|s| s.to_string()),
            Some("sqlite://ensaluti.db".to_string())
        );
        assert_eq!(
            matches.get_one::<u64>("session-lifetime").map(|s| *s),
            Some(30)
        );
        assert_eq!(matches.get_one::<u32>("rate-limit").map(|s| *s), Some(10));
        assert_eq!(
            matches.get_one::<u32>("login-rate-limit").map(|s| *s),
            Some(5)
        );
        assert!(!matches.get_flag("insecure-cookies"));
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("ENSALUTI_PORT", Some("443")),
                ("ENSALUTI_DSN", Some("sqlite:///var/lib/ensaluti/users.db")),
                ("ENSALUTI_SESSION_LIFETIME", Some("10")),
                ("ENSALUTI_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["ensaluti"]);
                assert_eq!(matches.get_one::<u16>("port").map(|s| *s), Some(443));
                assert_eq!(
                    matches.get_one::<String>("dsn").map(|s| s.to_string()),
                    Some("sqlite:///var/lib/ensaluti/users.db".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>("session-lifetime").map(|s| *s),
                    Some(10)
                );
                assert_eq!(matches.get_one::<u8>("verbosity").map(|s| *s), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("ENSALUTI_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["ensaluti"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").map(|s| *s),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("ENSALUTI_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["ensaluti".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();

                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").map(|s| *s),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_passwd_subcommand() {
        let command = new();
        let matches = command.get_matches_from(vec!["ensaluti", "passwd", "alice"]);

        let Some(("passwd", sub)) = matches.subcommand() else {
            panic!("expected the passwd subcommand");
        };
        assert_eq!(
            sub.get_one::<String>("username").map(|s| s.to_string()),
            Some("alice".to_string())
        );
        // --dsn is global, so the subcommand sees it too
        assert_eq!(
            sub.get_one::<String>("dsn").map(|s| s.to_string()),
            Some("sqlite://ensaluti.db".to_string())
        );
    }
}
