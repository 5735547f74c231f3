use crate::cli::actions::Action;
use anyhow::{Context, Result};

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = |matches: &clap::ArgMatches| -> Result<String> {
        matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .context("missing required argument: --dsn")
    };

    match matches.subcommand() {
        Some(("passwd", sub)) => Ok(Action::Passwd {
            dsn: dsn(sub)?,
            username: sub
                .get_one("username")
                .map(|s: &String| s.to_string())
                .context("missing required argument: username")?,
        }),

        _ => Ok(Action::Server {
            port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
            dsn: dsn(matches)?,
        }),
    }
}
