use crate::auth::{hasher::PasswordHasher, store::SqliteRecordStore};
use crate::cli::actions::Action;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, BufRead, Write};

/// Handle the passwd action: hash a password read from stdin and upsert the
/// credential record. This is the only path that writes to the credential
/// table.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Passwd { dsn, username } = action else {
        return Err(anyhow!("unexpected action"));
    };

    if !valid_username(&username) {
        bail!("invalid username: expected alphanumeric start and [A-Za-z0-9_.-], max 64 chars");
    }

    let password = read_password()?;

    let hasher = PasswordHasher::new();
    let password_hash = hasher.hash(password.expose_secret())?;

    let store = SqliteRecordStore::connect(&dsn).await?;
    store
        .upsert_credential(&username, &password_hash)
        .await
        .context("failed to store credential record")?;

    println!("Password set for user '{username}'");

    Ok(())
}

fn read_password() -> Result<SecretString> {
    eprint!("Password: ");
    io::stderr().flush().context("failed to flush stderr")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;

    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        bail!("password must not be empty");
    }

    Ok(SecretString::from(trimmed.to_string()))
}

fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").is_ok_and(|regex| regex.is_match(username))
}
