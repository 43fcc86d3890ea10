use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing or no subcommand was
/// provided.
pub fn handler(matches: &clap::ArgMatches) -> Result<(GlobalArgs, Action)> {
    let api_url = matches
        .get_one::<String>("api-url")
        .cloned()
        .context("missing required argument: --api-url")?;

    let token_file = matches
        .get_one::<String>("token-file")
        .map(PathBuf::from)
        .context("missing required argument: --token-file")?;

    let globals = GlobalArgs::new(api_url, token_file);

    let email = |sub: &clap::ArgMatches| -> Result<String> {
        sub.get_one::<String>("email")
            .cloned()
            .context("missing required argument: --email")
    };

    let password = |sub: &clap::ArgMatches, name: &str| -> Result<SecretString> {
        sub.get_one::<String>(name)
            .map(|p| SecretString::from(p.to_string()))
            .with_context(|| format!("missing required argument: --{name}"))
    };

    let action = match matches.subcommand() {
        Some(("login", sub)) => Action::Login {
            email: email(sub)?,
            password: password(sub, "password")?,
        },
        Some(("register", sub)) => Action::Register {
            email: email(sub)?,
            password: password(sub, "password")?,
            confirm_password: password(sub, "confirm-password")?,
            first_name: sub
                .get_one::<String>("first-name")
                .cloned()
                .context("missing required argument: --first-name")?,
            last_name: sub
                .get_one::<String>("last-name")
                .cloned()
                .context("missing required argument: --last-name")?,
        },
        Some(("send-verification", sub)) => Action::SendVerification { email: email(sub)? },
        Some(("verify-email", sub)) => Action::VerifyEmail {
            token: sub
                .get_one::<String>("token")
                .cloned()
                .context("missing required argument: --token")?,
        },
        Some(("whoami", _)) => Action::Whoami,
        Some(("logout", _)) => Action::Logout,
        _ => return Err(anyhow!("no subcommand provided")),
    };

    Ok((globals, action))
}
