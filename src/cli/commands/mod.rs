use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
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

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
        .env("MEMO_AUTH_EMAIL")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env("MEMO_AUTH_PASSWORD")
        .required(true)
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("memo-auth")
        .about("Session and authentication client for the Memo API")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the Memo API, including any path prefix")
                .default_value("https://memo-integration-server.onrender.com/api")
                .env("MEMO_AUTH_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("token-file")
                .long("token-file")
                .help("File the session token pair is persisted to")
                .default_value(".memo-tokens.json")
                .env("MEMO_AUTH_TOKEN_FILE")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("MEMO_AUTH_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Log in and store the session token pair")
                .arg(email_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account and request a verification mail")
                .arg(email_arg())
                .arg(password_arg())
                .arg(
                    Arg::new("confirm-password")
                        .long("confirm-password")
                        .help("Password confirmation, must match --password")
                        .env("MEMO_AUTH_CONFIRM_PASSWORD")
                        .required(true),
                )
                .arg(
                    Arg::new("first-name")
                        .long("first-name")
                        .help("First name")
                        .required(true),
                )
                .arg(
                    Arg::new("last-name")
                        .long("last-name")
                        .help("Last name")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("send-verification")
                .about("Request a new verification mail")
                .arg(email_arg()),
        )
        .subcommand(
            Command::new("verify-email")
                .about("Confirm an email address with a verification token")
                .arg(
                    Arg::new("token")
                        .short('t')
                        .long("token")
                        .help("Verification token from the mail link")
                        .required(true),
                ),
        )
        .subcommand(Command::new("whoami").about("Show the restored session and profile"))
        .subcommand(Command::new("logout").about("Clear the stored session"))
}
