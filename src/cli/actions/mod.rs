pub mod session;

use secrecy::SecretString;

/// Parsed CLI action.
#[derive(Debug)]
pub enum Action {
    Login {
        email: String,
        password: SecretString,
    },
    Register {
        email: String,
        password: SecretString,
        confirm_password: SecretString,
        first_name: String,
        last_name: String,
    },
    SendVerification {
        email: String,
    },
    VerifyEmail {
        token: String,
    },
    Whoami,
    Logout,
}
