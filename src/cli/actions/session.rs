use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::session::{SessionConfig, SessionManager, UserProfile};
use anyhow::Result;

fn print_profile(profile: &UserProfile) {
    println!("{}", profile.full_name);
    if let Some(email) = &profile.email {
        println!("  email:      {email}");
    }
    if let Some(department) = &profile.department {
        println!("  department: {department}");
    }
    if let Some(rank) = &profile.rank {
        println!("  rank:       {rank}");
    }
}

/// Handle the parsed action against a session manager built from the
/// global arguments.
///
/// # Errors
/// Returns an error when the underlying session operation fails.
pub async fn handle(globals: &GlobalArgs, action: Action) -> Result<()> {
    let config = SessionConfig::new(globals.api_url.clone(), globals.token_file.clone());
    let manager = SessionManager::new(config);

    match action {
        Action::Login { email, password } => {
            manager.login(&email, &password).await?;

            match manager.profile() {
                Some(profile) => println!("Logged in as {}", profile.full_name),
                // Credentials were accepted but the profile could not be
                // read, so the session was torn down.
                None => println!("Login succeeded but no session could be established, try again"),
            }
        }
        Action::Register {
            email,
            password,
            confirm_password,
            first_name,
            last_name,
        } => {
            manager
                .register(&email, &password, &confirm_password, &first_name, &last_name)
                .await?;
            println!("Registered {email}, verification mail sent");
        }
        Action::SendVerification { email } => {
            manager.send_verification_mail(&email).await?;
            println!("Verification mail sent to {email}");
        }
        Action::VerifyEmail { token } => {
            let payload = manager.verify_email(&token).await?;
            if payload.is_null() {
                println!("Email verified");
            } else {
                println!("{payload}");
            }
        }
        Action::Whoami => {
            manager.hydrate().await;

            match manager.profile() {
                Some(profile) => print_profile(&profile),
                None => println!("Not logged in"),
            }
        }
        Action::Logout => {
            manager.logout();
            println!("Logged out");
        }
    }

    Ok(())
}
