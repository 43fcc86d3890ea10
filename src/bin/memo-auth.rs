use anyhow::Result;
use memo_auth::cli::{actions, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (globals, action) = start()?;

    // Handle the action
    actions::session::handle(&globals, action).await?;

    Ok(())
}
