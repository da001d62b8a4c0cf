//! User administration commands
//!
//! These talk to the credential store directly and bypass the web session
//! gate; they are meant for whoever operates the host.

use crate::config::Config;
use crate::services::CredentialError;
use crate::state::SharedState;

fn describe(err: &CredentialError) -> String {
    match err {
        CredentialError::IdNotFound(id) => {
            format!("No user with ID {id}. Use 'usergate user list' to see IDs")
        }
        other => other.to_string(),
    }
}

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let users = state.credentials.list_users().await?;

    if users.is_empty() {
        println!("No users yet.");
        println!();
        println!("Create the first one with: usergate user create <name> --password <pw>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<40}", "");

    for user in users {
        println!("{:>6}  {}", user.id, user.name);
    }

    Ok(())
}

pub async fn cmd_user_create(config: &Config, name: &str, password: &str) -> anyhow::Result<()> {
    if name.is_empty() || password.is_empty() {
        anyhow::bail!("Name and password must not be empty");
    }
    check_password_length(config, password)?;

    let state = SharedState::new(config.clone()).await?;

    match state.credentials.user_create(name, password).await {
        Ok(id) => {
            println!("✓ Created user '{name}' (ID: {id})");
            Ok(())
        }
        Err(e) => anyhow::bail!("Can't create user: {}", describe(&e)),
    }
}

pub async fn cmd_user_passwd(config: &Config, id: i32, password: &str) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    check_password_length(config, password)?;

    let state = SharedState::new(config.clone()).await?;

    state
        .credentials
        .change_credentials(id, "", password)
        .await
        .map_err(|e| anyhow::anyhow!("Can't change password: {}", describe(&e)))?;

    println!("✓ Password updated for user {id}");
    Ok(())
}

pub async fn cmd_user_rename(config: &Config, id: i32, name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        anyhow::bail!("Name must not be empty");
    }

    let state = SharedState::new(config.clone()).await?;

    state
        .credentials
        .change_credentials(id, name, "")
        .await
        .map_err(|e| anyhow::anyhow!("Can't rename user: {}", describe(&e)))?;

    println!("✓ User {id} is now '{name}'");
    Ok(())
}

pub async fn cmd_user_delete(config: &Config, id: i32) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    state
        .credentials
        .delete_user(id)
        .await
        .map_err(|e| anyhow::anyhow!("Can't delete user: {}", describe(&e)))?;

    println!("✓ Deleted user {id}");
    Ok(())
}

fn check_password_length(config: &Config, password: &str) -> anyhow::Result<()> {
    let min = config.security.min_password_length;
    if password.chars().count() < min {
        anyhow::bail!("Password must be at least {min} characters");
    }
    Ok(())
}
