//! User and token admin CLI commands.
//!
//! Accounts are provisioned here, outside the chat core: the server only ever
//! reads them through the user directory.

use anyhow::Result;
use comfy_table::{presets, ContentArrangement, Table};
use console::style;

use crate::http::extractors::auth::{generate_token, hash_token};
use crate::state::AppState;

/// Create a user account.
///
/// ```bash
/// parley user create ada ada@example.com
/// ```
pub async fn create_user(state: &AppState, username: &str, email: &str, json: bool) -> Result<()> {
    let user = state
        .user_directory
        .create_user(username, email)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!("  {} User created!", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Id:").bold(), style(&user.id).cyan());
    println!("  {}  {}", style("Username:").bold(), user.username);
    println!("  {}  {}", style("Email:").bold(), user.email);
    println!();

    Ok(())
}

/// List all user accounts.
pub async fn list_users(state: &AppState, json: bool) -> Result<()> {
    let users = state
        .user_directory
        .list_users()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!();
        println!("  No users yet. Create one with `parley user create <username> <email>`.");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Username", "Email", "Created"]);

    for user in &users {
        table.add_row(vec![
            user.id.to_string(),
            user.username.clone(),
            user.email.clone(),
            user.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    println!("{table}");

    Ok(())
}

/// Issue a bearer token for a user.
///
/// The plaintext token is printed exactly once; only its SHA-256 hash is
/// stored.
pub async fn issue_token(state: &AppState, username: &str, json: bool) -> Result<()> {
    let user = state
        .user_directory
        .get_user_by_username(username)
        .await
        .map_err(|e| anyhow::anyhow!(e))?
        .ok_or_else(|| anyhow::anyhow!("no user named '{username}'"))?;

    let token = generate_token();
    state
        .user_directory
        .store_token_hash(&user.id, &hash_token(&token))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user_id": user.id,
                "token": token,
            }))?
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} Token issued for {} (save this -- it won't be shown again):",
        style("🔑").bold(),
        style(&user.username).cyan()
    );
    println!();
    println!("  {}", style(&token).yellow().bold());
    println!();

    Ok(())
}
