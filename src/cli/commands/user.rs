//! User management commands.

use clap::Subcommand;
use console::style;

use crate::config::Settings;
use crate::repository::{migrations, UserRepository};
use crate::server::auth::hash_password;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Grant administrative rights
        #[arg(long)]
        admin: bool,
    },
    /// List users
    List,
}

pub async fn cmd_user(settings: &Settings, command: UserCommands) -> anyhow::Result<()> {
    let pool = settings.create_pool();
    migrations::init_schema(&pool).await?;
    let users = UserRepository::new(pool);

    match command {
        UserCommands::Add {
            email,
            password,
            admin,
        } => {
            if users.user_by_email(&email).await?.is_some() {
                anyhow::bail!("user {} already exists", email);
            }
            let hash = hash_password(&password)?;
            let id = users.insert_user(&email, &hash, admin).await?;
            println!("{} Created user {} (id {})", style("✓").green(), email, id);
        }
        UserCommands::List => {
            for user in users.list_users().await? {
                println!(
                    "{:>5}  {}  {}{}",
                    user.id,
                    user.email,
                    if user.admin { "admin" } else { "user" },
                    if user.locked { "  [locked]" } else { "" },
                );
            }
        }
    }
    Ok(())
}
