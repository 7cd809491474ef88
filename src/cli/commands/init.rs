//! Schema initialization command.

use console::style;

use crate::config::Settings;
use crate::repository::migrations;

pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let pool = settings.create_pool();
    migrations::init_schema(&pool).await?;
    println!(
        "{} Database ready at {}",
        style("✓").green(),
        pool.database_url()
    );
    Ok(())
}
