//! Ingestion pipeline commands.

use console::style;

use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::repository::migrations;

async fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let pool = settings.create_pool();
    migrations::init_schema(&pool).await?;
    Ok(Pipeline::new(settings.clone(), pool))
}

pub async fn cmd_register(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = build_pipeline(settings).await?;
    let registered = pipeline.register_archives().await?;
    println!(
        "{} Registered {} new archive session(s)",
        style("✓").green(),
        registered
    );
    Ok(())
}

pub async fn cmd_parse(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = build_pipeline(settings).await?;
    let parsed = pipeline.parse_pending().await?;
    println!("{} Parsed {} session(s)", style("✓").green(), parsed);
    Ok(())
}

pub async fn cmd_extract(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = build_pipeline(settings).await?;
    let extracted = pipeline.extract_pending().await?;
    println!("{} Extracted {} session(s)", style("✓").green(), extracted);
    Ok(())
}

pub async fn cmd_thumbnails(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = build_pipeline(settings).await?;
    let generated = pipeline.generate_thumbnails().await?;
    println!(
        "{} Generated {} thumbnail(s)",
        style("✓").green(),
        generated
    );
    Ok(())
}

/// All stages in order: register, parse, extract, thumbnails.
pub async fn cmd_pipeline(settings: &Settings) -> anyhow::Result<()> {
    let pipeline = build_pipeline(settings).await?;

    println!("{} Registering archives...", style("→").cyan());
    let registered = pipeline.register_archives().await?;
    println!("  {} {} new session(s)", style("✓").green(), registered);

    println!("{} Parsing...", style("→").cyan());
    let parsed = pipeline.parse_pending().await?;
    println!("  {} {} session(s)", style("✓").green(), parsed);

    println!("{} Extracting...", style("→").cyan());
    let extracted = pipeline.extract_pending().await?;
    println!("  {} {} session(s)", style("✓").green(), extracted);

    println!("{} Generating thumbnails...", style("→").cyan());
    let thumbnails = pipeline.generate_thumbnails().await?;
    println!("  {} {} thumbnail(s)", style("✓").green(), thumbnails);

    Ok(())
}
