//! Web server command.

use console::style;

use crate::config::Settings;
use crate::repository::migrations;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    println!("{} Preparing database...", style("→").cyan());
    let pool = settings.create_pool();
    migrations::init_schema(&pool).await?;
    println!("  {} Database ready", style("✓").green());

    if settings.dev_bypass_auth {
        println!(
            "  {} Authentication bypass is ON - local development only",
            style("!").yellow()
        );
    }
    if settings.file_token_secret.is_none() {
        println!(
            "  {} No file token secret configured; file serving is disabled",
            style("!").yellow()
        );
    }

    println!(
        "{} Starting harbor server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3040" -> 127.0.0.1:3040
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3040
/// - Host and port: "0.0.0.0:3040" -> 0.0.0.0:3040
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), 3040))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address_forms() {
        assert_eq!(
            parse_bind_address("3030").unwrap(),
            ("127.0.0.1".to_string(), 3030)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:8080").unwrap(),
            ("0.0.0.0".to_string(), 8080)
        );
        assert_eq!(
            parse_bind_address("localhost").unwrap(),
            ("localhost".to_string(), 3040)
        );
    }
}
