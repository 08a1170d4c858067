//! The `burnwell init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    let path = Path::new("burnwell.toml");
    if path.exists() {
        println!("burnwell.toml already exists, skipping.");
        return Ok(());
    }

    std::fs::write(path, SAMPLE_CONFIG)?;
    println!("Created burnwell.toml");

    println!("\nNext steps:");
    println!("  1. Edit burnwell.toml with your user id and server address");
    println!("  2. Run: burnwell questions");
    println!("  3. Run: burnwell take");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# burnwell configuration

# user_id = "1"
# display_name = "Dr. Lee"
advance_delay_ms = 300
request_timeout_secs = 30

[backend]
type = "http"
base_url = "http://127.0.0.1:8000"
api_token = "${BURNWELL_API_TOKEN}"

# Run without a server:
# [backend]
# type = "offline"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use burnwell_client::{BackendConfig, BurnwellConfig};

    #[test]
    fn sample_config_parses() {
        let config: BurnwellConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.advance_delay_ms, 300);
        assert!(config.user_id.is_none());
        assert!(matches!(config.backend, BackendConfig::Http { .. }));
    }
}
