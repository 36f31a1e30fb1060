use std::sync::LazyLock;

use serde_json::json;
use tweakcake::{Config, ConfigError, ConfigOption, Schema, Template};

struct Client;

impl Template for Client {
    fn schema() -> &'static Schema {
        static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
            Schema::new()
                .with_option(
                    ConfigOption::new("timeout", 30)
                        .with_description("Request timeout in seconds")
                        .with_validator(|v| v.as_i64().is_some_and(|n| n > 0)),
                )
                .with_option(
                    ConfigOption::new("retry", json!({"retries": 3, "backoff": 2}))
                        .with_description("Retry policy"),
                )
        });
        &SCHEMA
    }
}

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = std::env::temp_dir().join("tweakcake-demo");
    let config = Config::builder("client")
        .with_custom_path(&dir)
        .with_template::<Client>()
        .load();

    println!("Loading from {:?}", config.config_files());
    println!("timeout = {}", config.get("timeout")?);

    config.set("retry", json!({"retries": 5}))?;
    if let Err(e) = config.set("timeout", -1) {
        println!("Rejected: {e}");
    }

    let retry = config.section("retry")?;
    println!("retry = {retry} (backoff kept)");

    config.close()?;
    println!("Saved to {}", dir.join("client.json").display());
    Ok(())
}
