use anyhow::Context;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;
        let max_connections =
            parse_max_connections(std::env::var("SDR_METRICS_MAX_CONNECTIONS").ok().as_deref())?;

        Ok(Config {
            database_url,
            max_connections,
        })
    }
}

pub fn parse_max_connections(value: Option<&str>) -> anyhow::Result<u32> {
    let Some(value) = value else {
        return Ok(DEFAULT_MAX_CONNECTIONS);
    };

    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => anyhow::bail!(
            "SDR_METRICS_MAX_CONNECTIONS must be a positive integer, got '{value}'"
        ),
        Ok(count) => Ok(count),
    }
}

/// Logs go to stderr so scoreboard and JSON output on stdout stay clean.
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,sdr_metrics={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_defaults_when_unset() {
        assert_eq!(parse_max_connections(None).unwrap(), DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn max_connections_parses_positive_values() {
        assert_eq!(parse_max_connections(Some(" 12 ")).unwrap(), 12);
    }

    #[test]
    fn max_connections_rejects_zero_and_garbage() {
        assert!(parse_max_connections(Some("0")).is_err());
        let err = parse_max_connections(Some("lots")).unwrap_err();
        assert!(err.to_string().contains("got 'lots'"));
    }
}
