//! Command-line and environment configuration.

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use slack_mcp_client::DEFAULT_BASE_URL;

/// Multi-tenant MCP gateway for the Slack Web API.
#[derive(Parser, Debug, Clone)]
#[command(name = "slack-mcp-gateway")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    pub port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Base URL of the Slack Web API
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "SLACK_API_URL")]
    pub slack_api_url: String,

    /// Timeout for each upstream Slack call, in seconds
    #[arg(long, default_value_t = 30, env = "SLACK_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,
}

impl Args {
    /// Socket address to bind.
    ///
    /// # Errors
    /// Returns error if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip = self
            .host
            .parse()
            .with_context(|| format!("Invalid host address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["slack-mcp-gateway"]).unwrap();
        assert_eq!(args.slack_api_url, DEFAULT_BASE_URL);
        assert_eq!(args.upstream_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override() {
        let args = Args::try_parse_from([
            "slack-mcp-gateway",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--upstream-timeout-secs",
            "5",
        ])
        .unwrap();
        assert_eq!(args.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(args.upstream_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_bad_host_is_an_error() {
        let args = Args::try_parse_from(["slack-mcp-gateway", "--host", "localhost"]).unwrap();
        assert!(args.bind_addr().is_err());
    }
}
