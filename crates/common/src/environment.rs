//! Exchange environment configuration.
//!
//! Supports the production and testnet venues with their endpoints.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Exchange environment (production or testnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeEnvironment {
    /// Production environment (real money).
    #[default]
    Production,
    /// Testnet environment (test coins only).
    Testnet,
}

impl ExchangeEnvironment {
    /// REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://www.bitmex.com/api/v1",
            Self::Testnet => "https://testnet.bitmex.com/api/v1",
        }
    }

    /// WebSocket URL for the realtime feed.
    pub fn ws_url(&self) -> &'static str {
        match self {
            Self::Production => "wss://www.bitmex.com/realtime",
            Self::Testnet => "wss://testnet.bitmex.com/realtime",
        }
    }

    /// REST URL listing the currently tradable instruments.
    pub fn active_instruments_url(&self) -> String {
        format!("{}/instrument/active", self.rest_base_url())
    }

    /// Returns true if this is the production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns true if this is the testnet environment.
    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Testnet)
    }

    /// Operator notice shown when a session starts against this environment.
    pub fn session_notice(&self) -> Option<&'static str> {
        match self {
            Self::Production => None,
            Self::Testnet => Some(
                "Connected to the BitMEX testnet. Orders are simulated and balances hold test coins only.",
            ),
        }
    }

    /// Load environment from the `BITMEX_ENVIRONMENT` env var.
    ///
    /// Returns `Production` if not set or invalid.
    pub fn from_env() -> Self {
        let Ok(raw) = std::env::var("BITMEX_ENVIRONMENT") else {
            return Self::default();
        };
        raw.parse().unwrap_or_else(|e: ParseEnvironmentError| {
            warn!(error = %e, "falling back to production");
            Self::default()
        })
    }
}

impl fmt::Display for ExchangeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for ExchangeEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" | "mainnet" | "live" => Ok(Self::Production),
            "testnet" | "test" | "demo" => Ok(Self::Testnet),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Error parsing environment string.
#[derive(Debug, Clone)]
pub struct ParseEnvironmentError(String);

impl fmt::Display for ParseEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid environment '{}', expected 'production' or 'testnet'",
            self.0
        )
    }
}

impl std::error::Error for ParseEnvironmentError {}
