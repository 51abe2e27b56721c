//! Feed identity and static feed configuration.
//!
//! `FeedId` is the single place where oracle ids are normalized:
//! configured ids and ids coming back from Hermes are both reduced
//! to lowercase hex without a `0x` prefix before any comparison.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a configured feed id is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedIdError {
    #[error("feed id is empty")]
    Empty,
    #[error("feed id contains non-hex character {0:?}")]
    NonHex(char),
}

/// Canonical oracle feed identifier (lowercase hex, no `0x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedId(String);

impl FeedId {
    /// Parse and validate an id from configuration.
    pub fn parse(raw: &str) -> Result<Self, FeedIdError> {
        let canonical = Self::canonicalize(raw);
        if canonical.is_empty() {
            return Err(FeedIdError::Empty);
        }
        if let Some(bad) = canonical.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(FeedIdError::NonHex(bad));
        }
        Ok(Self(canonical))
    }

    /// Normalize an id received from the oracle without validating it.
    ///
    /// Ids that are not valid hex simply never match a configured feed.
    pub fn from_remote(raw: &str) -> Self {
        Self(Self::canonicalize(raw))
    }

    fn canonicalize(raw: &str) -> String {
        let trimmed = raw.trim();
        let unprefixed = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        unprefixed.to_ascii_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display: first 8 and last 6 characters.
    pub fn short(&self) -> String {
        if self.0.len() <= 14 {
            return self.0.clone();
        }
        format!("{}...{}", &self.0[..8], &self.0[self.0.len() - 6..])
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FeedId {
    type Error = FeedIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeedId> for String {
    fn from(id: FeedId) -> Self {
        id.0
    }
}

/// Asset class of a tracked feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Crypto,
    Equity,
    Fx,
    Commodity,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crypto => write!(f, "crypto"),
            Self::Equity => write!(f, "equity"),
            Self::Fx => write!(f, "fx"),
            Self::Commodity => write!(f, "commodity"),
        }
    }
}

/// Static description of one tracked asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Display symbol, e.g. "SOL/USD".
    pub symbol: String,
    /// Oracle feed id (accepts a `0x` prefix in config).
    pub feed_id: FeedId,
    /// Human-readable description.
    pub description: String,
    /// Asset class.
    pub asset_type: AssetType,
    /// Base asset code.
    pub base_asset: String,
    /// Quote asset code.
    pub quote_asset: String,
    /// Push-oracle account kept for reference.
    #[serde(default)]
    pub legacy_address: Option<String>,
}

impl FeedConfig {
    fn demo(
        symbol: &str,
        feed_id: &str,
        description: &str,
        base_asset: &str,
        legacy_address: &str,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            feed_id: FeedId::from_remote(feed_id),
            description: description.to_string(),
            asset_type: AssetType::Crypto,
            base_asset: base_asset.to_string(),
            quote_asset: "USD".to_string(),
            legacy_address: Some(legacy_address.to_string()),
        }
    }
}

/// SOL, BTC and ETH against USD on Pyth mainnet.
pub fn demo_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::demo(
            "SOL/USD",
            "0xef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d",
            "Solana / US Dollar",
            "SOL",
            "J83w4HKfqxwcq3BEMMkPFSppX3gqekLyLJBexebFVkix",
        ),
        FeedConfig::demo(
            "BTC/USD",
            "0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43",
            "Bitcoin / US Dollar",
            "BTC",
            "HovQMDrbAgAYPCmHVSrezcSmkMtXSSUsLDFANExrZh2J",
        ),
        FeedConfig::demo(
            "ETH/USD",
            "0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
            "Ethereum / US Dollar",
            "ETH",
            "EdVCmQ9FSPcVe5YySXDPCRmc8aDQLKJ9xvYBMZPie1Vw",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_case_normalized() {
        let a = FeedId::parse("0xEF0D8B6F").unwrap();
        let b = FeedId::from_remote("ef0d8b6f");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ef0d8b6f");
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert_eq!(FeedId::parse("0x"), Err(FeedIdError::Empty));
        assert_eq!(FeedId::parse("  "), Err(FeedIdError::Empty));
        assert_eq!(FeedId::parse("0xzz"), Err(FeedIdError::NonHex('z')));
    }

    #[test]
    fn test_short_id() {
        let id = FeedId::parse(
            "0xef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d",
        )
        .unwrap();
        assert_eq!(id.short(), "ef0d8b6f...80b56d");
    }

    #[test]
    fn test_feed_config_deserializes_prefixed_id() {
        let toml_src = r#"
            symbol = "SOL/USD"
            feed_id = "0xEF0D"
            description = "Solana"
            asset_type = "crypto"
            base_asset = "SOL"
            quote_asset = "USD"
        "#;
        let feed: FeedConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(feed.feed_id.as_str(), "ef0d");
        assert_eq!(feed.asset_type, AssetType::Crypto);
        assert!(feed.legacy_address.is_none());
    }

    #[test]
    fn test_demo_feeds_are_canonical_and_unique() {
        let feeds = demo_feeds();
        assert_eq!(feeds.len(), 3);
        for feed in &feeds {
            assert!(FeedId::parse(feed.feed_id.as_str()).is_ok());
            assert!(!feed.feed_id.as_str().starts_with("0x"));
        }
        let mut ids: Vec<_> = feeds.iter().map(|f| f.feed_id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
