//! Configuration for the order service.

use serde::{Deserialize, Serialize};

use crate::{AssetName, OmsError, Result, constants};

/// Tunables for order transitions and listings.
///
/// Every field has a default, so a partial JSON document (or `{}`) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderServiceConfig {
    /// How many times a transition is re-run after losing an optimistic
    /// race. `0` surfaces the first conflict immediately.
    pub optimistic_lock_max_retries: u32,
    /// The asset every order is priced in.
    pub cash_asset: String,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: usize,
    /// Largest page a listing may return.
    pub max_page_size: usize,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            optimistic_lock_max_retries: constants::DEFAULT_OPTIMISTIC_LOCK_MAX_RETRIES,
            cash_asset: constants::DEFAULT_CASH_ASSET.to_string(),
            default_page_size: constants::DEFAULT_PAGE_SIZE,
            max_page_size: constants::MAX_PAGE_SIZE,
        }
    }
}

impl OrderServiceConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(raw).map_err(|e| OmsError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Same config with a different retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.optimistic_lock_max_retries = max_retries;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.cash_asset_name()?;
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(OmsError::Configuration(
                "page sizes must be greater than zero".into(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(OmsError::Configuration(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }

    /// The configured cash asset as a validated name.
    pub fn cash_asset_name(&self) -> Result<AssetName> {
        AssetName::parse(self.cash_asset.as_str())
            .map_err(|e| OmsError::Configuration(format!("cash_asset: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = OrderServiceConfig::default();
        assert_eq!(cfg.optimistic_lock_max_retries, 3);
        assert_eq!(cfg.cash_asset, "TRY");
        assert_eq!(cfg.default_page_size, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = OrderServiceConfig::from_json(r#"{"optimistic_lock_max_retries": 0}"#).unwrap();
        assert_eq!(cfg.optimistic_lock_max_retries, 0);
        assert_eq!(cfg.cash_asset, "TRY");
        assert_eq!(cfg.max_page_size, 100);
    }

    #[test]
    fn invalid_cash_asset_rejected() {
        let err = OrderServiceConfig::from_json(r#"{"cash_asset": "usd"}"#).unwrap_err();
        assert!(matches!(err, OmsError::Configuration(_)), "{err:?}");
    }

    #[test]
    fn inverted_page_sizes_rejected() {
        let err =
            OrderServiceConfig::from_json(r#"{"default_page_size": 50, "max_page_size": 10}"#)
                .unwrap_err();
        assert!(matches!(err, OmsError::Configuration(_)));
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = OrderServiceConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, OmsError::Configuration(_)));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = OrderServiceConfig::default().with_max_retries(7);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: OrderServiceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
