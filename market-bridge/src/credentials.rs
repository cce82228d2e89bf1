//! Vendor credentials.
//!
//! Credentials are owned by the caller and handed to an adapter when it is
//! built. Adapters never persist them and never modify them. Token
//! acquisition (OAuth, Login with Amazon) happens outside this crate: every
//! record here expects a ready-to-use access token.
//!
//! Secret values are wrapped in [`Secret`], which redacts itself in `Debug`
//! output and zeroes its memory on drop. In configuration files a secret is
//! either a literal string or a reference to an environment variable:
//!
//! ```toml
//! access_token = "shpat_literal"
//! # or
//! access_token = { env = "SHOPIFY_ACCESS_TOKEN" }
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, de::Error as _};
use url::Url;
use zeroize::Zeroize;

use crate::{
    error::{AdapterError, Result},
    transport::http::is_loopback,
};

/// A secret string: an access token, API key or consumer secret.
///
/// # Security
///
/// - `Debug` never prints the value
/// - The value is zeroized on drop
///
/// # Examples
///
/// ```
/// use market_bridge::credentials::Secret;
///
/// let token = Secret::new("shpat_abc123");
/// assert_eq!(token.expose(), "shpat_abc123");
/// assert!(!format!("{token:?}").contains("abc123"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reads a secret from environment variable `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if the name is malformed or the
    /// variable is unset or not valid Unicode.
    pub fn from_env(name: &str) -> Result<Self> {
        validate_env_var_name(name)?;
        std::env::var(name).map(Self).map_err(|e| {
            AdapterError::InvalidConfig(format!("cannot read secret from ${name}: {e}"))
        })
    }

    /// Returns the secret value.
    ///
    /// Only call this where the value is put on the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the secret is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Source {
            Literal(String),
            Env { env: String },
        }

        match Source::deserialize(deserializer)? {
            Source::Literal(value) => Ok(Self(value)),
            Source::Env { env } => Self::from_env(&env).map_err(D::Error::custom),
        }
    }
}

fn validate_env_var_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(AdapterError::InvalidConfig(
            "environment variable name cannot be empty".to_owned(),
        ));
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(AdapterError::InvalidConfig(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }
    if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(AdapterError::InvalidConfig(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }
    Ok(())
}

/// Parses `raw` as an absolute HTTPS URL that is not a loopback address.
pub(crate) fn validate_https_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AdapterError::InvalidConfig(format!("invalid {field} '{raw}': {e}")))?;

    if url.scheme() != "https" {
        return Err(AdapterError::InvalidConfig(format!(
            "{field} must use HTTPS, got: {}",
            url.scheme()
        )));
    }

    if url.host().is_none() {
        return Err(AdapterError::InvalidConfig(format!("{field} has no host: {raw}")));
    }
    if is_loopback(&url) {
        return Err(AdapterError::InvalidConfig(format!(
            "{field} must not be localhost or loopback: {}",
            url.host_str().unwrap_or_default()
        )));
    }
    Ok(url)
}

fn require_secret(field: &str, secret: &Secret) -> Result<()> {
    if secret.is_blank() {
        return Err(AdapterError::InvalidConfig(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn default_shopify_api_version() -> String {
    "2024-01".to_owned()
}

/// Shopify Admin API credentials.
///
/// Accepts the `shopify_store_name` / `shopify_access_token` field names as
/// aliases, so settings records using those keys deserialize directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShopifyCredentials {
    /// Store name (`demo`) or full shop domain (`demo.myshopify.com`).
    #[serde(alias = "shopify_store_name")]
    pub store_name: String,

    /// Admin API access token, sent as `X-Shopify-Access-Token`.
    #[serde(alias = "shopify_access_token")]
    pub access_token: Secret,

    /// Admin API version (default: "2024-01").
    #[serde(default = "default_shopify_api_version")]
    pub api_version: String,

    /// Inventory location used by stock updates.
    #[serde(default)]
    pub location_id: Option<u64>,
}

impl ShopifyCredentials {
    /// Creates credentials for `store_name` with the default API version.
    #[must_use]
    pub fn new(store_name: impl Into<String>, access_token: Secret) -> Self {
        Self {
            store_name: store_name.into(),
            access_token,
            api_version: default_shopify_api_version(),
            location_id: None,
        }
    }

    /// Sets the inventory location used by stock updates.
    #[must_use]
    pub fn with_location_id(mut self, location_id: u64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Returns the shop domain, e.g. `demo.myshopify.com`.
    #[must_use]
    pub fn shop_domain(&self) -> String {
        let store = self.store_name.trim().to_ascii_lowercase();
        if store.ends_with(".myshopify.com") { store } else { format!("{store}.myshopify.com") }
    }

    /// Validates the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if the store name is empty or
    /// not a hostname label, the token is empty, or the API version is not
    /// of the form `YYYY-MM`.
    pub fn validate(&self) -> Result<()> {
        let store = self.store_name.trim();
        if store.is_empty() {
            return Err(AdapterError::InvalidConfig("shopify store_name cannot be empty".to_owned()));
        }
        if !store.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
            return Err(AdapterError::InvalidConfig(format!(
                "shopify store_name contains invalid characters: {store}"
            )));
        }
        require_secret("shopify access_token", &self.access_token)?;

        let version = self.api_version.as_bytes();
        let well_formed = version.len() == 7
            && version[4] == b'-'
            && version.iter().enumerate().all(|(i, b)| i == 4 || b.is_ascii_digit());
        if !well_formed {
            return Err(AdapterError::InvalidConfig(format!(
                "shopify api_version must look like 2024-01, got: {}",
                self.api_version
            )));
        }
        Ok(())
    }
}

fn default_amazon_endpoint() -> String {
    "https://sellingpartnerapi-na.amazon.com".to_owned()
}

fn default_marketplace_ids() -> Vec<String> {
    vec!["ATVPDKIKX0DER".to_owned()]
}

/// Amazon Selling Partner API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AmazonCredentials {
    /// Selling partner (merchant) id.
    pub seller_id: String,

    /// Login with Amazon access token, sent as `x-amz-access-token`.
    pub access_token: Secret,

    /// Regional SP-API endpoint (default: North America).
    #[serde(default = "default_amazon_endpoint")]
    pub endpoint: String,

    /// Marketplaces to query (default: `ATVPDKIKX0DER`, amazon.com).
    #[serde(default = "default_marketplace_ids")]
    pub marketplace_ids: Vec<String>,
}

impl AmazonCredentials {
    /// Creates credentials for the North America endpoint and the US marketplace.
    #[must_use]
    pub fn new(seller_id: impl Into<String>, access_token: Secret) -> Self {
        Self {
            seller_id: seller_id.into(),
            access_token,
            endpoint: default_amazon_endpoint(),
            marketplace_ids: default_marketplace_ids(),
        }
    }

    /// Validates the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if a field is empty or the
    /// endpoint is not an HTTPS URL.
    pub fn validate(&self) -> Result<()> {
        if self.seller_id.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("amazon seller_id cannot be empty".to_owned()));
        }
        require_secret("amazon access_token", &self.access_token)?;
        if self.marketplace_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(AdapterError::InvalidConfig(
                "amazon marketplace_ids must name at least one marketplace".to_owned(),
            ));
        }
        validate_https_url("amazon endpoint", &self.endpoint)?;
        Ok(())
    }
}

fn default_ebay_api_base() -> String {
    "https://api.ebay.com".to_owned()
}

fn default_content_language() -> String {
    "en-US".to_owned()
}

/// eBay Sell API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EbayCredentials {
    /// OAuth user access token, sent as `Authorization: Bearer`.
    pub access_token: Secret,

    /// API base URL (default: production, `https://api.ebay.com`).
    #[serde(default = "default_ebay_api_base")]
    pub api_base: String,

    /// Inventory location for in-store pickup availability.
    #[serde(default)]
    pub merchant_location_key: Option<String>,

    /// Hours until a pickup order is ready, advertised to buyers as the
    /// location's `fulfillmentTime`. Omitted from stock updates when unset.
    #[serde(default)]
    pub pickup_fulfillment_hours: Option<u32>,

    /// `Content-Language` sent with inventory writes (default: "en-US").
    #[serde(default = "default_content_language")]
    pub content_language: String,
}

impl EbayCredentials {
    /// Creates production credentials without a pickup location.
    #[must_use]
    pub fn new(access_token: Secret) -> Self {
        Self {
            access_token,
            api_base: default_ebay_api_base(),
            merchant_location_key: None,
            pickup_fulfillment_hours: None,
            content_language: default_content_language(),
        }
    }

    /// Sets the merchant location used for pickup availability.
    #[must_use]
    pub fn with_merchant_location_key(mut self, key: impl Into<String>) -> Self {
        self.merchant_location_key = Some(key.into());
        self
    }

    /// Sets the pickup fulfillment time, in hours.
    #[must_use]
    pub fn with_pickup_fulfillment_hours(mut self, hours: u32) -> Self {
        self.pickup_fulfillment_hours = Some(hours);
        self
    }

    /// Validates the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if the token is empty or the API
    /// base is not an HTTPS URL.
    pub fn validate(&self) -> Result<()> {
        require_secret("ebay access_token", &self.access_token)?;
        validate_https_url("ebay api_base", &self.api_base)?;
        if self.merchant_location_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(AdapterError::InvalidConfig(
                "ebay merchant_location_key cannot be empty".to_owned(),
            ));
        }
        if self.pickup_fulfillment_hours.is_some() && self.merchant_location_key.is_none() {
            return Err(AdapterError::InvalidConfig(
                "ebay pickup_fulfillment_hours requires merchant_location_key".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_woocommerce_api_version() -> String {
    "wc/v3".to_owned()
}

/// WooCommerce REST API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WooCommerceCredentials {
    /// Store root URL, e.g. `https://yourstore.com`.
    pub store_url: String,

    /// REST API consumer key (`ck_...`).
    pub consumer_key: Secret,

    /// REST API consumer secret (`cs_...`).
    pub consumer_secret: Secret,

    /// REST API namespace (default: "wc/v3").
    #[serde(default = "default_woocommerce_api_version")]
    pub api_version: String,
}

impl WooCommerceCredentials {
    /// Creates credentials for the `wc/v3` API.
    #[must_use]
    pub fn new(store_url: impl Into<String>, consumer_key: Secret, consumer_secret: Secret) -> Self {
        Self {
            store_url: store_url.into(),
            consumer_key,
            consumer_secret,
            api_version: default_woocommerce_api_version(),
        }
    }

    /// Validates the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] if the store URL is not an HTTPS
    /// URL, a key is empty, or the API version is empty.
    pub fn validate(&self) -> Result<()> {
        validate_https_url("woocommerce store_url", &self.store_url)?;
        require_secret("woocommerce consumer_key", &self.consumer_key)?;
        require_secret("woocommerce consumer_secret", &self.consumer_secret)?;
        if self.api_version.trim_matches('/').is_empty() {
            return Err(AdapterError::InvalidConfig(
                "woocommerce api_version cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Credentials for any supported vendor, tagged by `vendor`.
///
/// # Examples
///
/// ```
/// use market_bridge::{Vendor, credentials::VendorCredentials};
///
/// let credentials: VendorCredentials = toml::from_str(r#"
///     vendor = "ebay"
///     access_token = "v^1.1#i^1"
/// "#).unwrap();
///
/// assert_eq!(credentials.vendor(), Vendor::Ebay);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum VendorCredentials {
    /// Shopify store.
    Shopify(ShopifyCredentials),
    /// Amazon seller account.
    Amazon(AmazonCredentials),
    /// eBay seller account.
    Ebay(EbayCredentials),
    /// WooCommerce store.
    WooCommerce(WooCommerceCredentials),
}

impl VendorCredentials {
    /// Returns the vendor these credentials belong to.
    #[must_use]
    pub fn vendor(&self) -> crate::Vendor {
        match self {
            Self::Shopify(_) => crate::Vendor::Shopify,
            Self::Amazon(_) => crate::Vendor::Amazon,
            Self::Ebay(_) => crate::Vendor::Ebay,
            Self::WooCommerce(_) => crate::Vendor::WooCommerce,
        }
    }

    /// Validates the wrapped credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidConfig`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Shopify(c) => c.validate(),
            Self::Amazon(c) => c.validate(),
            Self::Ebay(c) => c.validate(),
            Self::WooCommerce(c) => c.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let credentials = ShopifyCredentials::new("demo", Secret::new("shpat_very_secret"));
        let debug = format!("{credentials:?}");
        assert!(debug.contains("demo"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpat_very_secret"));
    }

    #[test]
    fn test_secret_from_env_reference() {
        let secret: Secret = serde_json::from_value(json!({"env": "PATH"})).unwrap();
        assert_eq!(secret.expose(), std::env::var("PATH").unwrap());

        let missing = serde_json::from_value::<Secret>(json!({"env": "MARKET_BRIDGE_UNSET_VARIABLE_42"}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_env_var_name_validation() {
        assert!(validate_env_var_name("SHOPIFY_TOKEN").is_ok());
        assert!(validate_env_var_name("_private").is_ok());
        assert!(validate_env_var_name("").is_err());
        assert!(validate_env_var_name("1TOKEN").is_err());
        assert!(validate_env_var_name("TOKEN;rm").is_err());
    }

    #[test]
    fn test_shopify_record_aliases() {
        let credentials: ShopifyCredentials = serde_json::from_value(json!({
            "shopify_store_name": "demo",
            "shopify_access_token": "abc",
        }))
        .unwrap();

        assert_eq!(credentials.store_name, "demo");
        assert_eq!(credentials.access_token.expose(), "abc");
        assert_eq!(credentials.api_version, "2024-01");
        assert!(credentials.validate().is_ok());
    }

    #[test]
    fn test_shopify_shop_domain() {
        let short = ShopifyCredentials::new("Demo", Secret::new("abc"));
        assert_eq!(short.shop_domain(), "demo.myshopify.com");

        let full = ShopifyCredentials::new("demo.myshopify.com", Secret::new("abc"));
        assert_eq!(full.shop_domain(), "demo.myshopify.com");
    }

    #[test]
    fn test_shopify_validation() {
        assert!(ShopifyCredentials::new("", Secret::new("abc")).validate().is_err());
        assert!(ShopifyCredentials::new("demo/evil", Secret::new("abc")).validate().is_err());
        assert!(ShopifyCredentials::new("demo", Secret::new(" ")).validate().is_err());

        let mut credentials = ShopifyCredentials::new("demo", Secret::new("abc"));
        credentials.api_version = "latest".to_owned();
        assert!(credentials.validate().is_err());
    }

    #[test]
    fn test_amazon_defaults_and_validation() {
        let credentials = AmazonCredentials::new("A2SELLER", Secret::new("Atza|token"));
        assert_eq!(credentials.endpoint, "https://sellingpartnerapi-na.amazon.com");
        assert_eq!(credentials.marketplace_ids, ["ATVPDKIKX0DER"]);
        assert!(credentials.validate().is_ok());

        let insecure = AmazonCredentials {
            endpoint: "http://sellingpartnerapi-na.amazon.com".to_owned(),
            ..credentials.clone()
        };
        assert!(insecure.validate().is_err());

        let no_marketplace = AmazonCredentials { marketplace_ids: vec![], ..credentials };
        assert!(no_marketplace.validate().is_err());
    }

    #[test]
    fn test_ebay_validation() {
        let credentials = EbayCredentials::new(Secret::new("v^1.1#token"));
        assert_eq!(credentials.content_language, "en-US");
        assert!(credentials.validate().is_ok());

        assert!(credentials.clone().with_merchant_location_key(" ").validate().is_err());
        assert!(credentials.clone().with_pickup_fulfillment_hours(4).validate().is_err());
        let pickup = credentials.clone().with_merchant_location_key("store-1").with_pickup_fulfillment_hours(4);
        assert!(pickup.validate().is_ok());

        let loopback = EbayCredentials { api_base: "https://127.0.0.1".to_owned(), ..credentials };
        assert!(loopback.validate().is_err());
    }

    #[test]
    fn test_woocommerce_validation() {
        let credentials = WooCommerceCredentials::new(
            "https://yourstore.com",
            Secret::new("ck_x"),
            Secret::new("cs_x"),
        );
        assert_eq!(credentials.api_version, "wc/v3");
        assert!(credentials.validate().is_ok());

        let localhost = WooCommerceCredentials {
            store_url: "https://localhost".to_owned(),
            ..credentials.clone()
        };
        assert!(localhost.validate().is_err());

        let no_secret = WooCommerceCredentials { consumer_secret: Secret::new(""), ..credentials };
        assert!(no_secret.validate().is_err());
    }

    #[test]
    fn test_vendor_credentials_tagged_deserialization() {
        let credentials: VendorCredentials = toml::from_str(
            r#"
            vendor = "woocommerce"
            store_url = "https://yourstore.com"
            consumer_key = "ck_x"
            consumer_secret = "cs_x"
            "#,
        )
        .unwrap();

        assert_eq!(credentials.vendor(), crate::Vendor::WooCommerce);
        assert!(credentials.validate().is_ok());

        let unknown = toml::from_str::<VendorCredentials>(r#"vendor = "etsy""#);
        assert!(unknown.is_err());
    }
}
