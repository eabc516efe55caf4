use serde::{Deserialize, Serialize};

/// Sentinel for `server_region` meaning "derive the region from the device timezone".
pub const AUTOMATIC_REGION: &str = "automatic";

pub const KEY_PURCHASE_TOKEN: &str = "purchaseToken";
pub const KEY_PRODUCT_ID: &str = "productId";
pub const KEY_PURCHASE_EXPIRY: &str = "purchaseExpiry";
pub const KEY_IS_SUBSCRIPTION_PURCHASE: &str = "isSubscriptionPurchase";
pub const KEY_SERVER_REGION: &str = "serverRegion";

/// Durable provisioning-related preferences.
///
/// Only the provisioner writes these keys while an attempt is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredPreferences {
    pub purchase_token: String,
    pub product_id: String,
    /// Expiry of the purchase in milliseconds since the Unix epoch; 0 when unset.
    pub purchase_expiry: i64,
    pub is_subscription_purchase: bool,
    pub server_region: String,
}

impl Default for StoredPreferences {
    fn default() -> Self {
        Self {
            purchase_token: String::new(),
            product_id: String::new(),
            purchase_expiry: 0,
            is_subscription_purchase: false,
            server_region: AUTOMATIC_REGION.to_string(),
        }
    }
}

impl StoredPreferences {
    /// Clears every purchase field. The server region is left alone.
    pub fn reset_purchase(&mut self) {
        self.purchase_token.clear();
        self.product_id.clear();
        self.purchase_expiry = 0;
        self.is_subscription_purchase = false;
    }

    pub fn has_purchase(&self) -> bool {
        !self.purchase_token.is_empty()
    }
}
