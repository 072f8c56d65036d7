//! Operator-prepared order configuration.

use crate::color::BoxColor;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Clients known to the cell when no warehouse table overrides them.
pub const DEFAULT_CLIENTS: [&str; 4] = ["rafael_ltda", "maria_sa", "joao_corp", "ana_ind"];

/// Order template read when Create-Order is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// How many identical orders to create.
    pub order_count: u32,
    /// Color requested.
    pub order_color: BoxColor,
    /// Boxes per order.
    pub order_boxes: u32,
    /// Resource count per order.
    pub order_resource: u32,
    /// Client the orders belong to.
    pub order_client: String,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            order_count: 1,
            order_color: BoxColor::Green,
            order_boxes: 5,
            order_resource: 5,
            order_client: DEFAULT_CLIENTS[0].to_string(),
        }
    }
}

impl OrderConfig {
    /// Validate against the list of known clients.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if a count is zero or the client is unknown.
    pub fn validate<S: AsRef<str>>(&self, clients: &[S]) -> Result<(), StoreError> {
        for (field, value) in [
            ("order_count", self.order_count),
            ("order_boxes", self.order_boxes),
            ("order_resource", self.order_resource),
        ] {
            if value < 1 {
                return Err(StoreError::Validation(format!("{field} must be >= 1")));
            }
        }
        if !clients.iter().any(|c| c.as_ref() == self.order_client) {
            let known: Vec<&str> = clients.iter().map(|c| c.as_ref()).collect();
            return Err(StoreError::Validation(format!(
                "unknown client '{}' (known: {})",
                self.order_client,
                known.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(OrderConfig::default().validate(&DEFAULT_CLIENTS).is_ok());
    }

    #[test]
    fn zero_counts_are_rejected() {
        let config = OrderConfig {
            order_boxes: 0,
            ..Default::default()
        };
        let err = config.validate(&DEFAULT_CLIENTS).unwrap_err();
        assert!(err.to_string().contains("order_boxes"));
    }

    #[test]
    fn unknown_client_is_rejected() {
        let config = OrderConfig {
            order_client: "acme".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&DEFAULT_CLIENTS).is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: OrderConfig =
            serde_json::from_str(r#"{"order_color": "BLUE", "order_count": 2}"#).unwrap();
        assert_eq!(config.order_color, BoxColor::Blue);
        assert_eq!(config.order_count, 2);
        assert_eq!(config.order_boxes, 5);
        assert_eq!(config.order_client, "rafael_ltda");
    }
}
