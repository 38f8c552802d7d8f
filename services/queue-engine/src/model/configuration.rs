use serde::{Deserialize, Serialize};

use super::{ConfigurationName, ValidationError};

pub const DEFAULT_POD_LOAD_TOLERANCE: u32 = 50;
pub const DEFAULT_PRODUCT_LOAD_VALUE: u32 = 15;
pub const DEFAULT_PRODUCT_TIMEOUT_VALUE: u32 = 60;

/// Product names in a freshly created configuration.
pub const DEFAULT_CATALOG: [&str; 3] = ["vENM", "cENM", "CCD"];

fn default_pod_load_tolerance() -> u32 {
    DEFAULT_POD_LOAD_TOLERANCE
}

fn default_product_load_value() -> u32 {
    DEFAULT_PRODUCT_LOAD_VALUE
}

fn default_product_timeout_value() -> u32 {
    DEFAULT_PRODUCT_TIMEOUT_VALUE
}

fn default_catalog() -> Vec<CatalogProduct> {
    DEFAULT_CATALOG.iter().map(|name| CatalogProduct::new(*name)).collect()
}

/// A catalog entry with the defaults applied to pods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub name: String,
    #[serde(default = "default_product_load_value")]
    pub default_product_load_value: u32,
    #[serde(default = "default_product_timeout_value")]
    pub default_product_timeout_value: u32,
}

impl CatalogProduct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_product_load_value: DEFAULT_PRODUCT_LOAD_VALUE,
            default_product_timeout_value: DEFAULT_PRODUCT_TIMEOUT_VALUE,
        }
    }

    pub fn with_defaults(name: impl Into<String>, load_value: u32, timeout_value: u32) -> Self {
        Self {
            name: name.into(),
            default_product_load_value: load_value,
            default_product_timeout_value: timeout_value,
        }
    }
}

/// The process-wide product catalog and pod defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub name: ConfigurationName,
    #[serde(default = "default_pod_load_tolerance")]
    pub default_pod_load_tolerance: u32,
    #[serde(default = "default_catalog")]
    pub products: Vec<CatalogProduct>,
}

impl Configuration {
    /// Creates a configuration with the default catalog.
    pub fn new(name: ConfigurationName) -> Self {
        Self {
            name,
            default_pod_load_tolerance: DEFAULT_POD_LOAD_TOLERANCE,
            products: default_catalog(),
        }
    }

    pub fn with_pod_load_tolerance(mut self, tolerance: u32) -> Self {
        self.default_pod_load_tolerance = tolerance;
        self
    }

    pub fn with_products(mut self, products: Vec<CatalogProduct>) -> Self {
        self.products = products;
        self
    }

    pub fn product_names(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|p| p.name.as_str())
    }

    pub fn catalog_product(&self, name: &str) -> Option<&CatalogProduct> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.catalog_product(name).is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.products.iter().any(|p| p.name.trim().is_empty()) {
            return Err(ValidationError::Required("products.name"));
        }
        Ok(())
    }
}

/// Partial update of the configuration. `name` is accepted only to reject
/// changes to it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_pod_load_tolerance: Option<u32>,
    #[serde(default)]
    pub products: Option<Vec<CatalogProduct>>,
}

impl ConfigurationPatch {
    pub fn immutable_violation(&self, current: &Configuration) -> Option<&'static str> {
        match &self.name {
            Some(name) if name.trim() != current.name.as_str() => Some("name"),
            _ => None,
        }
    }

    pub fn apply(&self, current: &Configuration) -> Configuration {
        let mut next = current.clone();
        if let Some(tolerance) = self.default_pod_load_tolerance {
            next.default_pod_load_tolerance = tolerance;
        }
        if let Some(products) = &self.products {
            next.products = products.clone();
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let config = Configuration::new(ConfigurationName::parse("default").unwrap());
        assert_eq!(config.default_pod_load_tolerance, 50);
        assert_eq!(config.product_names().collect::<Vec<_>>(), DEFAULT_CATALOG);
        let venm = config.catalog_product("vENM").unwrap();
        assert_eq!(venm.default_product_load_value, 15);
        assert_eq!(venm.default_product_timeout_value, 60);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: Configuration =
            serde_json::from_str(r#"{"name": "default", "products": [{"name": "CCD"}]}"#).unwrap();
        assert_eq!(config.default_pod_load_tolerance, 50);
        assert_eq!(config.products, vec![CatalogProduct::new("CCD")]);
    }

    #[test]
    fn test_validate_rejects_blank_product_name() {
        let config = Configuration::new(ConfigurationName::parse("default").unwrap())
            .with_products(vec![CatalogProduct::new("  ")]);
        assert_eq!(
            config.validate(),
            Err(ValidationError::Required("products.name"))
        );
    }

    #[test]
    fn test_patch_keeps_name_and_replaces_catalog() {
        let current = Configuration::new(ConfigurationName::parse("default").unwrap());
        let patch = ConfigurationPatch {
            name: Some("default".to_string()),
            products: Some(vec![CatalogProduct::new("vENM")]),
            ..Default::default()
        };
        assert_eq!(patch.immutable_violation(&current), None);
        let next = patch.apply(&current);
        assert_eq!(next.product_names().collect::<Vec<_>>(), vec!["vENM"]);
        assert_eq!(next.default_pod_load_tolerance, 50);

        let rename = ConfigurationPatch {
            name: Some("other".to_string()),
            ..Default::default()
        };
        assert_eq!(rename.immutable_violation(&current), Some("name"));
    }
}
