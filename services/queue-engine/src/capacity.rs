//! Pod capacity model.
//!
//! Keeps a pod's product list and `productType` filter in lock-step with the
//! live configuration catalog. Applied to every pod persist by
//! [`prepare_pod`]; the configuration is passed in explicitly.

use thiserror::Error;

use crate::model::{Configuration, Pod, Product, ALL_PRODUCTS};

/// Errors raised while preparing a pod for persist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("No Default Configuration detected, please let Admin create one before proceeding.")]
    NoConfiguration,

    #[error("Pod '{field}' field is immutable and cannot be modified.")]
    Immutable { field: &'static str },
}

/// Reconciles `next` against the configuration catalog.
///
/// 1. A configuration must exist.
/// 2. `productType` entries outside the catalog (other than `"All"`) are
///    dropped; an empty filter becomes `["All"]`.
/// 3. On create, an unset load tolerance and unset product values are
///    taken from the configuration.
/// 4. Catalog products missing from the pod are appended with catalog defaults.
/// 5. Pod products outside the catalog are removed.
pub fn prepare_pod(
    previous: Option<&Pod>,
    mut next: Pod,
    configuration: Option<&Configuration>,
) -> Result<Pod, CapacityError> {
    let configuration = configuration.ok_or(CapacityError::NoConfiguration)?;

    if let Some(previous) = previous {
        if previous.name != next.name {
            return Err(CapacityError::Immutable { field: "name" });
        }
    }

    next.product_type
        .retain(|t| t == ALL_PRODUCTS || configuration.declares(t));
    if next.product_type.is_empty() {
        next.product_type = vec![ALL_PRODUCTS.to_string()];
    }

    if previous.is_none() {
        if next.pod_load_tolerance.is_none() {
            next.pod_load_tolerance = Some(configuration.default_pod_load_tolerance);
        }
        for product in &mut next.products {
            let Some(catalog) = configuration.catalog_product(&product.name) else {
                continue;
            };
            product
                .load_value
                .get_or_insert(catalog.default_product_load_value);
            product
                .timeout_value
                .get_or_insert(catalog.default_product_timeout_value);
        }
    }

    for catalog in &configuration.products {
        if next.product(&catalog.name).is_none() {
            next.products.push(Product::new(
                catalog.name.clone(),
                catalog.default_product_load_value,
                catalog.default_product_timeout_value,
            ));
        }
    }

    next.products.retain(|p| configuration.declares(&p.name));

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogProduct, ConfigurationName, PodName};
    use proptest::prelude::*;

    fn configuration() -> Configuration {
        Configuration::new(ConfigurationName::parse("default").unwrap())
            .with_pod_load_tolerance(40)
            .with_products(vec![
                CatalogProduct::with_defaults("vENM", 15, 60),
                CatalogProduct::with_defaults("cENM", 10, 90),
            ])
    }

    fn pod() -> Pod {
        Pod::new(PodName::parse("cloud1").unwrap())
    }

    #[test]
    fn test_requires_configuration() {
        assert_eq!(prepare_pod(None, pod(), None), Err(CapacityError::NoConfiguration));
    }

    #[test]
    fn test_create_fills_defaults() {
        let prepared = prepare_pod(None, pod(), Some(&configuration())).unwrap();
        assert_eq!(prepared.pod_load_tolerance, Some(40));
        assert_eq!(
            prepared.products,
            vec![Product::new("vENM", 15, 60), Product::new("cENM", 10, 90)]
        );
    }

    #[test]
    fn test_create_keeps_explicit_values() {
        let draft = pod()
            .with_load_tolerance(0)
            .with_products(vec![Product {
                name: "cENM".into(),
                load_value: Some(3),
                timeout_value: None,
            }]);
        let prepared = prepare_pod(None, draft, Some(&configuration())).unwrap();
        assert_eq!(prepared.pod_load_tolerance, Some(0));
        assert_eq!(
            prepared.products,
            vec![Product::new("cENM", 3, 90), Product::new("vENM", 15, 60)]
        );
    }

    #[test]
    fn test_update_strips_unknown_products_and_types() {
        let existing = prepare_pod(None, pod(), Some(&configuration())).unwrap();
        let mut next = existing.clone();
        next.products.push(Product::new("CCD", 5, 5));
        next.product_type = vec!["CCD".into(), "vENM".into()];

        let prepared = prepare_pod(Some(&existing), next, Some(&configuration())).unwrap();
        assert!(prepared.product("CCD").is_none());
        assert_eq!(prepared.product_type, vec!["vENM".to_string()]);
    }

    #[test]
    fn test_empty_product_type_falls_back_to_all() {
        let draft = pod().with_product_type(["CCD"]);
        let prepared = prepare_pod(None, draft, Some(&configuration())).unwrap();
        assert_eq!(prepared.product_type, vec![ALL_PRODUCTS.to_string()]);
    }

    #[test]
    fn test_update_does_not_default_unset_values() {
        let existing = prepare_pod(None, pod(), Some(&configuration())).unwrap();
        let mut next = existing.clone();
        next.products[0].load_value = None;
        let prepared = prepare_pod(Some(&existing), next, Some(&configuration())).unwrap();
        assert_eq!(prepared.products[0].load_value, None);
    }

    #[test]
    fn test_catalog_growth_is_picked_up_on_next_save() {
        let existing = prepare_pod(None, pod(), Some(&configuration())).unwrap();
        let grown = configuration().with_products(vec![
            CatalogProduct::with_defaults("vENM", 15, 60),
            CatalogProduct::with_defaults("cENM", 10, 90),
            CatalogProduct::with_defaults("CCD", 20, 30),
        ]);
        let prepared = prepare_pod(Some(&existing), existing.clone(), Some(&grown)).unwrap();
        assert_eq!(prepared.product("CCD"), Some(&Product::new("CCD", 20, 30)));
    }

    #[test]
    fn test_rename_rejected() {
        let existing = prepare_pod(None, pod(), Some(&configuration())).unwrap();
        let mut renamed = existing.clone();
        renamed.name = PodName::parse("cloud2").unwrap();
        assert_eq!(
            prepare_pod(Some(&existing), renamed, Some(&configuration())),
            Err(CapacityError::Immutable { field: "name" })
        );
    }

    proptest! {
        #[test]
        fn prop_products_match_catalog(
            pod_products in proptest::collection::vec("(vENM|cENM|CCD|XYZ)", 0..6),
            types in proptest::collection::vec("(All|vENM|CCD|XYZ)", 0..4),
        ) {
            let draft = pod()
                .with_products(pod_products.iter().map(Product::named).collect())
                .with_product_type(types);
            let config = configuration();
            let prepared = prepare_pod(None, draft, Some(&config)).unwrap();

            for catalog in config.product_names() {
                prop_assert!(prepared.product(catalog).is_some());
            }
            for product in &prepared.products {
                prop_assert!(config.declares(&product.name));
            }
            prop_assert!(!prepared.product_type.is_empty());
            for t in &prepared.product_type {
                prop_assert!(t == ALL_PRODUCTS || config.declares(t));
            }
        }
    }
}
