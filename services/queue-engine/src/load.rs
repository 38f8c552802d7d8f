//! Load accounting for pods.

use crate::model::{Deployment, Pod, QueueStatus};

/// Load a deployment of `product` contributes against `pod`'s tolerance.
///
/// Zero when the pod does not declare the product, or when the pod's
/// `productType` filter neither names the product nor contains `"All"`.
/// A product declared without a load value also counts as zero.
pub fn load_of(product: &str, pod: &Pod) -> u32 {
    let Some(declared) = pod.product(product) else {
        return 0;
    };
    if !pod.admits_product(product) {
        return 0;
    }
    declared.load_value.unwrap_or(0)
}

/// Summed load of every Active deployment in `deployments`.
pub fn active_load<'a, I>(pod: &Pod, deployments: I) -> u64
where
    I: IntoIterator<Item = &'a Deployment>,
{
    deployments
        .into_iter()
        .filter(|d| d.queue_status == QueueStatus::Active)
        .map(|d| u64::from(load_of(&d.product, pod)))
        .sum()
}

/// Returns true if adding `load` to `current` stays within the pod tolerance.
pub fn fits(pod: &Pod, current: u64, load: u32) -> bool {
    current + u64::from(load) <= u64::from(pod.load_tolerance())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeploymentName, PodName, Product};
    use proptest::prelude::*;
    use rstest::rstest;

    fn pod(product_type: &[&str]) -> Pod {
        Pod::new(PodName::parse("cloud1").unwrap())
            .with_load_tolerance(20)
            .with_products(vec![
                Product::new("vENM", 15, 60),
                Product::new("cENM", 10, 60),
                Product::named("CCD"),
            ])
            .with_product_type(product_type.iter().copied())
    }

    #[rstest]
    #[case(&["All"], "vENM", 15)]
    #[case(&["All"], "cENM", 10)]
    #[case(&["cENM"], "cENM", 10)]
    #[case(&["cENM"], "vENM", 0)]
    #[case(&["All"], "unknown", 0)]
    #[case(&["All"], "CCD", 0)]
    #[case(&["unknown"], "unknown", 0)]
    fn test_load_of(#[case] product_type: &[&str], #[case] product: &str, #[case] expected: u32) {
        assert_eq!(load_of(product, &pod(product_type)), expected);
    }

    #[test]
    fn test_active_load_ignores_queued() {
        let pod = pod(&["All"]);
        let mut active = Deployment::new(
            DeploymentName::parse("depl-001").unwrap(),
            pod.name.clone(),
            "vENM",
        );
        active.queue_status = QueueStatus::Active;
        let queued = Deployment::new(
            DeploymentName::parse("depl-002").unwrap(),
            pod.name.clone(),
            "cENM",
        );
        assert_eq!(active_load(&pod, [&active, &queued]), 15);
    }

    #[test]
    fn test_fits_is_inclusive() {
        let pod = pod(&["All"]);
        assert!(fits(&pod, 5, 15));
        assert!(!fits(&pod, 6, 15));
    }

    proptest! {
        #[test]
        fn prop_filtered_or_undeclared_products_weigh_nothing(
            load in 0u32..1000,
            declared in any::<bool>(),
            admitted in any::<bool>(),
        ) {
            let products = if declared { vec![Product::new("vENM", load, 60)] } else { vec![] };
            let types: Vec<&str> = if admitted { vec!["vENM"] } else { vec!["cENM"] };
            let pod = Pod::new(PodName::parse("cloud1").unwrap())
                .with_products(products)
                .with_product_type(types);

            let got = load_of("vENM", &pod);
            if declared && admitted {
                prop_assert_eq!(got, load);
            } else {
                prop_assert_eq!(got, 0);
            }
        }
    }
}
