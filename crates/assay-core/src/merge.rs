//! Template merge: project saved results onto a product's current items.
//!
//! The current catalog entry decides which items appear, in which order, and
//! with which specification text. Saved items only contribute their `result`,
//! matched by exact item name. Items no longer in the template drop out of the
//! projection (the stored record keeps them until the next update).

use crate::catalog::Catalog;
use crate::model::report::ReportItemResult;

/// Merge `prior` results onto the template of `product_key`.
///
/// Returns an empty list for an unknown product. When `prior` holds the same
/// item name twice, the first occurrence wins.
#[must_use]
pub fn merge(
    catalog: &Catalog,
    product_key: &str,
    prior: &[ReportItemResult],
) -> Vec<ReportItemResult> {
    let Some(product) = catalog.get(product_key) else {
        return Vec::new();
    };

    product
        .analysis_items
        .iter()
        .map(|template| {
            let result = prior
                .iter()
                .find(|saved| saved.item_name == template.item_name)
                .map_or_else(|| template.result.clone(), |saved| saved.result.clone());
            ReportItemResult {
                item_name: template.item_name.clone(),
                specification: template.specification.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AnalysisItemTemplate, Product};

    fn two_item_catalog() -> Catalog {
        Catalog::new(vec![Product {
            key: "productA".into(),
            name: "알파-아밀라아제 A-100".into(),
            code: "APA-100".into(),
            analysis_items: vec![
                AnalysisItemTemplate {
                    item_name: "수분(%)".into(),
                    specification: "10 이하".into(),
                    result: String::new(),
                },
                AnalysisItemTemplate {
                    item_name: "PH".into(),
                    specification: "4~7".into(),
                    result: String::new(),
                },
            ],
        }])
        .expect("valid catalog")
    }

    #[test]
    fn empty_prior_yields_template_order_with_blank_results() {
        let catalog = Catalog::builtin();
        for product in catalog.list_all() {
            let merged = merge(&catalog, &product.key, &[]);
            let names: Vec<&str> = merged.iter().map(|i| i.item_name.as_str()).collect();
            let expected: Vec<&str> = product
                .analysis_items
                .iter()
                .map(|t| t.item_name.as_str())
                .collect();
            assert_eq!(names, expected);
            assert!(merged.iter().all(|i| i.result.is_empty()));
        }
    }

    #[test]
    fn saved_results_survive_but_specification_is_current() {
        let catalog = two_item_catalog();
        let prior = vec![
            ReportItemResult::new("PH", "stale spec", "6"),
            ReportItemResult::new("수분(%)", "", "5"),
        ];
        let merged = merge(&catalog, "productA", &prior);
        assert_eq!(
            merged,
            vec![
                ReportItemResult::new("수분(%)", "10 이하", "5"),
                ReportItemResult::new("PH", "4~7", "6"),
            ]
        );
    }

    #[test]
    fn removed_items_drop_and_new_items_default() {
        let catalog = two_item_catalog();
        let prior = vec![
            ReportItemResult::new("역가(u/g)", "100,000 이상", "120000"),
            ReportItemResult::new("PH", "4~7", "5.5"),
        ];
        let merged = merge(&catalog, "productA", &prior);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].result, "");
        assert_eq!(merged[1].result, "5.5");
    }

    #[test]
    fn first_duplicate_wins() {
        let catalog = two_item_catalog();
        let prior = vec![
            ReportItemResult::new("PH", "", "first"),
            ReportItemResult::new("PH", "", "second"),
        ];
        let merged = merge(&catalog, "productA", &prior);
        assert_eq!(merged[1].result, "first");
    }

    #[test]
    fn unknown_product_merges_to_nothing() {
        let prior = vec![ReportItemResult::new("PH", "", "6")];
        assert!(merge(&Catalog::builtin(), "productZ", &prior).is_empty());
    }
}
