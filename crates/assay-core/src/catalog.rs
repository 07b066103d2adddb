//! Product catalog: the analysis item templates each product is tested against.
//!
//! The catalog is fixed for the lifetime of a process. Reports refer back to
//! it by product code only, so a catalog edit never rewrites history; it only
//! changes how saved reports are projected (see [`crate::merge`]).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Errors from loading a catalog file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("catalog product #{index} has an empty key")]
    EmptyKey { index: usize },

    #[error("duplicate product key '{0}' in catalog")]
    DuplicateKey(String),

    #[error("duplicate product code '{0}' in catalog")]
    DuplicateCode(String),
}

/// One expected analysis for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisItemTemplate {
    pub item_name: String,
    #[serde(default)]
    pub specification: String,
    /// Default result shown before anything is entered. Almost always empty.
    #[serde(default)]
    pub result: String,
}

impl AnalysisItemTemplate {
    fn new(item_name: &str, specification: &str) -> Self {
        Self {
            item_name: item_name.to_string(),
            specification: specification.to_string(),
            result: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub key: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub analysis_items: Vec<AnalysisItemTemplate>,
}

impl Product {
    /// Human label used in listings: `name (code)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<Product>,
}

/// Ordered, read-only product catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog, rejecting empty keys and duplicate keys or codes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when a key is empty or a key/code repeats.
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut keys = HashSet::new();
        let mut codes = HashSet::new();
        for (index, product) in products.iter().enumerate() {
            if product.key.trim().is_empty() {
                return Err(CatalogError::EmptyKey { index });
            }
            if !keys.insert(product.key.as_str()) {
                return Err(CatalogError::DuplicateKey(product.key.clone()));
            }
            if !codes.insert(product.code.as_str()) {
                return Err(CatalogError::DuplicateCode(product.code.clone()));
            }
        }
        Ok(Self { products })
    }

    /// Parse a catalog from TOML `[[products]]` tables.
    ///
    /// ```toml
    /// [[products]]
    /// key = "productA"
    /// name = "알파-아밀라아제 A-100"
    /// code = "APA-100"
    /// analysisItems = [
    ///   { itemName = "수분(%)", specification = "10 이하" },
    /// ]
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on syntax errors or duplicate keys/codes.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.products)
    }

    /// Load a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or any
    /// [`from_toml_str`](Self::from_toml_str) error.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), products = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.key == key)
    }

    /// All products in declaration order.
    #[must_use]
    pub fn list_all(&self) -> &[Product] {
        &self.products
    }

    /// Resolve a saved report's product code back to its current catalog entry.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.code == code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// The built-in catalog shipped with the tool.
    #[must_use]
    pub fn builtin() -> Self {
        let t = AnalysisItemTemplate::new;
        Self {
            products: vec![
                Product {
                    key: "productA".into(),
                    name: "알파-아밀라아제 A-100".into(),
                    code: "APA-100".into(),
                    analysis_items: vec![
                        t("성상", "고유의 색과 향을 가진 분말"),
                        t("수분(%)", "10 이하"),
                        t("PH (3%)", "4 ~ 7"),
                        t("역가(u/g)", "100,000 이상"),
                    ],
                },
                Product {
                    key: "productB".into(),
                    name: "베타-글루카나아제 B-200".into(),
                    code: "BGL-200".into(),
                    analysis_items: vec![
                        t("성상", "백색의 미세한 분말"),
                        t("수분(%)", "8 이하"),
                        t("회분(%)", "0.5 이하"),
                        t("역가(u/g)", "200,000 이상"),
                        t("중금속(ppm)", "10 이하"),
                    ],
                },
                Product {
                    key: "productC".into(),
                    name: "셀룰라아제 C-300".into(),
                    code: "CEL-300".into(),
                    analysis_items: vec![
                        t("성상", "고유의 색과 향을 가진 분말"),
                        t("수분(%)", "10 이하"),
                        t("PH (3%)", "4 ~ 7"),
                        t("조단백(%)", "0.35 이하"),
                        t("회분(%)", "0.2 이하"),
                        t("일반세균(cfu/g)", "85 이상"),
                        t("광학적", "26 이상"),
                        t("입도 #40 ON", "3 이하"),
                        t("입도 #60 ON", "10 ~ 40"),
                        t("입도 #120# ON", "10 ~ 40"),
                        t("입도 #120# Pass", "80 이상"),
                    ],
                },
                Product {
                    key: "productCS".into(),
                    name: "옥수수전분".into(),
                    code: "GIC0032S".into(),
                    analysis_items: vec![
                        t("성상", "-"),
                        t("수분(%)", "-"),
                        t("회분(%)", "-"),
                        t("pH(%)", "-"),
                        t("백도", "-"),
                        t("입도 #60 ON", "-"),
                    ],
                },
            ],
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keeps_declaration_order() {
        let catalog = Catalog::builtin();
        let keys: Vec<&str> = catalog.list_all().iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["productA", "productB", "productC", "productCS"]);
    }

    #[test]
    fn builtin_passes_its_own_validation() {
        let products = Catalog::builtin().list_all().to_vec();
        assert!(Catalog::new(products).is_ok());
    }

    #[test]
    fn get_and_find_by_code() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.get("productB").map(|p| p.code.as_str()), Some("BGL-200"));
        assert_eq!(catalog.find_by_code("CEL-300").map(|p| p.key.as_str()), Some("productC"));
        assert!(catalog.get("nope").is_none());
        assert!(catalog.find_by_code("nope").is_none());
    }

    #[test]
    fn templates_default_to_empty_results() {
        let catalog = Catalog::builtin();
        for product in catalog.list_all() {
            assert!(product.analysis_items.iter().all(|t| t.result.is_empty()));
        }
    }

    #[test]
    fn parses_toml_catalog() {
        let catalog = Catalog::from_toml_str(
            r#"
[[products]]
key = "productX"
name = "Test X"
code = "TX-1"
analysisItems = [
  { itemName = "수분(%)", specification = "10 이하" },
  { itemName = "PH", specification = "4~7" },
]

[[products]]
key = "productY"
name = "Test Y"
code = "TY-1"
"#,
        )
        .expect("catalog should parse");

        assert_eq!(catalog.len(), 2);
        let x = catalog.get("productX").expect("productX");
        assert_eq!(x.label(), "Test X (TX-1)");
        assert_eq!(x.analysis_items[1].item_name, "PH");
        assert_eq!(x.analysis_items[1].result, "");
        assert!(catalog.get("productY").expect("productY").analysis_items.is_empty());
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = Catalog::from_toml_str(
            r#"
[[products]]
key = "a"
name = "A"
code = "SAME"

[[products]]
key = "b"
name = "B"
code = "SAME"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCode(code) if code == "SAME"));
    }

    #[test]
    fn rejects_duplicate_and_empty_keys() {
        let dup = Catalog::from_toml_str(
            "[[products]]\nkey = \"a\"\nname = \"A\"\ncode = \"1\"\n\n[[products]]\nkey = \"a\"\nname = \"B\"\ncode = \"2\"\n",
        )
        .unwrap_err();
        assert!(matches!(dup, CatalogError::DuplicateKey(_)));

        let empty = Catalog::from_toml_str("[[products]]\nkey = \" \"\nname = \"A\"\ncode = \"1\"\n")
            .unwrap_err();
        assert!(matches!(empty, CatalogError::EmptyKey { index: 0 }));
    }
}
