//! Supported disease catalog, embedded at build time from `diseases.toml`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LeafScanError;

const BUILTIN_CATALOG: &str = include_str!("diseases.toml");

const UNKNOWN_DESCRIPTION: &str =
    "No additional information is available for this condition. Consult a local extension service for treatment advice.";

/// One class the inference endpoint can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    pub label: String,
    pub plant: String,
    pub name: String,
    pub healthy: bool,
    pub description: String,
}

/// Catalog entries for a single plant, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct PlantGroup {
    pub plant: String,
    pub diseases: Vec<DiseaseInfo>,
}

#[derive(Deserialize)]
struct CatalogFile {
    disease: Vec<DiseaseInfo>,
}

pub struct DiseaseCatalog {
    entries: Vec<DiseaseInfo>,
    index: HashMap<String, usize>,
}

impl DiseaseCatalog {
    /// Parse the catalog shipped with the app.
    pub fn builtin() -> Result<Self, LeafScanError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    pub fn from_toml(source: &str) -> Result<Self, LeafScanError> {
        let file: CatalogFile = toml::from_str(source)
            .map_err(|e| LeafScanError::Config(format!("Invalid disease catalog: {}", e)))?;

        let mut index = HashMap::with_capacity(file.disease.len());
        for (i, entry) in file.disease.iter().enumerate() {
            if index.insert(normalize_label(&entry.label), i).is_some() {
                return Err(LeafScanError::Config(format!(
                    "Duplicate disease label in catalog: {}",
                    entry.label
                )));
            }
        }

        Ok(Self {
            entries: file.disease,
            index,
        })
    }

    pub fn entries(&self) -> &[DiseaseInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry, ignoring case and `_`/`-`/space differences.
    pub fn lookup(&self, label: &str) -> Option<&DiseaseInfo> {
        self.index
            .get(&normalize_label(label))
            .map(|&i| &self.entries[i])
    }

    pub fn describe(&self, label: &str) -> String {
        self.lookup(label)
            .map(|d| d.description.clone())
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string())
    }

    pub fn display_name(&self, label: &str) -> String {
        match self.lookup(label) {
            Some(d) => format!("{}: {}", d.plant, d.name),
            None => humanize_label(label),
        }
    }

    /// Unknown labels count as healthy only if they say so.
    pub fn is_healthy(&self, label: &str) -> bool {
        match self.lookup(label) {
            Some(d) => d.healthy,
            None => normalize_label(label).ends_with("healthy"),
        }
    }

    pub fn grouped_by_plant(&self) -> Vec<PlantGroup> {
        let mut groups: Vec<PlantGroup> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|g| g.plant == entry.plant) {
                Some(group) => group.diseases.push(entry.clone()),
                None => groups.push(PlantGroup {
                    plant: entry.plant.clone(),
                    diseases: vec![entry.clone()],
                }),
            }
        }
        groups
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to one `_`.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for c in label.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// "Banana___Black_sigatoka" -> "Banana: Black sigatoka"
fn humanize_label(label: &str) -> String {
    let clean = |s: &str| s.replace('_', " ").split_whitespace().collect::<Vec<_>>().join(" ");
    match label.trim().split_once("___") {
        Some((plant, condition)) => format!("{}: {}", clean(plant), clean(condition)),
        None => clean(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = DiseaseCatalog::builtin().unwrap();
        assert!(catalog.len() >= 15);
        assert!(catalog.entries().iter().any(|d| d.healthy));
        assert!(catalog.entries().iter().all(|d| !d.description.is_empty()));
    }

    #[test]
    fn test_normalize_label_variants() {
        assert_eq!(normalize_label("Tomato___Late_blight"), "tomato_late_blight");
        assert_eq!(normalize_label("tomato late blight"), "tomato_late_blight");
        assert_eq!(normalize_label("Tomato-Late-Blight"), "tomato_late_blight");
        assert_eq!(
            normalize_label("Corn_(maize)___Common_rust_"),
            "corn_maize_common_rust"
        );
    }

    #[test]
    fn test_lookup_is_forgiving() {
        let catalog = DiseaseCatalog::builtin().unwrap();
        let entry = catalog.lookup("potato late blight").unwrap();
        assert_eq!(entry.label, "Potato___Late_blight");
        assert!(catalog.lookup("Corn (maize) Common rust").is_some());
        assert!(catalog.lookup("Mango___Anthracnose").is_none());
    }

    #[test]
    fn test_display_name_and_fallback() {
        let catalog = DiseaseCatalog::builtin().unwrap();
        assert_eq!(catalog.display_name("Apple___Apple_scab"), "Apple: Apple scab");
        assert_eq!(catalog.display_name("Mango___Powdery_mildew"), "Mango: Powdery mildew");
        assert_eq!(catalog.display_name("leaf_spot"), "leaf spot");
        assert_eq!(catalog.describe("Mango___Powdery_mildew"), UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn test_is_healthy() {
        let catalog = DiseaseCatalog::builtin().unwrap();
        assert!(catalog.is_healthy("Tomato___healthy"));
        assert!(!catalog.is_healthy("Tomato___Leaf_Mold"));
        assert!(catalog.is_healthy("Mango___healthy"));
        assert!(!catalog.is_healthy("Mango___Anthracnose"));
    }

    #[test]
    fn test_grouped_by_plant_keeps_order() {
        let catalog = DiseaseCatalog::builtin().unwrap();
        let groups = catalog.grouped_by_plant();
        let plants: Vec<&str> = groups.iter().map(|g| g.plant.as_str()).collect();
        assert_eq!(plants, vec!["Apple", "Corn", "Grape", "Potato", "Tomato"]);

        let total: usize = groups.iter().map(|g| g.diseases.len()).sum();
        assert_eq!(total, catalog.len());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let source = r#"
            [[disease]]
            label = "Tomato___healthy"
            plant = "Tomato"
            name = "Healthy"
            healthy = true
            description = "ok"

            [[disease]]
            label = "tomato healthy"
            plant = "Tomato"
            name = "Healthy"
            healthy = true
            description = "dup"
        "#;
        assert!(DiseaseCatalog::from_toml(source).is_err());
    }
}
