//! Catalog loading - JSON documents of base alloys and condition overlays
//!
//! ```json
//! {
//!   "alloys":    [ { "alloy": "A2", "composition": { ... }, "taylor": { "coolant_factor": { ... } } } ],
//!   "materials": [ { "id": "P-CS-109", "base": "A2", "taylor": { "c": 300.0, "n": 0.25 } } ]
//! }
//! ```
//!
//! Each overlay is deep-merged onto its base: objects merge key by key,
//! anything else in the overlay replaces the base value.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::MaterialRecord;
use crate::handbook::EvalError;

const BUILTIN_CATALOG: &str = include_str!("../../data/tool_steels.json");

static BUILTIN: OnceCell<Catalog> = OnceCell::new();

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} entry #{index} has no string '{key}' field")]
    MissingKey {
        kind: &'static str,
        index: usize,
        key: &'static str,
    },

    #[error("material {id} references unknown base alloy '{alloy}'")]
    UnknownAlloy { id: String, alloy: String },

    #[error("base alloy '{0}' is defined more than once")]
    DuplicateAlloy(String),

    #[error("material ID '{0}' is defined more than once")]
    DuplicateMaterial(String),

    #[error("material {id} does not match the record schema: {source}")]
    Record {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    alloys: Vec<Map<String, Value>>,
    materials: Vec<Map<String, Value>>,
}

/// Immutable mapping from material ID to merged record
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    materials: BTreeMap<String, MaterialRecord>,
}

impl Catalog {
    /// The embedded tool steel catalog, parsed once per process
    pub fn builtin() -> Result<&'static Catalog, CatalogError> {
        BUILTIN.get_or_try_init(|| {
            let catalog = Catalog::from_json_str(BUILTIN_CATALOG)?;
            info!(materials = catalog.len(), "loaded built-in catalog");
            Ok(catalog)
        })
    }

    /// Load a catalog document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&content)?;
        info!(path = %path.display(), materials = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;

        let mut alloys: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
        for (index, alloy) in document.alloys.into_iter().enumerate() {
            let key = string_field(&alloy, "alloy").ok_or(CatalogError::MissingKey {
                kind: "alloy",
                index,
                key: "alloy",
            })?;
            if alloys.insert(key.clone(), alloy).is_some() {
                return Err(CatalogError::DuplicateAlloy(key));
            }
        }

        let mut records = Vec::with_capacity(document.materials.len());
        for (index, mut overlay) in document.materials.into_iter().enumerate() {
            let id = string_field(&overlay, "id").ok_or(CatalogError::MissingKey {
                kind: "material",
                index,
                key: "id",
            })?;

            let merged = match overlay.remove("base") {
                Some(Value::String(base)) => {
                    let mut merged = Value::Object(
                        alloys
                            .get(&base)
                            .cloned()
                            .ok_or_else(|| CatalogError::UnknownAlloy {
                                id: id.clone(),
                                alloy: base.clone(),
                            })?,
                    );
                    merge_overlay(&mut merged, Value::Object(overlay));
                    debug!(%id, %base, "merged condition overlay");
                    merged
                }
                Some(_) => {
                    return Err(CatalogError::MissingKey {
                        kind: "material",
                        index,
                        key: "base",
                    })
                }
                // Stand-alone record, must carry its own "alloy" key
                None => Value::Object(overlay),
            };

            let record: MaterialRecord = serde_json::from_value(merged)
                .map_err(|source| CatalogError::Record { id: id.clone(), source })?;
            records.push(record);
        }

        Self::from_records(records)
    }

    pub fn from_records(
        records: impl IntoIterator<Item = MaterialRecord>,
    ) -> Result<Self, CatalogError> {
        let mut materials = BTreeMap::new();
        for record in records {
            let id = record.id.clone();
            if materials.insert(id.clone(), record).is_some() {
                return Err(CatalogError::DuplicateMaterial(id));
            }
        }
        Ok(Self { materials })
    }

    pub fn get(&self, id: &str) -> Option<&MaterialRecord> {
        self.materials.get(id)
    }

    /// Like `get`, but an absent ID is an evaluation error
    pub fn require(&self, id: &str) -> Result<&MaterialRecord, EvalError> {
        self.get(id)
            .ok_or_else(|| EvalError::UnknownMaterial(id.to_string()))
    }

    /// Material IDs in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.materials.values()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Records grouped by base alloy, each group sorted by hardness
    pub fn by_alloy(&self) -> BTreeMap<&str, Vec<&MaterialRecord>> {
        let mut groups: BTreeMap<&str, Vec<&MaterialRecord>> = BTreeMap::new();
        for record in self.materials.values() {
            groups.entry(record.alloy.as_str()).or_default().push(record);
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.hardness.rockwell_c.total_cmp(&b.hardness.rockwell_c));
        }
        groups
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Deep-merge `overlay` into `base`
pub(crate) fn merge_overlay(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Condition, Operation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_merge_overlay_is_deep() {
        let mut base = json!({
            "taylor": { "depth_exponent": 0.18, "coolant_factor": { "dry": 1.0, "flood": 1.25 } },
            "name": "base"
        });
        let overlay = json!({
            "taylor": { "c": 50.0, "coolant_factor": { "flood": 1.3 } },
            "name": "overlay"
        });

        merge_overlay(&mut base, overlay);

        assert_eq!(
            base,
            json!({
                "taylor": { "depth_exponent": 0.18, "c": 50.0, "coolant_factor": { "dry": 1.0, "flood": 1.3 } },
                "name": "overlay"
            })
        );
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().expect("built-in catalog should parse");
        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog.ids().next(), Some("P-CS-101"));

        let a2 = catalog.get("P-CS-109").expect("A2 annealed present");
        assert_eq!(a2.alloy, "A2");
        assert_eq!(a2.condition, Condition::Annealed);
        assert_eq!(a2.kienzle.kc1_1, 2150.0);
        // Shared from the base alloy
        assert_eq!(a2.taylor.coolant_factor.get("dry"), Some(&1.0));
        assert_eq!(a2.johnson_cook.melting_temp, 1420.0);
        assert!(a2.recommendations.contains_key(&Operation::Milling));
    }

    #[test]
    fn test_builtin_catalog_is_shared() {
        let first = Catalog::builtin().unwrap() as *const Catalog;
        let second = Catalog::builtin().unwrap() as *const Catalog;
        assert_eq!(first, second, "built-in catalog should be loaded once");
    }

    #[test]
    fn test_record_without_recommendations() {
        let catalog = Catalog::builtin().unwrap();
        let m2 = catalog.get("P-CS-112").unwrap();
        assert!(m2.recommendations.is_empty());
    }

    #[test]
    fn test_by_alloy_groups_and_sorts() {
        let catalog = Catalog::builtin().unwrap();
        let groups = catalog.by_alloy();

        assert_eq!(groups.len(), 6);
        let a2 = &groups["A2"];
        assert_eq!(a2.len(), 2);
        assert!(a2[0].hardness.rockwell_c < a2[1].hardness.rockwell_c);
        assert_eq!(a2[1].id, "P-CS-110");
    }

    #[test]
    fn test_unknown_base_alloy() {
        let json = r#"{ "alloys": [], "materials": [ { "id": "X-1", "base": "Z9" } ] }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(
            matches!(err, CatalogError::UnknownAlloy { ref id, ref alloy } if id == "X-1" && alloy == "Z9"),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_missing_id() {
        let json = r#"{ "materials": [ { "base": "A2" } ] }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::MissingKey { key: "id", index: 0, .. }));
    }

    #[test]
    fn test_non_string_base_rejected() {
        let json = r#"{
            "alloys": [ { "alloy": "A2", "name": "A2" } ],
            "materials": [ { "id": "P-X-1", "base": 5 } ]
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(
            matches!(err, CatalogError::MissingKey { kind: "material", index: 0, key: "base" }),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_duplicate_material_id() {
        let builtin = Catalog::builtin().unwrap();
        let record = builtin.get("P-CS-101").unwrap().clone();
        let err = Catalog::from_records(vec![record.clone(), record]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateMaterial(ref id) if id == "P-CS-101"));
    }

    #[test]
    fn test_incomplete_record_reports_id() {
        let json = r#"{
            "alloys": [ { "alloy": "A2", "name": "A2" } ],
            "materials": [ { "id": "P-X-1", "base": "A2", "condition": "annealed" } ]
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::Record { ref id, .. } if id == "P-X-1"));
    }

    #[test]
    fn test_unknown_material_lookup() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.require("P-CS-999").unwrap_err(),
            EvalError::UnknownMaterial("P-CS-999".to_string())
        );
    }
}
