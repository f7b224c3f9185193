//! Read-only collection registry.
//!
//! Maps a collection id to its description, the product labels of the
//! services publishing into it, and the item-id namespace prefixes it accepts.
//! The table is passed to validation and assembly explicitly.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub description: String,
    /// Service UID -> human-readable product label
    #[serde(default)]
    pub products: BTreeMap<String, String>,
    /// Accepted service-UID prefixes; the collection id itself when empty
    #[serde(default)]
    pub namespaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, CollectionInfo>,
}

fn collection(description: &str, products: &[(&str, &str)]) -> CollectionInfo {
    CollectionInfo {
        description: description.to_string(),
        products: products
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        namespaces: Vec::new(),
    }
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            "FS-FM".to_string(),
            collection(
                "Forest Types Mapping",
                &[
                    ("FS-FM-FC-A", "Forest Types Maps"),
                    ("FS-FM-FC-B", "Forest Types Maps"),
                    ("FS-FM-TC", "Tree Cover Density Maps"),
                    ("FS-FM-FF-S1", "Forest Types Maps / Forest Fuel Maps"),
                    ("FS-FM-FF-S2", "Forest Types Maps / Forest Fuel Maps"),
                    ("FS-FM-FF-A2", "Forest Types Maps / Forest Fuel Maps"),
                    ("FS-FM-FF-A1", "Forest Types Maps / Forest Fuel Maps"),
                ],
            ),
        );
        collections.insert(
            "FS-FT".to_string(),
            collection("Fuel Type Mapping", &[("FS-FT-FT-00", "Fuel Type Maps")]),
        );
        collections.insert(
            "FS-HA".to_string(),
            collection(
                "Forest and NATURA Areas Health Assessment",
                &[("FS-HA-HT-B-A2", "FNA Health trends")],
            ),
        );
        collections.insert(
            "FS-BI".to_string(),
            collection(
                "Biodiversity Mapping of Forest and NATURA Areas",
                &[
                    ("FS-BI-SI", "Biodiversity Indices"),
                    ("FS-BI-HS", "Biodiversity Hot Spots Detection"),
                    ("FS-BI-BT", "Biodiversity Trends"),
                    ("FS-BI-TM", "Biodiversity Trend Maps in Disturbed Ecosystems"),
                ],
            ),
        );
        collections.insert(
            "FS-TM".to_string(),
            collection(
                "Forest and NATURA Areas Threat Monitoring",
                &[("FS-TM-TM-B-A2", "FNA Threat monitoring")],
            ),
        );
        collections.insert(
            "LS-LC".to_string(),
            collection(
                "Land Use/Land Cover",
                &[
                    ("LS-LC-CM-A", "Land Cover Classification for the period 2015-2024"),
                    ("LS-LC-CM-B", "Land Cover Classification for the period 2025+"),
                    ("LS-LC-CA-A", "Change Analysis for the period 2015-2024"),
                    ("LS-LC-CA-B", "Change Analysis for the period 2025+"),
                ],
            ),
        );
        collections.insert(
            "LS-DF".to_string(),
            collection(
                "Deformation Monitoring",
                &[
                    ("LS-DF-PS-S1", "PSI displacement maps for Greece"),
                    (
                        "LS-DF-SB-S1",
                        "SBAS (Distributed Scatterers) displacement maps for Greece",
                    ),
                    ("LS-DF-IT-S1", "Co-seismic InSAR products for Greece"),
                    ("LS-DF-LS-00", "On-demand LANDSLIDE tracking"),
                ],
            ),
        );
        collections.insert(
            "LS-UA".to_string(),
            collection(
                "Urban Analytics Services",
                &[
                    ("LS-UA-LST-BA1", "Land Surface Temperature Map (200m)"),
                    ("LS-UA-AT-BA1", "Air Temperature Map (200m)"),
                    ("LS-UA-SUHI-BA1", "SUHI/UHI Map (200m)"),
                    ("LS-UA-UPHI-B", "Urban and Public Health"),
                    ("LS-UA-AQM-B", "Urban Air Quality AI Model training"),
                    ("LS-UA-AQ-B", "Urban Air Quality"),
                ],
            ),
        );
        Self { collections }
    }
}

impl CollectionRegistry {
    pub fn new(collections: BTreeMap<String, CollectionInfo>) -> Self {
        Self { collections }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn get(&self, collection_id: &str) -> Result<&CollectionInfo> {
        self.collections
            .get(collection_id)
            .ok_or_else(|| Error::UnknownCollection(collection_id.to_string()))
    }

    /// True when `service_uid` is one of the collection's namespaces or a dash-extension of one
    pub fn allows(&self, collection_id: &str, service_uid: &str) -> Result<bool> {
        let info = self.get(collection_id)?;
        let fallback = [collection_id.to_string()];
        let namespaces: &[String] = if info.namespaces.is_empty() {
            &fallback
        } else {
            &info.namespaces
        };
        Ok(namespaces.iter().any(|ns| {
            service_uid == ns
                || service_uid
                    .strip_prefix(ns.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        }))
    }

    /// Product label for a service, falling back to the collection description
    pub fn product_label(&self, collection_id: &str, service_uid: &str) -> Result<&str> {
        let info = self.get(collection_id)?;
        Ok(info
            .products
            .get(service_uid)
            .map(String::as_str)
            .unwrap_or(info.description.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_eight_collections() {
        let reg = CollectionRegistry::default();
        for id in [
            "FS-FM", "FS-FT", "FS-HA", "FS-BI", "FS-TM", "LS-LC", "LS-DF", "LS-UA",
        ] {
            assert!(reg.get(id).is_ok(), "{id}");
        }
        assert!(matches!(reg.get("XX"), Err(Error::UnknownCollection(_))));
    }

    #[test]
    fn namespace_requires_dash_boundary() {
        let reg = CollectionRegistry::default();
        assert!(reg.allows("LS-DF", "LS-DF").unwrap());
        assert!(reg.allows("LS-DF", "LS-DF-SB-S1").unwrap());
        assert!(!reg.allows("LS-DF", "LS-DFX").unwrap());
        assert!(!reg.allows("LS-DF", "FS-FM-TC").unwrap());
    }

    #[test]
    fn explicit_namespaces_override_collection_id() {
        let mut table = BTreeMap::new();
        table.insert(
            "C".to_string(),
            CollectionInfo {
                description: "Custom".to_string(),
                products: BTreeMap::new(),
                namespaces: vec!["SS-WS".to_string()],
            },
        );
        let reg = CollectionRegistry::new(table);
        assert!(reg.allows("C", "SS-WS-BS").unwrap());
        assert!(!reg.allows("C", "C-1").unwrap());
        assert_eq!(reg.product_label("C", "SS-WS-BS").unwrap(), "Custom");
    }

    #[test]
    fn labels_come_from_product_table() {
        let reg = CollectionRegistry::default();
        assert_eq!(
            reg.product_label("LS-DF", "LS-DF-SB-S1").unwrap(),
            "SBAS (Distributed Scatterers) displacement maps for Greece"
        );
    }
}
