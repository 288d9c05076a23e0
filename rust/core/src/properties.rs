// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed element property bag.
//!
//! The source model carries an open-ended property object per element. The
//! render core only reads a handful of keys, so those get typed fields; the
//! rest is preserved verbatim in [`Properties::extra`] for the selection panel.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quantity of one material inside an element (material passport entry).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialQuantity {
    /// Volume in cubic model units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Area in square model units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    /// Density in kg per cubic model unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    /// Unit label as written by the authoring tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl MaterialQuantity {
    /// Mass derived from volume and density, when both are known.
    pub fn mass(&self) -> Option<f64> {
        Some(self.volume? * self.density?)
    }
}

/// Property bag attached to a building element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    /// Element category (e.g. "Walls", "Floors")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Group or family name used by the filter panel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// Phase in which the element is built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_created: Option<String>,
    /// Phase in which the element is removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_demolished: Option<String>,
    /// Material name -> quantity breakdown
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub material_quantities: BTreeMap<String, MaterialQuantity>,
    /// Every other key, untouched
    #[serde(flatten)]
    pub extra: FxHashMap<String, Value>,
}

impl Properties {
    /// Raw value of a key that has no typed field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// String value of an untyped key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Numeric value of an untyped key.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(Value::as_f64)
    }

    /// Names of all materials in the quantity breakdown, sorted.
    pub fn material_names(&self) -> impl Iterator<Item = &str> {
        self.material_quantities.keys().map(String::as_str)
    }

    /// Quantity entry for one material.
    pub fn quantity(&self, material: &str) -> Option<&MaterialQuantity> {
        self.material_quantities.get(material)
    }

    /// Sum of all known material volumes.
    pub fn total_volume(&self) -> f64 {
        self.material_quantities
            .values()
            .filter_map(|q| q.volume)
            .sum()
    }

    /// Whether the element carries any phase information.
    pub fn is_phased(&self) -> bool {
        self.phase_created.is_some() || self.phase_demolished.is_some()
    }
}
