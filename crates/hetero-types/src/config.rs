//! Store configuration.

use crate::{DType, Device};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How vertex ids are made contiguous per type at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenumberPolicy {
    /// Renumber, keep the previous ids in `<col>_old` columns, and warn.
    #[default]
    Auto,
    /// Renumber and overwrite the previous ids.
    Renumber,
    /// Ids are already contiguous per type; derive offsets from type counts.
    Keep,
}

impl FromStr for RenumberPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(RenumberPolicy::Auto),
            "renumber" | "true" | "1" => Ok(RenumberPolicy::Renumber),
            "keep" | "false" | "0" => Ok(RenumberPolicy::Keep),
            other => Err(format!("unknown renumber policy: {}", other)),
        }
    }
}

/// Configuration for the heterogeneous graph store adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub renumber: RenumberPolicy,
    /// Integer width of vertex ids handed out by the store.
    #[serde(default = "default_vertex_dtype")]
    pub vertex_dtype: DType,
    /// Element type of the inferred feature tensor.
    #[serde(default = "default_property_dtype")]
    pub property_dtype: DType,
    /// Name of the catch-all feature tensor.
    #[serde(default = "default_feature_attr")]
    pub feature_attr: String,
    /// Name of the label tensor (and of the label property).
    #[serde(default = "default_label_attr")]
    pub label_attr: String,
    #[serde(default)]
    pub device: Device,
}

fn default_vertex_dtype() -> DType {
    DType::Int64
}

fn default_property_dtype() -> DType {
    DType::Float32
}

fn default_feature_attr() -> String {
    "x".to_string()
}

fn default_label_attr() -> String {
    "y".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            renumber: RenumberPolicy::default(),
            vertex_dtype: default_vertex_dtype(),
            property_dtype: default_property_dtype(),
            feature_attr: default_feature_attr(),
            label_attr: default_label_attr(),
            device: Device::default(),
        }
    }
}

impl StoreConfig {
    /// Reads `HETERO_STORE_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(policy) = parse_env::<RenumberPolicy>("HETERO_STORE_RENUMBER") {
            config.renumber = policy;
        }
        if let Some(dtype) = parse_env::<DType>("HETERO_STORE_VERTEX_DTYPE") {
            config.vertex_dtype = dtype;
        }
        if let Some(dtype) = parse_env::<DType>("HETERO_STORE_PROPERTY_DTYPE") {
            config.property_dtype = dtype;
        }
        if let Ok(name) = std::env::var("HETERO_STORE_FEATURE_ATTR") {
            config.feature_attr = name;
        }
        if let Ok(name) = std::env::var("HETERO_STORE_LABEL_ATTR") {
            config.label_attr = name;
        }
        config
    }

    pub fn with_renumber(mut self, renumber: RenumberPolicy) -> Self {
        self.renumber = renumber;
        self
    }

    pub fn with_vertex_dtype(mut self, dtype: DType) -> Self {
        self.vertex_dtype = dtype;
        self
    }
}

fn parse_env<T: FromStr<Err = String>>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "ignoring unparsable setting");
            None
        }
    }
}
