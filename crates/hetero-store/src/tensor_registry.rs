//! Registered tensor descriptors and inference of unset fields.

use hetero_types::{DType, Field, StoreError, TensorAttr};
use std::collections::BTreeMap;

/// Tensor descriptors grouped by vertex type, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorAttrRegistry {
    groups: BTreeMap<String, Vec<TensorAttr>>,
}

impl TensorAttrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `attr_name` for `vertex_type`, composed of `properties`.
    pub fn register(
        &mut self,
        vertex_type: &str,
        attr_name: &str,
        properties: Vec<String>,
        dtype: DType,
    ) {
        let attr = TensorAttr::new(Some(vertex_type), attr_name)
            .with_properties(properties)
            .with_dtype(dtype);
        self.groups
            .entry(vertex_type.to_string())
            .or_default()
            .push(attr);
    }

    /// Registers the default feature tensor for every vertex type, plus the
    /// label tensor when `property_names` holds `label_attr`.
    pub fn infer_defaults(
        vertex_types: &[String],
        property_names: &[String],
        feature_attr: &str,
        label_attr: &str,
        property_dtype: DType,
        label_dtype: DType,
    ) -> Self {
        let has_label = property_names.iter().any(|p| p == label_attr);
        let features: Vec<String> = property_names
            .iter()
            .filter(|p| *p != label_attr)
            .cloned()
            .collect();

        let mut registry = Self::new();
        for vertex_type in vertex_types {
            if has_label {
                registry.register(vertex_type, label_attr, vec![label_attr.to_string()], label_dtype);
            }
            registry.register(vertex_type, feature_attr, features.clone(), property_dtype);
        }
        registry
    }

    /// The registered descriptor matching `group` and `attr_name`.
    pub fn find(&self, group: &str, attr_name: &str) -> Option<&TensorAttr> {
        self.groups
            .get(group)?
            .iter()
            .rev()
            .find(|a| a.name() == Some(attr_name))
    }

    /// Fills unset `properties` and `dtype` from the matching registration.
    ///
    /// Fails with `Lookup` when a field needs inferring and no registration
    /// matches the group or the attribute name.
    pub fn infer(&self, mut attr: TensorAttr) -> Result<TensorAttr, StoreError> {
        if attr.properties.is_set() && attr.dtype.is_set() {
            return Ok(attr);
        }
        let group = match &attr.group_name {
            Field::Value(Some(g)) if self.groups.contains_key(g) => g.clone(),
            Field::Value(Some(g)) => {
                return Err(StoreError::Lookup(format!("invalid group name {}", g)))
            }
            _ => {
                return Err(StoreError::Lookup(format!(
                    "cannot infer {} without a group name",
                    attr
                )))
            }
        };
        let name = attr.name().ok_or_else(|| {
            StoreError::Lookup(format!("cannot infer {} without an attribute name", attr))
        })?;
        let registered = self.find(&group, name).ok_or_else(|| {
            StoreError::Lookup(format!("no tensor {} registered for group {}", name, group))
        })?;

        if !attr.properties.is_set() {
            attr.properties = registered.properties.clone();
        }
        if !attr.dtype.is_set() {
            attr.dtype = registered.dtype.clone();
        }
        Ok(attr)
    }

    /// Every registered descriptor, grouped by vertex type.
    pub fn all(&self) -> Vec<TensorAttr> {
        self.groups.values().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
