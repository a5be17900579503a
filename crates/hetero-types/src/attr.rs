//! Edge and tensor attribute descriptors.

use crate::{DType, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical layout of an edge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLayout {
    #[default]
    Coo,
    Csc,
    Csr,
}

impl EdgeLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLayout::Coo => "coo",
            EdgeLayout::Csc => "csc",
            EdgeLayout::Csr => "csr",
        }
    }
}

impl fmt::Display for EdgeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `(src_type, edge_type, dst_type)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PygEdgeType {
    pub src_type: String,
    pub edge_type: String,
    pub dst_type: String,
}

impl PygEdgeType {
    pub fn new(
        src_type: impl Into<String>,
        edge_type: impl Into<String>,
        dst_type: impl Into<String>,
    ) -> Self {
        Self {
            src_type: src_type.into(),
            edge_type: edge_type.into(),
            dst_type: dst_type.into(),
        }
    }
}

impl fmt::Display for PygEdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.src_type, self.edge_type, self.dst_type)
    }
}

impl From<(&str, &str, &str)> for PygEdgeType {
    fn from((src, edge, dst): (&str, &str, &str)) -> Self {
        Self::new(src, edge, dst)
    }
}

/// Edge type as a caller names it: the bare store name or the full triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeTypeKey {
    Name(String),
    Triple(PygEdgeType),
}

impl EdgeTypeKey {
    /// Store-level edge type name (the middle element of a triple).
    pub fn edge_type_name(&self) -> &str {
        match self {
            EdgeTypeKey::Name(name) => name,
            EdgeTypeKey::Triple(t) => &t.edge_type,
        }
    }
}

impl fmt::Display for EdgeTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeTypeKey::Name(name) => f.write_str(name),
            EdgeTypeKey::Triple(t) => t.fmt(f),
        }
    }
}

impl From<&str> for EdgeTypeKey {
    fn from(name: &str) -> Self {
        EdgeTypeKey::Name(name.to_string())
    }
}

impl From<String> for EdgeTypeKey {
    fn from(name: String) -> Self {
        EdgeTypeKey::Name(name)
    }
}

impl From<PygEdgeType> for EdgeTypeKey {
    fn from(t: PygEdgeType) -> Self {
        EdgeTypeKey::Triple(t)
    }
}

impl From<(&str, &str, &str)> for EdgeTypeKey {
    fn from(t: (&str, &str, &str)) -> Self {
        EdgeTypeKey::Triple(t.into())
    }
}

/// Attributes of one edge index in the graph store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAttr {
    pub edge_type: EdgeTypeKey,
    #[serde(default)]
    pub layout: EdgeLayout,
    /// Whether the index is sorted by destination. Only meaningful for COO.
    #[serde(default)]
    pub is_sorted: bool,
    /// `(rows, cols)` extent, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<(usize, usize)>,
}

impl EdgeAttr {
    pub fn new(edge_type: impl Into<EdgeTypeKey>, layout: EdgeLayout) -> Self {
        Self {
            edge_type: edge_type.into(),
            layout,
            is_sorted: false,
            size: None,
        }
    }

    pub fn coo(edge_type: impl Into<EdgeTypeKey>) -> Self {
        Self::new(edge_type, EdgeLayout::Coo)
    }

    pub fn sorted(mut self, is_sorted: bool) -> Self {
        self.is_sorted = is_sorted;
        self
    }

    pub fn with_size(mut self, rows: usize, cols: usize) -> Self {
        self.size = Some((rows, cols));
        self
    }

    /// The triple, when this attr carries one.
    pub fn pyg_edge_type(&self) -> Option<&PygEdgeType> {
        match &self.edge_type {
            EdgeTypeKey::Triple(t) => Some(t),
            EdgeTypeKey::Name(_) => None,
        }
    }
}

impl<K: Into<EdgeTypeKey>> From<(K, EdgeLayout)> for EdgeAttr {
    fn from((edge_type, layout): (K, EdgeLayout)) -> Self {
        Self::new(edge_type, layout)
    }
}

/// COO edge index returned by the graph store.
///
/// Only COO requests are served, so `layout` is always `Coo`; `is_sorted`
/// echoes the request.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeIndex {
    pub src: Tensor,
    pub dst: Tensor,
    pub layout: EdgeLayout,
    pub is_sorted: bool,
}

impl EdgeIndex {
    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// A tensor attribute field that may be left unset so it can be inferred.
///
/// `Unset` is distinct from `Value(None)`: the latter is an explicit "no value".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field<T> {
    #[default]
    Unset,
    Value(T),
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Unset => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Unset => None,
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(v: T) -> Self {
        Field::Value(v)
    }
}

/// Identifies one feature tensor: which vertex group, which named tensor,
/// which rows, built from which property columns, in which dtype.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TensorAttr {
    /// Vertex type the tensor belongs to. `None` for a homogeneous graph.
    #[serde(default)]
    pub group_name: Field<Option<String>>,
    #[serde(default)]
    pub attr_name: Field<Option<String>>,
    /// Global vertex ids the output rows correspond to, in output order.
    #[serde(default)]
    pub index: Field<Option<Vec<i64>>>,
    /// Property columns composing the tensor, in column order.
    #[serde(default)]
    pub properties: Field<Option<Vec<String>>>,
    #[serde(default)]
    pub dtype: Field<Option<DType>>,
}

impl TensorAttr {
    pub fn new(group_name: Option<&str>, attr_name: &str) -> Self {
        Self {
            group_name: Field::Value(group_name.map(str::to_string)),
            attr_name: Field::Value(Some(attr_name.to_string())),
            ..Default::default()
        }
    }

    pub fn with_index(mut self, index: Vec<i64>) -> Self {
        self.index = Field::Value(Some(index));
        self
    }

    pub fn with_properties<S: Into<String>>(mut self, properties: impl IntoIterator<Item = S>) -> Self {
        self.properties = Field::Value(Some(properties.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = Field::Value(Some(dtype));
        self
    }

    pub fn group(&self) -> Option<&str> {
        self.group_name.value().and_then(|g| g.as_deref())
    }

    pub fn name(&self) -> Option<&str> {
        self.attr_name.value().and_then(|n| n.as_deref())
    }

    /// Names of fields still holding `Unset`.
    pub fn unset_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.group_name.is_set() {
            out.push("group_name");
        }
        if !self.attr_name.is_set() {
            out.push("attr_name");
        }
        if !self.index.is_set() {
            out.push("index");
        }
        if !self.properties.is_set() {
            out.push("properties");
        }
        if !self.dtype.is_set() {
            out.push("dtype");
        }
        out
    }

    pub fn is_fully_specified(&self) -> bool {
        self.unset_fields().is_empty()
    }

    /// Sets every `Unset` field to `Value(None)`.
    pub fn fully_specify(mut self) -> Self {
        if !self.group_name.is_set() {
            self.group_name = Field::Value(None);
        }
        if !self.attr_name.is_set() {
            self.attr_name = Field::Value(None);
        }
        if !self.index.is_set() {
            self.index = Field::Value(None);
        }
        if !self.properties.is_set() {
            self.properties = Field::Value(None);
        }
        if !self.dtype.is_set() {
            self.dtype = Field::Value(None);
        }
        self
    }

    /// Copies every set field of `other` into `self`.
    pub fn update(&mut self, other: &TensorAttr) {
        if other.group_name.is_set() {
            self.group_name = other.group_name.clone();
        }
        if other.attr_name.is_set() {
            self.attr_name = other.attr_name.clone();
        }
        if other.index.is_set() {
            self.index = other.index.clone();
        }
        if other.properties.is_set() {
            self.properties = other.properties.clone();
        }
        if other.dtype.is_set() {
            self.dtype = other.dtype.clone();
        }
    }
}

impl fmt::Display for TensorAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = match &self.group_name {
            Field::Unset => "<unset>",
            Field::Value(None) => "<none>",
            Field::Value(Some(g)) => g.as_str(),
        };
        let name = match &self.attr_name {
            Field::Unset => "<unset>",
            Field::Value(None) => "<none>",
            Field::Value(Some(n)) => n.as_str(),
        };
        write!(f, "TensorAttr({group}, {name})")
    }
}

impl From<(&str, &str)> for TensorAttr {
    fn from((group, name): (&str, &str)) -> Self {
        TensorAttr::new(Some(group), name)
    }
}

impl From<(&str, &str, Vec<i64>)> for TensorAttr {
    fn from((group, name, index): (&str, &str, Vec<i64>)) -> Self {
        TensorAttr::new(Some(group), name).with_index(index)
    }
}
