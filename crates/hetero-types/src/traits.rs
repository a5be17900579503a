//! Traits for the property-graph and numeric-backend collaborators, and the
//! store interfaces the mini-batch layer depends on.

use crate::{
    Column, DType, Deferred, Device, EdgeAttr, EdgeGroups, EdgeIndex, EdgeLayout, EdgeSelection,
    Frame, NoiIndex, SampleResult, StructuralGraph, SubgraphOptions, Tensor, TensorAttr,
    TypeRange,
};

/// Property graph holding typed vertices and edges with property columns.
///
/// Frames returned for vertices carry the vertex id and type columns first;
/// frames for edges carry edge id, source, destination, and type first.
/// Row order follows storage, not the order of any requested ids.
pub trait PropertyGraph: Send + Sync {
    fn vertex_col_name(&self) -> &str;

    fn edge_id_col_name(&self) -> &str;

    fn src_col_name(&self) -> &str;

    fn dst_col_name(&self) -> &str;

    fn type_col_name(&self) -> &str;

    /// Vertex type names, sorted.
    fn vertex_types(&self) -> Vec<String>;

    /// Edge type names, sorted; `None` marks edges loaded without a type.
    fn edge_types(&self) -> Vec<Option<String>>;

    /// Union of vertex property names across all types, sorted.
    fn vertex_property_names(&self) -> Vec<String>;

    /// Vertex count of one type, or of the whole graph.
    fn num_vertices(&self, vertex_type: Option<&str>) -> Result<usize, GraphError>;

    /// Vertex rows filtered by id and/or type. `columns: None` returns every property.
    fn get_vertex_data(
        &self,
        vertex_ids: Option<&[i64]>,
        types: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Deferred<Frame>, GraphError>;

    /// Edge rows filtered by edge id and/or type. `columns: None` returns every property.
    fn get_edge_data(
        &self,
        edge_ids: Option<&[i64]>,
        types: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Deferred<Frame>, GraphError>;

    /// Reassigns vertex ids so each type is contiguous; returns the ranges
    /// sorted by start. Old ids are kept in `prev_id_column` when given.
    fn renumber_vertices_by_type(
        &self,
        prev_id_column: Option<&str>,
    ) -> Result<Vec<TypeRange>, GraphError>;

    /// Reassigns edge ids so each type is contiguous.
    fn renumber_edges_by_type(
        &self,
        prev_id_column: Option<&str>,
    ) -> Result<Vec<TypeRange>, GraphError>;

    /// Decodes edge type numerals (as emitted by samplers) into type names.
    fn edge_types_from_numerals(&self, numerals: &[i32]) -> Result<Vec<String>, GraphError>;

    /// Selects every edge whose type is one of `edge_types`.
    fn select_edges(&self, edge_types: &[String]) -> Result<EdgeSelection, GraphError>;

    fn extract_subgraph(
        &self,
        selection: &EdgeSelection,
        options: &SubgraphOptions,
    ) -> Result<StructuralGraph, GraphError>;
}

/// Side of the insertion point returned by [`NumericBackend::searchsorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSide {
    /// First index `i` with `haystack[i] >= needle`.
    Left,
    /// First index `i` with `haystack[i] > needle`.
    Right,
}

/// Array backend that owns tensor layout, dtype conversion, and residency.
pub trait NumericBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Device tensors are placed on by [`NumericBackend::to_device`].
    fn device(&self) -> Device;

    /// Wraps a numeric column as a 1-D tensor, taking over its buffer.
    fn from_column(&self, column: Column) -> Result<Tensor, BackendError>;

    /// Converts a frame of numeric columns into a `[rows, cols]` tensor.
    fn from_frame(&self, frame: Frame) -> Result<Tensor, BackendError>;

    fn cast(&self, tensor: Tensor, dtype: DType) -> Result<Tensor, BackendError>;

    /// Insertion points of `needles` in the ascending `haystack`.
    fn searchsorted(&self, haystack: &[i64], needles: &[i64], side: SearchSide) -> Vec<usize>;

    /// Concatenates along the first dimension; dtypes must agree.
    fn concatenate(&self, tensors: &[Tensor]) -> Result<Tensor, BackendError>;

    /// `start..end` as a 1-D tensor of an integer dtype.
    fn arange(&self, start: i64, end: i64, dtype: DType) -> Result<Tensor, BackendError>;

    fn to_device(&self, tensor: Tensor) -> Tensor;

    fn is_resident(&self, tensor: &Tensor) -> bool {
        tensor.device() == self.device()
    }
}

/// Edge-index half of the store interface.
pub trait GraphStore: Send + Sync {
    /// COO edge index of one edge type.
    fn get_edge_index(&self, attr: EdgeAttr) -> Result<EdgeIndex, StoreError>;

    /// Descriptors of every edge type in the store.
    fn get_all_edge_attrs(&self) -> Vec<EdgeAttr>;

    /// Always fails: the store is read-only.
    fn put_edge_index(&self, edge_index: EdgeIndex, attr: EdgeAttr) -> Result<(), StoreError>;
}

/// Feature half of the store interface.
pub trait FeatureStore: Send + Sync {
    /// Feature rows for `attr.index`, in index order.
    fn get_tensor(&self, attr: TensorAttr) -> Result<Tensor, StoreError>;

    /// All-or-nothing batch form of [`FeatureStore::get_tensor`].
    fn multi_get_tensor(&self, attrs: Vec<TensorAttr>) -> Result<Vec<Tensor>, StoreError>;

    fn get_tensor_size(&self, attr: TensorAttr) -> Result<Vec<usize>, StoreError>;

    fn get_all_tensor_attrs(&self) -> Vec<TensorAttr>;

    /// Always fails: the store is read-only.
    fn put_tensor(&self, tensor: Tensor, attr: TensorAttr) -> Result<(), StoreError>;

    /// Always fails: the store is read-only.
    fn remove_tensor(&self, attr: TensorAttr) -> Result<(), StoreError>;
}

/// Per-batch renumbering of sampler output into type-local ids.
pub trait SampleRenumber: Send + Sync {
    fn group_nodes_of_interest(&self, global_ids: &[i64]) -> Result<NoiIndex, StoreError>;

    /// Returns `(row_dict, col_dict)`.
    fn renumber_sampled_edges(
        &self,
        sample: &SampleResult,
        noi_index: &NoiIndex,
    ) -> Result<(EdgeGroups, EdgeGroups), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown vertex id: {0}")]
    UnknownVertex(i64),
    #[error("unknown vertex type: {0}")]
    UnknownVertexType(String),
    #[error("unknown edge type: {0}")]
    UnknownEdgeType(String),
    #[error("unknown edge type numeral: {0}")]
    UnknownEdgeTypeNumeral(i32),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column {column} has {actual} rows, expected {expected}")]
    ColumnLength {
        column: String,
        actual: usize,
        expected: usize,
    },
    #[error("deferred evaluation failed: {0}")]
    Deferred(String),
    #[error("graph error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("dtype mismatch: expected {expected}, found {found}")]
    DTypeMismatch { expected: DType, found: DType },
    #[error("shape error: {0}")]
    Shape(String),
    #[error("column {0} is not numeric")]
    NonNumericColumn(String),
    #[error("value {value} does not fit in {dtype}")]
    OutOfRange { value: String, dtype: DType },
    #[error("backend error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("construction error: {0}")]
    Construction(String),
    #[error("lookup error: {0}")]
    Lookup(String),
    #[error("unsupported layout {0}: only COO direct access is supported")]
    UnsupportedLayout(EdgeLayout),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("value error: {0}")]
    Value(String),
    #[error("consistency error: {0}")]
    Consistency(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("graph: {0}")]
    Graph(#[from] GraphError),
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
}
