//! Feature accessor: the feature-store half of [`HeteroStore`].

use crate::store::HeteroStore;
use hetero_types::{
    FeatureStore, Field, NumericBackend, PropertyGraph, StoreError, Tensor, TensorAttr,
};
use std::collections::HashMap;

impl<G, B> HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    fn infer_unspecified_attr(&self, attr: TensorAttr) -> Result<TensorAttr, StoreError> {
        self.tensor_attrs.infer(attr)
    }

    /// Rows of `attr.index` (the whole group when `Value(None)`), in index order.
    fn fetch_tensor(&self, attr: &TensorAttr) -> Result<Tensor, StoreError> {
        let group = attr.group();
        let properties = attr
            .properties
            .value()
            .cloned()
            .flatten()
            .ok_or_else(|| StoreError::Value(format!("{} names no properties", attr)))?;

        let index = match attr.index.value() {
            Some(Some(ids)) => ids.clone(),
            _ => match group {
                Some(g) => self.offsets.ids_of(g)?,
                None => (0..self.offsets.total()).collect(),
            },
        };

        let single_type = self.offsets.len() == 1;
        let types = match group {
            _ if single_type => None,
            Some(g) => Some(vec![g.to_string()]),
            None => None,
        };
        // The feature tensor spans most columns; fetch them all and project.
        let columns = if attr.name() == Some(self.config.feature_attr.as_str()) {
            None
        } else {
            Some(properties.clone())
        };

        let deferred = self
            .graph
            .get_vertex_data(Some(index.as_slice()), types.as_deref(), columns.as_deref())?;
        if !deferred.is_ready() {
            tracing::debug!(attr = %attr, rows = index.len(), "forcing vertex data");
        }
        let frame = deferred.force()?;

        // Storage order is arbitrary; map each requested id to its row.
        let vertex_col = self.graph.vertex_col_name();
        let stored_ids = frame.column(vertex_col)?.as_i64().ok_or_else(|| {
            StoreError::Internal(format!("column {} does not hold vertex ids", vertex_col))
        })?;
        let row_of: HashMap<i64, usize> = stored_ids
            .iter()
            .enumerate()
            .map(|(row, &id)| (id, row))
            .collect();
        let rows = index
            .iter()
            .map(|id| {
                row_of.get(id).copied().ok_or_else(|| {
                    StoreError::Lookup(format!(
                        "vertex {} has no row in group {}",
                        id,
                        group.unwrap_or("<none>")
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let projected = frame.select(&properties)?.take(&rows);
        let mut tensor = self.backend.from_frame(projected)?;
        if let Some(Some(dtype)) = attr.dtype.value() {
            tensor = self.backend.cast(tensor, *dtype)?;
        }
        Ok(self.backend.to_device(tensor))
    }
}

impl<G, B> FeatureStore for HeteroStore<G, B>
where
    G: PropertyGraph,
    B: NumericBackend,
{
    fn get_tensor(&self, attr: TensorAttr) -> Result<Tensor, StoreError> {
        let attr = self.infer_unspecified_attr(attr)?;
        if !attr.is_fully_specified() {
            return Err(StoreError::Value(format!(
                "{} is not fully specified; unset fields: {}",
                attr,
                attr.unset_fields().join(", ")
            )));
        }
        self.fetch_tensor(&attr)
    }

    fn multi_get_tensor(&self, attrs: Vec<TensorAttr>) -> Result<Vec<Tensor>, StoreError> {
        let attrs = attrs
            .into_iter()
            .map(|a| self.infer_unspecified_attr(a))
            .collect::<Result<Vec<_>, _>>()?;
        let bad: Vec<String> = attrs
            .iter()
            .filter(|a| !a.is_fully_specified())
            .map(|a| a.to_string())
            .collect();
        if !bad.is_empty() {
            return Err(StoreError::Value(format!(
                "tensor attributes [{}] are not fully specified",
                bad.join(", ")
            )));
        }
        attrs.iter().map(|a| self.fetch_tensor(a)).collect()
    }

    fn get_tensor_size(&self, mut attr: TensorAttr) -> Result<Vec<usize>, StoreError> {
        if !attr.index.is_set() {
            attr.index = Field::Value(None);
        }
        Ok(self.get_tensor(attr)?.shape().to_vec())
    }

    fn get_all_tensor_attrs(&self) -> Vec<TensorAttr> {
        self.tensor_attrs.all()
    }

    fn put_tensor(&self, _tensor: Tensor, attr: TensorAttr) -> Result<(), StoreError> {
        Err(StoreError::NotImplemented(format!(
            "adding properties is not supported ({})",
            attr
        )))
    }

    fn remove_tensor(&self, attr: TensorAttr) -> Result<(), StoreError> {
        Err(StoreError::NotImplemented(format!(
            "removing features is not supported ({})",
            attr
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hetero_graph::{InMemoryPropertyGraph, PartitionedPropertyGraph};
    use hetero_tensor::CpuBackend;
    use hetero_types::{DType, RenumberPolicy, StoreConfig, VertexRecord};
    use serde_json::json;

    fn graph() -> InMemoryPropertyGraph {
        let g = InMemoryPropertyGraph::new();
        let authors: Vec<VertexRecord> = (0..3)
            .map(|i| {
                VertexRecord::new(i)
                    .with_property("x1", json!(i as f64))
                    .with_property("x2", json!(10.0 * i as f64))
                    .with_property("y", json!(i % 2))
            })
            .collect();
        g.add_vertices("author", &authors).unwrap();
        let papers: Vec<VertexRecord> = (3..6)
            .map(|i| {
                VertexRecord::new(i)
                    .with_property("x1", json!(i as f64))
                    .with_property("x2", json!(10.0 * i as f64))
                    .with_property("y", json!(i % 2))
            })
            .collect();
        g.add_vertices("paper", &papers).unwrap();
        g
    }

    fn keep() -> StoreConfig {
        StoreConfig::default().with_renumber(RenumberPolicy::Keep)
    }

    #[test]
    fn rows_follow_index_order() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let t = store
            .get_tensor(TensorAttr::new(Some("paper"), "x").with_index(vec![5, 3, 5]))
            .unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.dtype(), DType::Float32);
        assert_eq!(t.to_f64_vec(), vec![5.0, 50.0, 3.0, 30.0, 5.0, 50.0]);
    }

    #[test]
    fn partitioned_rows_are_reordered() {
        let pg = PartitionedPropertyGraph::new(graph(), 2);
        let store = HeteroStore::new(pg.clone(), CpuBackend::new(), keep()).unwrap();
        let t = store
            .get_tensor(TensorAttr::new(Some("author"), "y").with_index(vec![2, 1, 0]))
            .unwrap();
        assert_eq!(t.dtype(), DType::Int64);
        assert_eq!(t.to_i64_vec(), vec![0, 1, 0]);
        assert!(pg.force_count() > 0);
    }

    #[test]
    fn index_outside_group_is_lookup() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let err = store
            .get_tensor(TensorAttr::new(Some("paper"), "x").with_index(vec![0]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Lookup(_)));
    }

    #[test]
    fn unset_index_is_value_error() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let err = store.get_tensor(TensorAttr::new(Some("paper"), "x")).unwrap_err();
        assert!(matches!(err, StoreError::Value(ref m) if m.contains("index")));
    }

    #[test]
    fn size_defaults_to_whole_group() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let size = store.get_tensor_size(TensorAttr::new(Some("author"), "x")).unwrap();
        assert_eq!(size, vec![3, 2]);
        let size = store.get_tensor_size(TensorAttr::new(Some("author"), "y")).unwrap();
        assert_eq!(size, vec![3, 1]);
    }

    #[test]
    fn multi_get_checks_every_attr_first() {
        let pg = PartitionedPropertyGraph::new(graph(), 2);
        let store = HeteroStore::new(pg.clone(), CpuBackend::new(), keep()).unwrap();
        let before = pg.force_count();
        let err = store
            .multi_get_tensor(vec![
                TensorAttr::new(Some("author"), "x").with_index(vec![0]),
                TensorAttr::new(Some("paper"), "x"),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::Value(_)));
        assert_eq!(pg.force_count(), before);

        let tensors = store
            .multi_get_tensor(vec![
                TensorAttr::new(Some("author"), "x").with_index(vec![1]),
                TensorAttr::new(Some("paper"), "y").with_index(vec![4, 3]),
            ])
            .unwrap();
        assert_eq!(tensors[0].to_f64_vec(), vec![1.0, 10.0]);
        assert_eq!(tensors[1].to_i64_vec(), vec![0, 1]);
    }

    #[test]
    fn explicit_properties_and_dtype() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let t = store
            .get_tensor(
                TensorAttr::new(Some("paper"), "x")
                    .with_index(vec![4])
                    .with_properties(["x2"])
                    .with_dtype(DType::Float64),
            )
            .unwrap();
        assert_eq!(t.shape(), &[1, 1]);
        assert_eq!(t.dtype(), DType::Float64);
        assert_eq!(t.to_f64_vec(), vec![40.0]);
    }

    #[test]
    fn repeated_properties_repeat_columns() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let t = store
            .get_tensor(
                TensorAttr::new(Some("author"), "x")
                    .with_index(vec![2, 1])
                    .with_properties(["x1", "x2", "x1"]),
            )
            .unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.to_f64_vec(), vec![2.0, 20.0, 2.0, 1.0, 10.0, 1.0]);

        let y = store
            .get_tensor(
                TensorAttr::new(Some("author"), "y")
                    .with_index(vec![2, 1])
                    .with_properties(["y", "y"]),
            )
            .unwrap();
        assert_eq!(y.shape(), &[2, 2]);
        assert_eq!(y.to_i64_vec(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn writes_are_not_implemented() {
        let store = HeteroStore::new(graph(), CpuBackend::new(), keep()).unwrap();
        let attr = TensorAttr::new(Some("paper"), "x");
        assert!(matches!(
            store.put_tensor(Tensor::from_f32(vec![1.0]), attr.clone()),
            Err(StoreError::NotImplemented(_))
        ));
        assert!(matches!(
            store.remove_tensor(attr),
            Err(StoreError::NotImplemented(_))
        ));
    }
}
