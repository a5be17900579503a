//! In-memory property graph with typed vertices and edges.

use hetero_types::{
    Column, Deferred, EdgeRecord, EdgeSelection, Frame, GraphError, PropertyGraph,
    StructuralGraph, SubgraphOptions, TypeRange, VertexRecord,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const VERTEX_COL: &str = "_VERTEX_";
pub const EDGE_ID_COL: &str = "_EDGE_ID_";
pub const SRC_COL: &str = "_SRC_";
pub const DST_COL: &str = "_DST_";
pub const TYPE_COL: &str = "_TYPE_";

#[derive(Debug, Clone)]
struct VertexRow {
    vertex_type: String,
    properties: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
struct EdgeRow {
    src: i64,
    dst: i64,
    edge_type: Option<String>,
    properties: HashMap<String, Value>,
}

#[derive(Debug, Default)]
struct Tables {
    /// vertex_id -> row, iterated in id order.
    vertices: BTreeMap<i64, VertexRow>,
    /// edge_id -> row, iterated in id order.
    edges: BTreeMap<i64, EdgeRow>,
    next_edge_id: i64,
}

impl Tables {
    fn named_edge_types(&self) -> Vec<String> {
        self.edges
            .values()
            .filter_map(|e| e.edge_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn vertex_property_names(&self) -> Vec<String> {
        self.vertices
            .values()
            .flat_map(|v| v.properties.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn edge_property_names(&self) -> Vec<String> {
        self.edges
            .values()
            .flat_map(|e| e.properties.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Property graph held in host memory.
///
/// Cloning is cheap and yields a handle onto the same tables. Vertex and edge
/// rows are returned in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPropertyGraph {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, GraphError> {
        self.tables
            .read()
            .map_err(|e| GraphError::Other(format!("failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, GraphError> {
        self.tables
            .write()
            .map_err(|e| GraphError::Other(format!("failed to acquire lock: {}", e)))
    }

    /// Adds vertices of one type. Re-adding a vertex merges its properties;
    /// re-adding it under another type is an error.
    pub fn add_vertices(
        &self,
        vertex_type: &str,
        records: &[VertexRecord],
    ) -> Result<(), GraphError> {
        let mut t = self.write()?;
        for record in records {
            if let Some(existing) = t.vertices.get(&record.id) {
                if existing.vertex_type != vertex_type {
                    return Err(GraphError::Other(format!(
                        "vertex {} already has type {}",
                        record.id, existing.vertex_type
                    )));
                }
            }
        }
        for record in records {
            let row = t.vertices.entry(record.id).or_insert_with(|| VertexRow {
                vertex_type: vertex_type.to_string(),
                properties: HashMap::new(),
            });
            for (k, v) in &record.properties {
                row.properties.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    /// Adds edges of one type (`None` for untyped). Both endpoints must exist.
    pub fn add_edges(
        &self,
        edge_type: Option<&str>,
        records: &[EdgeRecord],
    ) -> Result<(), GraphError> {
        let mut t = self.write()?;
        for record in records {
            for id in [record.src, record.dst] {
                if !t.vertices.contains_key(&id) {
                    return Err(GraphError::UnknownVertex(id));
                }
            }
        }
        for record in records {
            let id = t.next_edge_id;
            t.next_edge_id += 1;
            t.edges.insert(
                id,
                EdgeRow {
                    src: record.src,
                    dst: record.dst,
                    edge_type: edge_type.map(str::to_string),
                    properties: record.properties.clone(),
                },
            );
        }
        Ok(())
    }

    /// Numeral a sampler uses for `edge_type`: its position among the sorted
    /// named edge types.
    pub fn edge_type_numeral(&self, edge_type: &str) -> Result<i32, GraphError> {
        let t = self.read()?;
        t.named_edge_types()
            .iter()
            .position(|n| n == edge_type)
            .map(|p| p as i32)
            .ok_or_else(|| GraphError::UnknownEdgeType(edge_type.to_string()))
    }

    pub fn num_edges(&self) -> Result<usize, GraphError> {
        Ok(self.read()?.edges.len())
    }

    fn resolve_columns(
        requested: Option<&[String]>,
        available: Vec<String>,
        fixed: &[&str],
    ) -> Result<Vec<String>, GraphError> {
        match requested {
            None => Ok(available),
            Some(cols) => {
                let mut out = Vec::with_capacity(cols.len());
                for c in cols {
                    if fixed.contains(&c.as_str()) || out.contains(c) {
                        continue;
                    }
                    if !available.contains(c) {
                        return Err(GraphError::UnknownColumn(c.clone()));
                    }
                    out.push(c.clone());
                }
                Ok(out)
            }
        }
    }
}

fn value_as_int(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_bool().map(i64::from))
}

fn value_as_float(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_bool().map(|b| f64::from(u8::from(b))))
}

/// Builds a typed column from optional JSON values.
///
/// All-string columns become `Utf8`; complete integer columns stay `Int64`;
/// anything else numeric becomes `Float64` with NaN for missing values.
fn build_column(name: &str, values: Vec<Option<&Value>>) -> Result<Column, GraphError> {
    let present: Vec<&Value> = values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| !v.is_null())
        .collect();

    if !present.is_empty() && present.iter().all(|v| v.is_string()) {
        return Ok(Column::Utf8(
            values
                .iter()
                .map(|v| v.and_then(Value::as_str).unwrap_or_default().to_string())
                .collect(),
        ));
    }

    if let Some(bad) = present.iter().find(|v| value_as_float(v).is_none()) {
        return Err(GraphError::Other(format!(
            "column {} mixes non-numeric value {}",
            name, bad
        )));
    }

    let ints: Vec<i64> = present.iter().filter_map(|v| value_as_int(v)).collect();
    if !values.is_empty() && ints.len() == values.len() {
        return Ok(Column::Int64(ints));
    }

    Ok(Column::Float64(
        values
            .iter()
            .map(|v| {
                v.filter(|v| !v.is_null())
                    .and_then(value_as_float)
                    .unwrap_or(f64::NAN)
            })
            .collect(),
    ))
}

impl PropertyGraph for InMemoryPropertyGraph {
    fn vertex_col_name(&self) -> &str {
        VERTEX_COL
    }

    fn edge_id_col_name(&self) -> &str {
        EDGE_ID_COL
    }

    fn src_col_name(&self) -> &str {
        SRC_COL
    }

    fn dst_col_name(&self) -> &str {
        DST_COL
    }

    fn type_col_name(&self) -> &str {
        TYPE_COL
    }

    fn vertex_types(&self) -> Vec<String> {
        match self.read() {
            Ok(t) => t
                .vertices
                .values()
                .map(|v| v.vertex_type.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn edge_types(&self) -> Vec<Option<String>> {
        match self.read() {
            Ok(t) => t
                .edges
                .values()
                .map(|e| e.edge_type.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn vertex_property_names(&self) -> Vec<String> {
        self.read()
            .map(|t| t.vertex_property_names())
            .unwrap_or_default()
    }

    fn num_vertices(&self, vertex_type: Option<&str>) -> Result<usize, GraphError> {
        let t = self.read()?;
        match vertex_type {
            None => Ok(t.vertices.len()),
            Some(vt) => {
                let n = t.vertices.values().filter(|v| v.vertex_type == vt).count();
                if n == 0 {
                    return Err(GraphError::UnknownVertexType(vt.to_string()));
                }
                Ok(n)
            }
        }
    }

    fn get_vertex_data(
        &self,
        vertex_ids: Option<&[i64]>,
        types: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Deferred<Frame>, GraphError> {
        let t = self.read()?;
        let rows: Vec<(i64, &VertexRow)> = match vertex_ids {
            Some(ids) => ids
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|id| t.vertices.get(&id).map(|r| (id, r)))
                .collect(),
            None => t.vertices.iter().map(|(id, r)| (*id, r)).collect(),
        };
        let rows: Vec<(i64, &VertexRow)> = match types {
            Some(types) => rows
                .into_iter()
                .filter(|(_, r)| types.contains(&r.vertex_type))
                .collect(),
            None => rows,
        };

        let props = Self::resolve_columns(columns, t.vertex_property_names(), &[VERTEX_COL, TYPE_COL])?;
        let mut frame = Frame::new();
        frame.push_column(VERTEX_COL, Column::Int64(rows.iter().map(|(id, _)| *id).collect()))?;
        frame.push_column(
            TYPE_COL,
            Column::Utf8(rows.iter().map(|(_, r)| r.vertex_type.clone()).collect()),
        )?;
        for p in &props {
            let values = rows.iter().map(|(_, r)| r.properties.get(p)).collect();
            frame.push_column(p.clone(), build_column(p, values)?)?;
        }
        Ok(Deferred::ready(frame))
    }

    fn get_edge_data(
        &self,
        edge_ids: Option<&[i64]>,
        types: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Deferred<Frame>, GraphError> {
        let t = self.read()?;
        let rows: Vec<(i64, &EdgeRow)> = match edge_ids {
            Some(ids) => ids
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|id| t.edges.get(&id).map(|r| (id, r)))
                .collect(),
            None => t.edges.iter().map(|(id, r)| (*id, r)).collect(),
        };
        let rows: Vec<(i64, &EdgeRow)> = match types {
            Some(types) => rows
                .into_iter()
                .filter(|(_, r)| r.edge_type.as_ref().is_some_and(|et| types.contains(et)))
                .collect(),
            None => rows,
        };

        let props = Self::resolve_columns(
            columns,
            t.edge_property_names(),
            &[EDGE_ID_COL, SRC_COL, DST_COL, TYPE_COL],
        )?;
        let mut frame = Frame::new();
        frame.push_column(EDGE_ID_COL, Column::Int64(rows.iter().map(|(id, _)| *id).collect()))?;
        frame.push_column(SRC_COL, Column::Int64(rows.iter().map(|(_, r)| r.src).collect()))?;
        frame.push_column(DST_COL, Column::Int64(rows.iter().map(|(_, r)| r.dst).collect()))?;
        frame.push_column(
            TYPE_COL,
            Column::Utf8(
                rows.iter()
                    .map(|(_, r)| r.edge_type.clone().unwrap_or_default())
                    .collect(),
            ),
        )?;
        for p in &props {
            let values = rows.iter().map(|(_, r)| r.properties.get(p)).collect();
            frame.push_column(p.clone(), build_column(p, values)?)?;
        }
        Ok(Deferred::ready(frame))
    }

    fn renumber_vertices_by_type(
        &self,
        prev_id_column: Option<&str>,
    ) -> Result<Vec<TypeRange>, GraphError> {
        let mut t = self.write()?;
        // Types keep the relative position of their smallest id, so a graph
        // that is already contiguous per type renumbers to itself.
        let mut first_id: HashMap<&str, i64> = HashMap::new();
        for (id, row) in &t.vertices {
            first_id.entry(row.vertex_type.as_str()).or_insert(*id);
        }
        let mut order: Vec<(i64, String, i64)> = t
            .vertices
            .iter()
            .map(|(id, r)| (first_id[r.vertex_type.as_str()], r.vertex_type.clone(), *id))
            .collect();
        order.sort();

        let mapping: HashMap<i64, i64> = order
            .iter()
            .enumerate()
            .map(|(new_id, (_, _, old_id))| (*old_id, new_id as i64))
            .collect();

        let old = std::mem::take(&mut t.vertices);
        for (old_id, mut row) in old {
            let new_id = *mapping.get(&old_id).ok_or(GraphError::UnknownVertex(old_id))?;
            if let Some(col) = prev_id_column {
                row.properties.insert(col.to_string(), Value::from(old_id));
            }
            t.vertices.insert(new_id, row);
        }
        for edge in t.edges.values_mut() {
            edge.src = *mapping.get(&edge.src).ok_or(GraphError::UnknownVertex(edge.src))?;
            edge.dst = *mapping.get(&edge.dst).ok_or(GraphError::UnknownVertex(edge.dst))?;
        }

        let mut ranges: Vec<TypeRange> = Vec::new();
        for (pos, (_, vertex_type, _)) in order.iter().enumerate() {
            match ranges.last_mut() {
                Some(last) if last.type_name == *vertex_type => last.end = pos as i64 + 1,
                _ => ranges.push(TypeRange::new(vertex_type.clone(), pos as i64, pos as i64 + 1)),
            }
        }
        Ok(ranges)
    }

    fn renumber_edges_by_type(
        &self,
        prev_id_column: Option<&str>,
    ) -> Result<Vec<TypeRange>, GraphError> {
        let mut t = self.write()?;
        let old = std::mem::take(&mut t.edges);
        let mut rows: Vec<(i64, EdgeRow)> = old.into_iter().collect();
        rows.sort_by(|(a_id, a), (b_id, b)| (&a.edge_type, a_id).cmp(&(&b.edge_type, b_id)));

        let mut ranges: Vec<TypeRange> = Vec::new();
        for (pos, (old_id, mut row)) in rows.into_iter().enumerate() {
            let new_id = pos as i64;
            let type_name = row.edge_type.clone().unwrap_or_default();
            match ranges.last_mut() {
                Some(last) if last.type_name == type_name => last.end = new_id + 1,
                _ => ranges.push(TypeRange::new(type_name, new_id, new_id + 1)),
            }
            if let Some(col) = prev_id_column {
                row.properties.insert(col.to_string(), Value::from(old_id));
            }
            t.edges.insert(new_id, row);
        }
        t.next_edge_id = t.edges.len() as i64;
        Ok(ranges)
    }

    fn edge_types_from_numerals(&self, numerals: &[i32]) -> Result<Vec<String>, GraphError> {
        let names = self.read()?.named_edge_types();
        numerals
            .iter()
            .map(|&n| {
                usize::try_from(n)
                    .ok()
                    .and_then(|i| names.get(i).cloned())
                    .ok_or(GraphError::UnknownEdgeTypeNumeral(n))
            })
            .collect()
    }

    fn select_edges(&self, edge_types: &[String]) -> Result<EdgeSelection, GraphError> {
        let t = self.read()?;
        let edge_ids = t
            .edges
            .iter()
            .filter(|(_, e)| e.edge_type.as_ref().is_some_and(|et| edge_types.contains(et)))
            .map(|(id, _)| *id)
            .collect();
        Ok(EdgeSelection { edge_ids })
    }

    fn extract_subgraph(
        &self,
        selection: &EdgeSelection,
        options: &SubgraphOptions,
    ) -> Result<StructuralGraph, GraphError> {
        let t = self.read()?;
        let named = t.named_edge_types();
        let mut sources = Vec::with_capacity(selection.edge_ids.len());
        let mut destinations = Vec::with_capacity(selection.edge_ids.len());
        let mut weights = Vec::with_capacity(selection.edge_ids.len());
        let mut seen = HashSet::new();

        for id in &selection.edge_ids {
            let edge = t
                .edges
                .get(id)
                .ok_or_else(|| GraphError::Other(format!("unknown edge id: {}", id)))?;
            if options.check_multi_edges && !seen.insert((edge.src, edge.dst)) {
                return Err(GraphError::Other(format!(
                    "multiple edges between {} and {}",
                    edge.src, edge.dst
                )));
            }
            let weight = match options.edge_weight_property.as_deref() {
                Some(TYPE_COL) => edge
                    .edge_type
                    .as_ref()
                    .and_then(|et| named.iter().position(|n| n == et))
                    .map(|p| p as f64),
                Some(prop) => edge.properties.get(prop).and_then(Value::as_f64),
                None => None,
            };
            sources.push(edge.src);
            destinations.push(edge.dst);
            weights.push(weight.unwrap_or(options.default_edge_weight));
        }

        let mut vertex_map = Vec::new();
        if options.renumber_graph {
            vertex_map = sources
                .iter()
                .chain(destinations.iter())
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let local = |g: &i64| vertex_map.partition_point(|v| v < g) as i64;
            sources = sources.iter().map(local).collect();
            destinations = destinations.iter().map(local).collect();
        }

        Ok(StructuralGraph {
            sources,
            destinations,
            weights,
            vertex_map,
            edge_ids: options.add_edge_data.then(|| selection.edge_ids.clone()),
        })
    }
}
