//! Columnar results returned by the property graph.

use crate::{DType, GraphError};

/// One typed column of a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<i64>),
    /// Missing numeric values are NaN.
    Float64(Vec<f64>),
    Utf8(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric dtype of the column; `None` for strings.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Column::Int64(_) => Some(DType::Int64),
            Column::Float64(_) => Some(DType::Float64),
            Column::Utf8(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Column::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_utf8(&self) -> Option<&[String]> {
        match self {
            Column::Utf8(v) => Some(v),
            _ => None,
        }
    }

    /// Gathers `rows` (which may repeat) into a new column.
    pub fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int64(v) => Column::Int64(rows.iter().map(|&r| v[r]).collect()),
            Column::Float64(v) => Column::Float64(rows.iter().map(|&r| v[r]).collect()),
            Column::Utf8(v) => Column::Utf8(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Appends `other`, promoting `Int64` to `Float64` when the two disagree.
    pub fn append(&mut self, other: Column) -> Result<(), GraphError> {
        if let (Column::Int64(a), Column::Float64(_)) = (&*self, &other) {
            let promoted = a.iter().map(|&x| x as f64).collect();
            *self = Column::Float64(promoted);
        }
        match (self, other) {
            (Column::Int64(a), Column::Int64(b)) => a.extend(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend(b),
            (Column::Utf8(a), Column::Utf8(b)) => a.extend(b),
            (Column::Float64(a), Column::Int64(b)) => a.extend(b.into_iter().map(|x| x as f64)),
            (this, other) => {
                return Err(GraphError::Other(format!(
                    "cannot append {:?} column to {:?} column",
                    other.dtype(),
                    this.dtype()
                )))
            }
        }
        Ok(())
    }
}

/// Named columns of equal length, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<(String, Column)>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column; its length must match the existing rows.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), GraphError> {
        let name = name.into();
        if let Some((_, first)) = self.columns.first() {
            if first.len() != column.len() {
                return Err(GraphError::ColumnLength {
                    column: name,
                    actual: column.len(),
                    expected: first.len(),
                });
            }
        }
        if self.columns.iter().any(|(n, _)| *n == name) {
            return Err(GraphError::Other(format!("duplicate column: {}", name)));
        }
        self.columns.push((name, column));
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|(_, c)| c.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn column(&self, name: &str) -> Result<&Column, GraphError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| GraphError::UnknownColumn(name.to_string()))
    }

    /// Moves a column out of the frame without copying its buffer.
    pub fn take_column(&mut self, name: &str) -> Result<Column, GraphError> {
        let pos = self
            .columns
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| GraphError::UnknownColumn(name.to_string()))?;
        Ok(self.columns.remove(pos).1)
    }

    /// Projects `names` in the given order. A name may repeat.
    pub fn select(&self, names: &[String]) -> Result<Frame, GraphError> {
        let columns = names
            .iter()
            .map(|name| Ok((name.clone(), self.column(name)?.clone())))
            .collect::<Result<Vec<_>, GraphError>>()?;
        Ok(Frame { columns })
    }

    /// Gathers `rows` from every column.
    pub fn take(&self, rows: &[usize]) -> Frame {
        Frame {
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.take(rows)))
                .collect(),
        }
    }

    /// Appends the rows of `other`; column names must match in order.
    pub fn append(&mut self, other: Frame) -> Result<(), GraphError> {
        if self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns.is_empty() {
            return Ok(());
        }
        if !self.names().eq(other.names()) {
            return Err(GraphError::Other(
                "cannot append frames with different columns".to_string(),
            ));
        }
        for ((_, col), (_, extra)) in self.columns.iter_mut().zip(other.columns) {
            col.append(extra)?;
        }
        Ok(())
    }
}
