//! Dense tensors handed to the mini-batch layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DType::Int32 | DType::Int64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int32" | "i32" => Ok(DType::Int32),
            "int64" | "i64" | "long" => Ok(DType::Int64),
            "float32" | "f32" | "float" => Ok(DType::Float32),
            "float64" | "f64" | "double" => Ok(DType::Float64),
            other => Err(format!("unknown dtype: {}", other)),
        }
    }
}

/// Where a tensor's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu(u32),
}

/// Typed backing storage, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::Int32(_) => DType::Int32,
            TensorData::Int64(_) => DType::Int64,
            TensorData::Float32(_) => DType::Float32,
            TensorData::Float64(_) => DType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::Int32(v) => v.len(),
            TensorData::Int64(v) => v.len(),
            TensorData::Float32(v) => v.len(),
            TensorData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A 1-D or 2-D dense tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: TensorData,
    shape: Vec<usize>,
    device: Device,
}

impl Tensor {
    /// Builds a tensor; `shape` must describe exactly `data.len()` elements.
    pub fn new(data: TensorData, shape: Vec<usize>, device: Device) -> Option<Self> {
        if shape.iter().product::<usize>() != data.len() {
            return None;
        }
        Some(Self {
            data,
            shape,
            device,
        })
    }

    pub fn from_i64(values: Vec<i64>) -> Self {
        let n = values.len();
        Self {
            data: TensorData::Int64(values),
            shape: vec![n],
            device: Device::Cpu,
        }
    }

    pub fn from_f32(values: Vec<f32>) -> Self {
        let n = values.len();
        Self {
            data: TensorData::Float32(values),
            shape: vec![n],
            device: Device::Cpu,
        }
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn into_data(self) -> TensorData {
        self.data
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Number of rows (first dimension).
    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements widened to `i64`; floats are truncated.
    pub fn to_i64_vec(&self) -> Vec<i64> {
        match &self.data {
            TensorData::Int32(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Int64(v) => v.clone(),
            TensorData::Float32(v) => v.iter().map(|&x| x as i64).collect(),
            TensorData::Float64(v) => v.iter().map(|&x| x as i64).collect(),
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            TensorData::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            TensorData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            TensorData::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            TensorData::Float64(v) => v.clone(),
        }
    }
}
