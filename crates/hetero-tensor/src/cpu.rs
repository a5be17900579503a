//! Host-memory numeric backend.

use hetero_types::{
    BackendError, Column, DType, Device, Frame, NumericBackend, SearchSide, Tensor, TensorData,
};

/// NumericBackend over plain `Vec` storage.
///
/// `device` only labels residency; data always lives in host memory.
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    device: Device,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            device: Device::Cpu,
        }
    }

    pub fn on_device(device: Device) -> Self {
        Self { device }
    }

    fn cast_data(data: TensorData, dtype: DType) -> Result<TensorData, BackendError> {
        let data = match (data, dtype) {
            (TensorData::Int32(v), DType::Int32) => TensorData::Int32(v),
            (TensorData::Int64(v), DType::Int64) => TensorData::Int64(v),
            (TensorData::Float32(v), DType::Float32) => TensorData::Float32(v),
            (TensorData::Float64(v), DType::Float64) => TensorData::Float64(v),
            (TensorData::Int32(v), DType::Int64) => {
                TensorData::Int64(v.into_iter().map(i64::from).collect())
            }
            (TensorData::Int32(v), DType::Float32) => {
                TensorData::Float32(v.into_iter().map(|x| x as f32).collect())
            }
            (TensorData::Int32(v), DType::Float64) => {
                TensorData::Float64(v.into_iter().map(f64::from).collect())
            }
            (TensorData::Int64(v), DType::Int32) => TensorData::Int32(
                v.into_iter()
                    .map(|x| i32::try_from(x).map_err(|_| out_of_range(x, DType::Int32)))
                    .collect::<Result<_, _>>()?,
            ),
            (TensorData::Int64(v), DType::Float32) => {
                TensorData::Float32(v.into_iter().map(|x| x as f32).collect())
            }
            (TensorData::Int64(v), DType::Float64) => {
                TensorData::Float64(v.into_iter().map(|x| x as f64).collect())
            }
            (TensorData::Float32(v), DType::Int32) => TensorData::Int32(
                v.into_iter()
                    .map(|x| float_to_i32(f64::from(x)))
                    .collect::<Result<_, _>>()?,
            ),
            (TensorData::Float32(v), DType::Int64) => TensorData::Int64(
                v.into_iter()
                    .map(|x| float_to_i64(f64::from(x)))
                    .collect::<Result<_, _>>()?,
            ),
            (TensorData::Float32(v), DType::Float64) => {
                TensorData::Float64(v.into_iter().map(f64::from).collect())
            }
            (TensorData::Float64(v), DType::Int32) => TensorData::Int32(
                v.into_iter().map(float_to_i32).collect::<Result<_, _>>()?,
            ),
            (TensorData::Float64(v), DType::Int64) => TensorData::Int64(
                v.into_iter().map(float_to_i64).collect::<Result<_, _>>()?,
            ),
            (TensorData::Float64(v), DType::Float32) => {
                TensorData::Float32(v.into_iter().map(|x| x as f32).collect())
            }
        };
        Ok(data)
    }
}

fn out_of_range(value: impl std::fmt::Display, dtype: DType) -> BackendError {
    BackendError::OutOfRange {
        value: value.to_string(),
        dtype,
    }
}

// Floats truncate toward zero; non-finite or out-of-bounds values are errors.
fn float_to_i32(x: f64) -> Result<i32, BackendError> {
    let t = x.trunc();
    if t.is_finite() && t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX) {
        Ok(t as i32)
    } else {
        Err(out_of_range(x, DType::Int32))
    }
}

fn float_to_i64(x: f64) -> Result<i64, BackendError> {
    let t = x.trunc();
    // i64::MAX is not representable; 2^63 is the first value past it.
    if t.is_finite() && t >= -9_223_372_036_854_775_808.0 && t < 9_223_372_036_854_775_808.0 {
        Ok(t as i64)
    } else {
        Err(out_of_range(x, DType::Int64))
    }
}

impl NumericBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn device(&self) -> Device {
        self.device
    }

    fn from_column(&self, column: Column) -> Result<Tensor, BackendError> {
        let n = column.len();
        let data = match column {
            Column::Int64(v) => TensorData::Int64(v),
            Column::Float64(v) => TensorData::Float64(v),
            Column::Utf8(_) => return Err(BackendError::NonNumericColumn("<utf8>".to_string())),
        };
        Tensor::new(data, vec![n], Device::Cpu)
            .ok_or_else(|| BackendError::Shape(format!("column of {} rows", n)))
    }

    fn from_frame(&self, frame: Frame) -> Result<Tensor, BackendError> {
        let rows = frame.num_rows();
        let cols = frame.num_columns();
        let mut all_int = true;
        for (name, col) in frame.columns() {
            match col.dtype() {
                Some(DType::Int64) => {}
                Some(_) => all_int = false,
                None => return Err(BackendError::NonNumericColumn(name.to_string())),
            }
        }

        // Row-major interleave of column-major input.
        let data = if all_int && cols > 0 {
            let columns: Vec<&[i64]> = frame.columns().filter_map(|(_, c)| c.as_i64()).collect();
            let mut out = Vec::with_capacity(rows * cols);
            for r in 0..rows {
                out.extend(columns.iter().map(|c| c[r]));
            }
            TensorData::Int64(out)
        } else {
            let columns: Vec<Vec<f64>> = frame
                .columns()
                .map(|(_, c)| match c {
                    Column::Int64(v) => v.iter().map(|&x| x as f64).collect(),
                    Column::Float64(v) => v.clone(),
                    Column::Utf8(_) => Vec::new(),
                })
                .collect();
            let mut out = Vec::with_capacity(rows * cols);
            for r in 0..rows {
                out.extend(columns.iter().map(|c| c[r]));
            }
            TensorData::Float64(out)
        };
        Tensor::new(data, vec![rows, cols], Device::Cpu)
            .ok_or_else(|| BackendError::Shape(format!("frame of {} x {}", rows, cols)))
    }

    fn cast(&self, tensor: Tensor, dtype: DType) -> Result<Tensor, BackendError> {
        if tensor.dtype() == dtype {
            return Ok(tensor);
        }
        tracing::trace!(from = %tensor.dtype(), to = %dtype, "casting tensor");
        let shape = tensor.shape().to_vec();
        let device = tensor.device();
        let data = Self::cast_data(tensor.into_data(), dtype)?;
        Tensor::new(data, shape, device)
            .ok_or_else(|| BackendError::Shape("cast changed element count".to_string()))
    }

    fn searchsorted(&self, haystack: &[i64], needles: &[i64], side: SearchSide) -> Vec<usize> {
        match side {
            SearchSide::Left => needles
                .iter()
                .map(|n| haystack.partition_point(|h| h < n))
                .collect(),
            SearchSide::Right => needles
                .iter()
                .map(|n| haystack.partition_point(|h| h <= n))
                .collect(),
        }
    }

    fn concatenate(&self, tensors: &[Tensor]) -> Result<Tensor, BackendError> {
        let first = tensors
            .first()
            .ok_or_else(|| BackendError::Shape("nothing to concatenate".to_string()))?;
        let dtype = first.dtype();
        let tail: Vec<usize> = first.shape().iter().skip(1).copied().collect();
        let mut rows = 0;
        for t in tensors {
            if t.dtype() != dtype {
                return Err(BackendError::DTypeMismatch {
                    expected: dtype,
                    found: t.dtype(),
                });
            }
            if t.shape().iter().skip(1).copied().collect::<Vec<_>>() != tail {
                return Err(BackendError::Shape(format!(
                    "cannot concatenate shapes {:?} and {:?}",
                    first.shape(),
                    t.shape()
                )));
            }
            rows += t.len();
        }

        let data = match first.data() {
            TensorData::Int32(_) => TensorData::Int32(
                tensors
                    .iter()
                    .flat_map(|t| match t.data() {
                        TensorData::Int32(v) => v.as_slice(),
                        _ => &[],
                    })
                    .copied()
                    .collect(),
            ),
            TensorData::Int64(_) => TensorData::Int64(
                tensors
                    .iter()
                    .flat_map(|t| match t.data() {
                        TensorData::Int64(v) => v.as_slice(),
                        _ => &[],
                    })
                    .copied()
                    .collect(),
            ),
            TensorData::Float32(_) => TensorData::Float32(
                tensors
                    .iter()
                    .flat_map(|t| match t.data() {
                        TensorData::Float32(v) => v.as_slice(),
                        _ => &[],
                    })
                    .copied()
                    .collect(),
            ),
            TensorData::Float64(_) => TensorData::Float64(
                tensors
                    .iter()
                    .flat_map(|t| match t.data() {
                        TensorData::Float64(v) => v.as_slice(),
                        _ => &[],
                    })
                    .copied()
                    .collect(),
            ),
        };
        let mut shape = vec![rows];
        shape.extend(tail);
        Tensor::new(data, shape, first.device())
            .ok_or_else(|| BackendError::Shape("concatenated element count".to_string()))
    }

    fn arange(&self, start: i64, end: i64, dtype: DType) -> Result<Tensor, BackendError> {
        if !dtype.is_integer() {
            return Err(BackendError::Other(format!(
                "arange requires an integer dtype, got {}",
                dtype
            )));
        }
        let ids: Vec<i64> = (start..end).collect();
        self.cast(Tensor::from_i64(ids), dtype)
    }

    fn to_device(&self, tensor: Tensor) -> Tensor {
        if self.is_resident(&tensor) {
            return tensor;
        }
        tensor.with_device(self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searchsorted_sides() {
        let b = CpuBackend::new();
        let stops = [3, 5, 9];
        assert_eq!(b.searchsorted(&stops, &[0, 3, 4, 8], SearchSide::Right), vec![0, 1, 1, 2]);
        assert_eq!(b.searchsorted(&stops, &[3, 6, 10], SearchSide::Left), vec![0, 2, 3]);
    }

    #[test]
    fn from_frame_is_row_major() {
        let b = CpuBackend::new();
        let mut f = Frame::new();
        f.push_column("a", Column::Int64(vec![1, 2])).unwrap();
        f.push_column("b", Column::Float64(vec![0.5, 1.5])).unwrap();
        let t = b.from_frame(f).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.dtype(), DType::Float64);
        assert_eq!(t.to_f64_vec(), vec![1.0, 0.5, 2.0, 1.5]);
    }

    #[test]
    fn from_frame_rejects_strings() {
        let b = CpuBackend::new();
        let mut f = Frame::new();
        f.push_column("name", Column::Utf8(vec!["a".to_string()])).unwrap();
        assert!(matches!(b.from_frame(f), Err(BackendError::NonNumericColumn(n)) if n == "name"));
    }

    #[test]
    fn concatenate_requires_matching_dtype() {
        let b = CpuBackend::new();
        let ids = b.arange(0, 3, DType::Int64).unwrap();
        let more = b.arange(7, 9, DType::Int64).unwrap();
        let joined = b.concatenate(&[ids.clone(), more]).unwrap();
        assert_eq!(joined.to_i64_vec(), vec![0, 1, 2, 7, 8]);

        let narrow = b.arange(0, 2, DType::Int32).unwrap();
        assert!(matches!(
            b.concatenate(&[ids, narrow]),
            Err(BackendError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn cast_and_device_transfer() {
        let b = CpuBackend::on_device(Device::Gpu(0));
        let t = b.cast(Tensor::from_i64(vec![1, 2]), DType::Float32).unwrap();
        assert_eq!(t.dtype(), DType::Float32);
        assert!(!b.is_resident(&t));
        let t = b.to_device(t);
        assert_eq!(t.device(), Device::Gpu(0));
        assert!(b.arange(0, 2, DType::Float32).is_err());
    }

    #[test]
    fn narrowing_casts_reject_values_that_do_not_fit() {
        let b = CpuBackend::new();
        let ids = Tensor::from_i64(vec![0, i64::from(i32::MAX), 3_000_000_000]);
        let err = b.cast(ids, DType::Int32).unwrap_err();
        assert!(matches!(
            err,
            BackendError::OutOfRange { ref value, dtype: DType::Int32 } if value == "3000000000"
        ));

        let fits = b.cast(Tensor::from_i64(vec![-5, 7]), DType::Int32).unwrap();
        assert_eq!(fits.to_i64_vec(), vec![-5, 7]);

        let floats = Tensor::from_f32(vec![1.9, -2.5]);
        assert_eq!(b.cast(floats, DType::Int64).unwrap().to_i64_vec(), vec![1, -2]);
        assert!(matches!(
            b.cast(Tensor::from_f32(vec![f32::NAN]), DType::Int64),
            Err(BackendError::OutOfRange { .. })
        ));
        assert!(matches!(
            b.cast(Tensor::from_f32(vec![1.0e10]), DType::Int32),
            Err(BackendError::OutOfRange { .. })
        ));
    }
}
