//! Typed arrays backed by [`ndarray::ArrayD`].
use anyhow::Result;
use epimem_core::{error, ArrayStore, BatchIndex, DType, MemoryError, SliceIndex};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn, Slice};
use num_traits::Zero;

/// An n-dimensional array of any element type supported by the memory.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    /// `f32` elements.
    F32(ArrayD<f32>),
    /// `f64` elements.
    F64(ArrayD<f64>),
    /// `i32` elements.
    I32(ArrayD<i32>),
    /// `i64` elements.
    I64(ArrayD<i64>),
    /// `u8` elements.
    U8(ArrayD<u8>),
    /// `u16` elements.
    U16(ArrayD<u16>),
    /// `bool` elements.
    Bool(ArrayD<bool>),
}

/// Applies `$body` to the inner array of any variant.
macro_rules! with_array {
    ($value:expr, $a:ident => $body:expr) => {
        match $value {
            TypedArray::F32($a) => $body,
            TypedArray::F64($a) => $body,
            TypedArray::I32($a) => $body,
            TypedArray::I64($a) => $body,
            TypedArray::U8($a) => $body,
            TypedArray::U16($a) => $body,
            TypedArray::Bool($a) => $body,
        }
    };
}

/// Applies `$body` to the inner array and wraps the result in the same variant.
macro_rules! map_array {
    ($value:expr, $a:ident => $body:expr) => {
        match $value {
            TypedArray::F32($a) => TypedArray::F32($body),
            TypedArray::F64($a) => TypedArray::F64($body),
            TypedArray::I32($a) => TypedArray::I32($body),
            TypedArray::I64($a) => TypedArray::I64($body),
            TypedArray::U8($a) => TypedArray::U8($body),
            TypedArray::U16($a) => TypedArray::U16($body),
            TypedArray::Bool($a) => TypedArray::Bool($body),
        }
    };
}

/// Checks `index` against `shape`, returning the shape of the selected slice.
fn slice_shape(shape: &[usize], index: &[SliceIndex]) -> error::Result<Vec<usize>> {
    if index.len() > shape.len() {
        return Err(MemoryError::BackendError(format!(
            "index {:?} has more selectors than the {} axes of the array",
            index,
            shape.len()
        )));
    }
    let mut out = vec![];
    for (axis, (ix, &len)) in index.iter().zip(shape.iter()).enumerate() {
        match ix {
            SliceIndex::At(i) => {
                if *i >= len {
                    return Err(MemoryError::BackendError(format!(
                        "index {} is out of bounds for axis {} of length {}",
                        i, axis, len
                    )));
                }
            }
            SliceIndex::Range(r) => {
                if r.start > r.end || r.end > len {
                    return Err(MemoryError::BackendError(format!(
                        "range {:?} is out of bounds for axis {} of length {}",
                        r, axis, len
                    )));
                }
                out.push(r.end - r.start);
            }
        }
    }
    out.extend_from_slice(&shape[index.len()..]);
    Ok(out)
}

// Callers check the index with slice_shape() first.
fn select<'a, T>(mut view: ArrayViewD<'a, T>, index: &[SliceIndex]) -> ArrayViewD<'a, T> {
    let mut axis = 0;
    for ix in index {
        match ix {
            SliceIndex::At(i) => view = view.index_axis_move(Axis(axis), *i),
            SliceIndex::Range(r) => {
                view.slice_axis_inplace(Axis(axis), Slice::from(r.clone()));
                axis += 1;
            }
        }
    }
    view
}

fn select_mut<'a, T>(mut view: ArrayViewMutD<'a, T>, index: &[SliceIndex]) -> ArrayViewMutD<'a, T> {
    let mut axis = 0;
    for ix in index {
        match ix {
            SliceIndex::At(i) => view = view.index_axis_move(Axis(axis), *i),
            SliceIndex::Range(r) => {
                view.slice_axis_inplace(Axis(axis), Slice::from(r.clone()));
                axis += 1;
            }
        }
    }
    view
}

fn read<T: Clone>(array: &ArrayD<T>, index: &[SliceIndex]) -> error::Result<ArrayD<T>> {
    slice_shape(array.shape(), index)?;
    Ok(select(array.view(), index).to_owned())
}

fn write<T: Clone>(
    array: &mut ArrayD<T>,
    index: &[SliceIndex],
    value: &ArrayD<T>,
) -> error::Result<()> {
    let shape = slice_shape(array.shape(), index)?;
    if value.shape() != shape.as_slice() {
        return Err(MemoryError::BackendError(format!(
            "value of shape {:?} cannot be written to a slice of shape {:?}",
            value.shape(),
            shape
        )));
    }
    select_mut(array.view_mut(), index).assign(value);
    Ok(())
}

fn gather<T: Clone>(array: &ArrayD<T>, ixs: &[BatchIndex]) -> error::Result<ArrayD<T>> {
    let shape = array.shape();
    if shape.len() < 2 {
        return Err(MemoryError::BackendError(format!(
            "cannot gather (episode, step) pairs from an array of shape {:?}",
            shape
        )));
    }
    if let Some(ix) = ixs
        .iter()
        .find(|ix| ix.episode >= shape[0] || ix.step >= shape[1])
    {
        return Err(MemoryError::BackendError(format!(
            "index {:?} is out of bounds for an array of shape {:?}",
            ix, shape
        )));
    }

    let mut out_shape = vec![ixs.len()];
    out_shape.extend_from_slice(&shape[2..]);
    let mut data = Vec::with_capacity(out_shape.iter().product());
    for ix in ixs.iter() {
        let row = array
            .index_axis(Axis(0), ix.episode)
            .index_axis_move(Axis(0), ix.step);
        data.extend(row.iter().cloned());
    }
    ArrayD::from_shape_vec(IxDyn(&out_shape), data)
        .map_err(|e| MemoryError::BackendError(e.to_string()))
}

fn flag<T: Zero>(array: &ArrayD<T>) -> Option<bool> {
    match array.len() {
        1 => array.iter().next().map(|v| !v.is_zero()),
        _ => None,
    }
}

impl TypedArray {
    /// Creates an array from a shape and elements in row-major order.
    ///
    /// ```
    /// use epimem_ndarray::TypedArray;
    ///
    /// let a = TypedArray::from_shape_vec(&[2, 2], vec![1u8, 2, 3, 4]).unwrap();
    /// assert_eq!(a.shape(), &[2, 2]);
    /// ```
    pub fn from_shape_vec<T>(shape: &[usize], data: Vec<T>) -> Result<Self>
    where
        TypedArray: From<ArrayD<T>>,
    {
        Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?.into())
    }

    /// Shape of the array.
    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    /// Returns `true` if the array has no element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `ix`-th subarray along the first axis.
    pub fn row(&self, ix: usize) -> Result<Self> {
        Ok(self.read_slice(&[SliceIndex::At(ix)])?)
    }
}

impl ArrayStore for TypedArray {
    fn allocate(shape: &[usize], dtype: DType) -> Self {
        let shape = IxDyn(shape);
        match dtype {
            DType::F32 => TypedArray::F32(ArrayD::zeros(shape)),
            DType::F64 => TypedArray::F64(ArrayD::zeros(shape)),
            DType::I32 => TypedArray::I32(ArrayD::zeros(shape)),
            DType::I64 => TypedArray::I64(ArrayD::zeros(shape)),
            DType::U8 => TypedArray::U8(ArrayD::zeros(shape)),
            DType::U16 => TypedArray::U16(ArrayD::zeros(shape)),
            DType::Bool => TypedArray::Bool(ArrayD::from_elem(shape, false)),
        }
    }

    fn dtype(&self) -> DType {
        match self {
            TypedArray::F32(_) => DType::F32,
            TypedArray::F64(_) => DType::F64,
            TypedArray::I32(_) => DType::I32,
            TypedArray::I64(_) => DType::I64,
            TypedArray::U8(_) => DType::U8,
            TypedArray::U16(_) => DType::U16,
            TypedArray::Bool(_) => DType::Bool,
        }
    }

    fn shape(&self) -> Vec<usize> {
        TypedArray::shape(self).to_vec()
    }

    fn read_slice(&self, index: &[SliceIndex]) -> error::Result<Self> {
        Ok(map_array!(self, a => read(a, index)?))
    }

    fn write_slice(&mut self, index: &[SliceIndex], value: &Self) -> error::Result<()> {
        match (self, value) {
            (TypedArray::F32(a), TypedArray::F32(v)) => write(a, index, v),
            (TypedArray::F64(a), TypedArray::F64(v)) => write(a, index, v),
            (TypedArray::I32(a), TypedArray::I32(v)) => write(a, index, v),
            (TypedArray::I64(a), TypedArray::I64(v)) => write(a, index, v),
            (TypedArray::U8(a), TypedArray::U8(v)) => write(a, index, v),
            (TypedArray::U16(a), TypedArray::U16(v)) => write(a, index, v),
            (TypedArray::Bool(a), TypedArray::Bool(v)) => write(a, index, v),
            (a, v) => Err(MemoryError::BackendError(format!(
                "value of element type {} cannot be written to an array of element type {}",
                v.dtype(),
                a.dtype()
            ))),
        }
    }

    fn gather(&self, ixs: &[BatchIndex]) -> error::Result<Self> {
        Ok(map_array!(self, a => gather(a, ixs)?))
    }

    fn as_flag(&self) -> Option<bool> {
        match self {
            TypedArray::Bool(a) => match a.len() {
                1 => a.iter().next().copied(),
                _ => None,
            },
            TypedArray::F32(a) => flag(a),
            TypedArray::F64(a) => flag(a),
            TypedArray::I32(a) => flag(a),
            TypedArray::I64(a) => flag(a),
            TypedArray::U8(a) => flag(a),
            TypedArray::U16(a) => flag(a),
        }
    }
}

macro_rules! impl_conversions {
    ($t:ty, $variant:ident, $as_fn:ident) => {
        impl From<ArrayD<$t>> for TypedArray {
            fn from(a: ArrayD<$t>) -> Self {
                TypedArray::$variant(a)
            }
        }

        impl From<$t> for TypedArray {
            /// A scalar, i.e. a zero-dimensional array.
            fn from(v: $t) -> Self {
                TypedArray::$variant(ndarray::arr0(v).into_dyn())
            }
        }

        impl From<Vec<$t>> for TypedArray {
            /// A one-dimensional array.
            fn from(v: Vec<$t>) -> Self {
                TypedArray::$variant(ndarray::Array1::from(v).into_dyn())
            }
        }

        impl TypedArray {
            /// Returns the inner array if the element type matches.
            pub fn $as_fn(&self) -> Option<&ArrayD<$t>> {
                match self {
                    TypedArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
        }
    };
}

impl_conversions!(f32, F32, as_f32);
impl_conversions!(f64, F64, as_f64);
impl_conversions!(i32, I32, as_i32);
impl_conversions!(i64, I64, as_i64);
impl_conversions!(u8, U8, as_u8);
impl_conversions!(u16, U16, as_u16);
impl_conversions!(bool, Bool, as_bool);
