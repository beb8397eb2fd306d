use crate::cpu::{compact, cpu_matmul, gather, CPUOperation, StridedIndex};
use crate::{
    ops::*, CompactArray, Enforcer, IndexError, InvariantError, Operation, OperationError, Shape,
    Strides,
};

use derive_new::new;

#[cfg(feature = "rand")]
use {rand::prelude::*, rand_distr::StandardNormal};

#[cfg(feature = "testing")]
use ndarray::{ArrayD, IxDyn};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Data of length {actual} does not match shape {shape} ({expected} elements)")]
    Construction {
        shape: Shape,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    OperationError(#[from] OperationError),
}

impl TensorError {
    pub fn is_construction_error(&self) -> bool {
        matches!(self, TensorError::Construction { .. })
    }

    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            TensorError::OperationError(OperationError::InvariantError(_))
        )
    }

    pub fn is_index_error(&self) -> bool {
        matches!(self, TensorError::OperationError(OperationError::IndexError(_)))
    }
}

impl From<InvariantError> for TensorError {
    fn from(err: InvariantError) -> Self {
        TensorError::OperationError(err.into())
    }
}

impl From<IndexError> for TensorError {
    fn from(err: IndexError) -> Self {
        TensorError::OperationError(err.into())
    }
}

/// Tensors are just a view into their underlying storage.
///
/// Element `i` of the view lives at `offset + Σ i[k] * strides[k]` in the buffer.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct StorageView {
    shape: Shape,
    strides: Strides,
    offset: usize,
}

impl StorageView {
    /// Row-major view over a fresh buffer.
    pub fn contiguous(shape: Shape) -> Self {
        let strides = Strides::from(&shape);
        Self::new(shape, strides, 0)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn is_row_major(&self) -> bool {
        self.strides.is_row_major(&self.shape)
    }
}

/// Logical contents of a view as nested sequences, one level per axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Scalar(f32),
    List(Vec<Nested>),
}

impl Nested {
    fn build(shape: &[usize], data: &[f32]) -> Self {
        match shape.split_first() {
            None => Nested::Scalar(data[0]),
            Some((&dim, rest)) => {
                let inner: usize = rest.iter().product();
                Nested::List(
                    (0..dim)
                        .map(|i| Nested::build(rest, &data[i * inner..(i + 1) * inner]))
                        .collect(),
                )
            }
        }
    }
}

/// A multi-dimensional array of `f32`.
///
/// A tensor is a [`StorageView`] over a shared [`CompactArray`]. Permuting, slicing and
/// broadcasting produce new tensors over the same buffer without copying, so a write
/// through one tensor is visible through every tensor that maps over the written region.
#[derive(Clone)]
pub struct Tensor {
    view: StorageView,
    storage: CompactArray,
}

impl Tensor {
    fn new(view: StorageView, storage: CompactArray) -> Self {
        Self { view, storage }
    }

    /// Another view over the same storage.
    pub(crate) fn with_view(&self, view: StorageView) -> Self {
        Self::new(view, self.storage.clone())
    }

    pub(crate) fn from_storage(storage: CompactArray, shape: Shape) -> Self {
        debug_assert_eq!(storage.size(), shape.numel());
        Self::new(StorageView::contiguous(shape), storage)
    }

    /// Creates a new compact tensor from a chunk of data, laid out row-major.
    pub fn from_data<U: AsRef<[f32]>>(data: U, shape: Shape) -> Result<Tensor, TensorError> {
        let data = data.as_ref();
        let expected = shape.numel();
        if data.len() != expected {
            return Err(TensorError::Construction {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_storage(CompactArray::from_slice(data), shape))
    }

    /// Creates a rank-1 tensor holding `data`.
    pub fn from_vec(data: Vec<f32>) -> Tensor {
        let shape = Shape::from(vec![data.len()]);
        Self::from_storage(CompactArray::from_vec(data), shape)
    }

    pub fn zeros(shape: Shape) -> Tensor {
        Self::from_storage(CompactArray::zeros(shape.numel()), shape)
    }

    pub fn full(shape: Shape, value: f32) -> Tensor {
        Self::from_storage(CompactArray::from_vec(vec![value; shape.numel()]), shape)
    }

    #[cfg(feature = "rand")]
    pub fn randn(shape: Shape) -> Tensor {
        let mut rng = rand::thread_rng();
        let data = (0..shape.numel())
            .map(|_| StandardNormal.sample(&mut rng))
            .collect::<Vec<f32>>();
        Self::from_storage(CompactArray::from_vec(data), shape)
    }
}

impl Tensor {
    pub fn view(&self) -> &StorageView {
        &self.view
    }

    pub fn shape(&self) -> &Shape {
        &self.view.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.view.strides
    }

    pub fn offset(&self) -> usize {
        self.view.offset
    }

    pub fn rank(&self) -> usize {
        self.view.shape.rank()
    }

    pub fn numel(&self) -> usize {
        self.view.numel()
    }

    pub fn storage(&self) -> &CompactArray {
        &self.storage
    }

    /// True if both tensors view the same buffer.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    /// A tensor is compact when its view walks the whole buffer in row-major order:
    /// row-major strides, offset 0, and a buffer of exactly `numel` elements.
    ///
    /// Compact tensors reshape without copying.
    pub fn is_compact(&self) -> bool {
        self.view.offset == 0
            && self.view.is_row_major()
            && self.storage.size() == self.view.numel()
    }
}

impl Tensor {
    /// Reinterprets the tensor with a new shape holding the same number of elements.
    ///
    /// Reshape is defined on logical element order. A compact tensor is reshaped in place
    /// and shares its buffer with the result. Any other tensor is first copied with
    /// [`Tensor::make_compact`]; query [`Tensor::is_compact`] to know which path is taken.
    pub fn reshape(&self, shape: Shape) -> Result<Tensor, TensorError> {
        View::new(self.clone(), shape.clone()).check_invariants()?;

        let src = if self.is_compact() {
            self.clone()
        } else {
            log::debug!(
                "Reshape {:?} -> {:?} requires compaction (strides {:?}, offset {})",
                self.shape(),
                shape,
                self.strides(),
                self.offset()
            );
            self.make_compact()
        };
        let view = View::new(src.clone(), shape).compute_view()?;
        Ok(src.with_view(view))
    }

    /// The shape both `a` and `b` broadcast to.
    pub fn broadcast_shapes(a: &Shape, b: &Shape) -> Result<Shape, InvariantError> {
        Shape::multi_broadcast(&[a, b]).ok_or_else(|| InvariantError::BroadcastMismatch {
            from: a.clone(),
            to: b.clone(),
        })
    }

    /// Reorders the axes: output axis `i` is input axis `dims[i]`. No data moves.
    pub fn transpose(&self, dims: &[usize]) -> Result<Tensor, TensorError> {
        self.reindex(Reindex::Permute(Permute::new(self.clone(), dims.to_vec())))
    }

    /// Expands the tensor to `shape` by repeating it along size-1 and missing leading axes.
    pub fn broadcast_to(&self, shape: Shape) -> Result<Tensor, TensorError> {
        self.reindex(Reindex::Broadcast(Broadcast::new(self.clone(), shape)))
    }

    /// Resolves `args` against this tensor, see [`SliceArg`]. No data moves.
    pub fn slice(&self, args: &[SliceArg]) -> Result<Tensor, TensorError> {
        self.reindex(Reindex::Slice(Slice::new(self.clone(), args.into())))
    }

    fn reindex(&self, op: Reindex) -> Result<Tensor, TensorError> {
        op.check_invariants()?;
        let view = op.compute_view()?;
        log::trace!("{}: {:?} -> {:?}", op.name(), self.view, view);
        Ok(self.with_view(view))
    }

    /// Copies the logical contents into a fresh row-major buffer.
    pub fn make_compact(&self) -> Tensor {
        let storage = compact(self);
        Self::from_storage(storage, self.shape().clone())
    }

    /// Writes `src` into the elements selected by `args`.
    ///
    /// A scalar source is written to every selected element. A tensor source is broadcast
    /// to the selected shape first. The destination need not be compact, and nothing is
    /// written unless the whole write is valid.
    ///
    /// When `src` views the same buffer as `self`, each element is read just before it is
    /// written. Overlapping regions are the caller's responsibility.
    pub fn index_write(
        &self,
        args: &[SliceArg],
        src: impl Into<WriteSource>,
    ) -> Result<(), TensorError> {
        let dst = self.slice(args)?;
        let op = IndexWrite::new(dst.clone(), src.into());
        op.check_invariants()?;
        op.apply_cpu(dst)?;
        Ok(())
    }

    /// Batched matrix product over the trailing two axes, broadcasting the leading ones.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let op = Matmul::new(self.clone(), other.clone());
        op.check_invariants()?;
        Ok(cpu_matmul(&op)?)
    }

    /// Reads the element at `index`, which must name every axis.
    pub fn at(&self, index: &[usize]) -> Result<f32, TensorError> {
        if index.len() != self.rank() {
            return Err(IndexError::WrongIndexCount {
                actual: index.len(),
                rank: self.rank(),
            })?;
        }
        let mut offset = self.offset() as isize;
        for (axis, (&i, &size)) in index.iter().zip(self.shape().iter()).enumerate() {
            let i = Enforcer::check_index(axis, i as isize, size)?;
            offset += i as isize * self.strides()[axis];
        }
        Ok(self.storage.read()[offset as usize])
    }

    /// Reads the only element of a single-element tensor.
    pub fn item(&self) -> Result<f32, TensorError> {
        if self.numel() != 1 {
            return Err(InvariantError::NumelMismatch {
                from: self.shape().clone(),
                to: Shape::default(),
            })?;
        }
        Ok(self.storage.read()[self.offset()])
    }

    /// The logical contents, flattened in row-major order regardless of strides.
    pub fn to_vec(&self) -> Vec<f32> {
        gather(&self.view, &self.storage.read())
    }

    pub fn to_nested(&self) -> Nested {
        Nested::build(&self.shape().to_vec(), &self.to_vec())
    }

    pub(crate) fn offsets(&self) -> StridedIndex<'_> {
        StridedIndex::new(&self.view)
    }

    pub fn deep_clone(&self) -> Tensor {
        Tensor::new(self.view.clone(), self.storage.deep_clone())
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.to_vec();
        let length = data.len().min(32);
        f.debug_struct("Tensor")
            .field("shape", self.shape())
            .field("strides", self.strides())
            .field("offset", &self.offset())
            .field("data", &&data[..length])
            .finish()
    }
}

/// Conversion to and from ndarray
#[cfg(feature = "testing")]
impl Tensor {
    pub fn to_ndarray(&self) -> ArrayD<f32> {
        let shape = self.shape().to_vec();
        ArrayD::from_shape_vec(IxDyn(&shape), self.to_vec())
            .expect("logical contents always fill the shape")
    }

    pub fn all_close(&self, other: &Self, atol: f32, rtol: f32) -> Result<(), String> {
        if self.shape() != other.shape() {
            return Err(format!(
                "Shape mismatch {:?} != {:?}",
                self.shape(),
                other.shape()
            ));
        }

        let self_nd = self.to_ndarray();
        let other_nd = other.to_ndarray();
        let mut stats = CloseStats::new(atol, rtol);

        ndarray::indices_of(&self_nd).into_iter().for_each(|idx| {
            let (a, b) = (self_nd[&idx], other_nd[&idx]);
            stats.update(&a, &b, idx);
        });

        if stats.fail_count > 0 {
            Err(format!(
                "{} samples not close - AVGE={} MAE={} at {:?}",
                stats.fail_count,
                stats.avg_error(),
                stats.max_abs_error,
                stats.max_abs_error_idxs,
            ))
        } else {
            log::debug!(
                "All close - AVGE={} MAE={} at {:?}",
                stats.avg_error(),
                stats.max_abs_error,
                stats.max_abs_error_idxs
            );
            Ok(())
        }
    }
}

#[cfg(feature = "testing")]
impl From<ArrayD<f32>> for Tensor {
    fn from(it: ArrayD<f32>) -> Self {
        let shape = Shape::from(it.shape());
        let data = it.iter().copied().collect::<Vec<_>>();
        Self::from_storage(CompactArray::from_vec(data), shape)
    }
}

#[cfg(feature = "testing")]
struct CloseStats {
    total_error: f32,
    max_abs_error: f32,
    max_abs_error_idxs: Option<IxDyn>,
    element_count: usize,
    fail_count: usize,
    atol: f32,
    rtol: f32,
}

#[cfg(feature = "testing")]
impl CloseStats {
    fn new(atol: f32, rtol: f32) -> Self {
        Self {
            total_error: 0.0,
            max_abs_error: 0.0,
            max_abs_error_idxs: None,
            element_count: 0,
            fail_count: 0,
            atol,
            rtol,
        }
    }

    fn update(&mut self, a: &f32, b: &f32, index: IxDyn) {
        let abs_diff = (a - b).abs();
        self.total_error += abs_diff;
        self.element_count += 1;

        if abs_diff > self.max_abs_error {
            self.max_abs_error = abs_diff;
            self.max_abs_error_idxs = Some(index);
        }

        if !self.is_close(a, b, abs_diff) {
            self.fail_count += 1;
        }
    }

    fn avg_error(&self) -> f32 {
        self.total_error / self.element_count.max(1) as f32
    }

    fn is_close(&self, a: &f32, b: &f32, abs_diff: f32) -> bool {
        (a.is_nan() && b.is_nan())
            || (a.is_infinite() && b.is_infinite() && a.signum() == b.signum())
            || abs_diff <= self.atol + self.rtol * b.abs()
    }
}
