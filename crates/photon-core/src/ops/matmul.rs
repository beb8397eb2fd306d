use derive_new::new;

use crate::{
    Enforcer, InvariantError, OpGuards, Operation, OperationError, Shape, StorageView, Strides,
    Tensor,
};

/// Resolved geometry of a batched matmul.
///
/// `lhs` and `rhs` are views over the operands' storage, broadcast to
/// `batch_shape ++ [m, k]` and `batch_shape ++ [k, n]`.
#[derive(Debug, Clone)]
pub struct MatmulSpec {
    batch_shape: Shape,
    m: usize,
    k: usize,
    n: usize,
    lhs: StorageView,
    rhs: StorageView,
    out_shape: Shape,
}

impl MatmulSpec {
    pub fn batches(&self) -> usize {
        self.batch_shape.numel()
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn lhs(&self) -> &StorageView {
        &self.lhs
    }

    pub fn rhs(&self) -> &StorageView {
        &self.rhs
    }

    /// Shape of the result. Implied axes of rank-1 operands are dropped.
    pub fn out_shape(&self) -> &Shape {
        &self.out_shape
    }

    /// View over the leading batch axes of `view`.
    pub(crate) fn batch_view(&self, view: &StorageView) -> StorageView {
        let b = self.batch_shape.rank();
        StorageView::new(
            self.batch_shape.clone(),
            view.strides().slice(0..b),
            view.offset(),
        )
    }

    /// Row and column stride of the trailing matrix of `view`.
    pub(crate) fn matrix_strides(view: &StorageView) -> (isize, isize) {
        let strides = view.strides();
        let r = strides.rank();
        (strides[r - 2], strides[r - 1])
    }
}

#[derive(new, Debug, Clone)]
pub struct Matmul {
    pub(crate) lhs: Tensor,
    pub(crate) rhs: Tensor,
}

impl Matmul {
    /// Matrix view of an operand: rank-1 operands get an implied unit axis at `unit_axis`.
    fn as_matrix(t: &Tensor, unit_axis: usize) -> (Shape, Strides) {
        let mut shape = t.shape().clone();
        let mut strides = t.strides().clone();
        if shape.rank() < 2 {
            shape.insert(unit_axis, 1);
            strides.insert(unit_axis, 0);
        }
        (shape, strides)
    }

    pub fn compute_spec(&self) -> Result<MatmulSpec, OperationError> {
        Enforcer::assert_rank_range(self.lhs.shape(), 1..=usize::MAX)?;
        Enforcer::assert_rank_range(self.rhs.shape(), 1..=usize::MAX)?;

        let implicit_m = self.lhs.rank() < 2;
        let implicit_n = self.rhs.rank() < 2;
        let (ashape, astrides) = Self::as_matrix(&self.lhs, 0);
        let (bshape, bstrides) = Self::as_matrix(&self.rhs, 1);

        let (arank, brank) = (ashape.rank(), bshape.rank());
        let (m, ka) = (ashape[arank - 2], ashape[arank - 1]);
        let (kb, n) = (bshape[brank - 2], bshape[brank - 1]);
        if ka != kb {
            return Err(InvariantError::ShapeMismatch {
                left: arank - 1,
                right: brank - 2,
                a: ka,
                b: kb,
            })?;
        }

        let a_prefix = Shape::from(&ashape[..arank - 2]);
        let b_prefix = Shape::from(&bshape[..brank - 2]);
        let batch_shape = Tensor::broadcast_shapes(&a_prefix, &b_prefix)?;

        let full = |rows: usize, cols: usize| {
            let mut shape = batch_shape.clone();
            shape.push(rows);
            shape.push(cols);
            shape
        };
        let lhs_shape = full(m, ka);
        let rhs_shape = full(kb, n);
        let lhs = StorageView::new(
            lhs_shape.clone(),
            astrides.broadcast(&ashape, &lhs_shape)?,
            self.lhs.offset(),
        );
        let rhs = StorageView::new(
            rhs_shape.clone(),
            bstrides.broadcast(&bshape, &rhs_shape)?,
            self.rhs.offset(),
        );

        let mut out_shape = batch_shape.clone();
        if !implicit_m {
            out_shape.push(m);
        }
        if !implicit_n {
            out_shape.push(n);
        }

        Ok(MatmulSpec {
            batch_shape,
            m,
            k: ka,
            n,
            lhs,
            rhs,
            out_shape,
        })
    }
}

impl OpGuards for Matmul {
    fn check_shapes(&self) -> Result<(), OperationError> {
        self.compute_spec()?;
        Ok(())
    }
}

impl Operation for Matmul {
    fn compute_view(&self) -> Result<StorageView, OperationError> {
        let spec = self.compute_spec()?;
        Ok(StorageView::contiguous(spec.out_shape))
    }
}
