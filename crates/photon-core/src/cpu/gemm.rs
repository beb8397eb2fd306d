use crate::{CompactArray, Matmul, MatmulSpec, OperationError, StridedIndex, Tensor};
use gemm::{gemm, Parallelism};

/// Runs one `gemm` call per batch entry, writing into a row-major `[batches, m, n]` buffer.
fn gemm_impl(spec: &MatmulSpec, lhs: &[f32], rhs: &[f32]) -> Vec<f32> {
    let (m, n, k) = (spec.m(), spec.n(), spec.k());
    let batches = spec.batches();
    let mut dst = vec![0f32; batches * m * n];
    if m * n == 0 || k == 0 {
        return dst;
    }

    let (lhs_rs, lhs_cs) = MatmulSpec::matrix_strides(spec.lhs());
    let (rhs_rs, rhs_cs) = MatmulSpec::matrix_strides(spec.rhs());
    let (dst_rs, dst_cs) = (n as isize, 1isize);
    let c_skip = m * n;

    let lhs_batch = spec.batch_view(spec.lhs());
    let rhs_batch = spec.batch_view(spec.rhs());
    let steps = StridedIndex::new(&lhs_batch).zip(StridedIndex::new(&rhs_batch));

    log::debug!(
        "gemm: batches={} m={} n={} k={} lhs rs/cs={}/{} rhs rs/cs={}/{}",
        batches,
        m,
        n,
        k,
        lhs_rs,
        lhs_cs,
        rhs_rs,
        rhs_cs
    );

    let parallelism = Parallelism::None;
    for (step, (a_off, b_off)) in steps.enumerate() {
        let lhs_p = &lhs[a_off..];
        let rhs_p = &rhs[b_off..];
        let dst_p = &mut dst[step * c_skip..];
        // SAFETY: every index reached from the base pointers through the given strides lies
        // inside its buffer, since the views were validated against these buffers.
        unsafe {
            gemm(
                m,
                n,
                k,
                dst_p.as_mut_ptr(),
                dst_cs,
                dst_rs,
                false,
                lhs_p.as_ptr(),
                lhs_cs,
                lhs_rs,
                rhs_p.as_ptr(),
                rhs_cs,
                rhs_rs,
                0.0,
                1.0,
                false,
                false,
                false,
                parallelism,
            )
        }
    }
    dst
}

/// Batched product of `op`'s operands into a fresh compact tensor.
pub(crate) fn cpu_matmul(op: &Matmul) -> Result<Tensor, OperationError> {
    let spec = op.compute_spec()?;
    let Matmul { lhs, rhs } = op;

    let result = if lhs.shares_storage(rhs) {
        let data = lhs.storage().read();
        gemm_impl(&spec, &data, &data)
    } else {
        gemm_impl(&spec, &lhs.storage().read(), &rhs.storage().read())
    };

    Ok(Tensor::from_storage(
        CompactArray::from_vec(result),
        spec.out_shape().clone(),
    ))
}
