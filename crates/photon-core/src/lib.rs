mod cpu;
mod enforcer;
mod op;
mod ops;
mod shape;
mod storage;
mod strides;
mod tensor;

pub use cpu::*;
pub use enforcer::*;
pub use op::*;
pub use ops::*;
pub use shape::*;
pub use storage::*;
pub use strides::*;
pub use tensor::*;

use smallvec::SmallVec;
pub type RVec<T> = SmallVec<[T; 4]>;

//https://github.com/sonos/tract/blob/main/data/src/macros.rs#L2
#[macro_export]
macro_rules! rvec {
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::RVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ rvec![@one $x])*;
        #[allow(unused_mut)]
        let mut vec = $crate::RVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::RVec::from_vec(vec![$($x,)*])
        }
    });
}

#[macro_export]
macro_rules! shape {
    ($($x:expr),*$(,)*) => ({
        use $crate::rvec;
        $crate::Shape::new(rvec![$($x,)*])
    });
}

/// Builds a selector for [`Tensor::slice`] and friends.
///
/// Each entry is anything convertible into a [`SliceArg`]:
/// `sel![.., 0, 1..3]` selects all of axis 0, index 0 of axis 1 and `1..3` of axis 2.
#[macro_export]
macro_rules! sel {
    ($($x:expr),*$(,)*) => ({
        let args: $crate::RVec<$crate::SliceArg> =
            $crate::RVec::from_vec(vec![$($crate::SliceArg::from($x),)*]);
        args
    });
}

pub mod prelude {
    pub use crate::{rvec, sel, shape, SliceArg, Tensor};
}
