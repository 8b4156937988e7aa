//! This module implements the container for the flat data of a main dataset.
//! It is either held in memory or backed by a source that computes elements on
//! demand; reshapes, permutations and slices compose lazily on the latter and
//! give the same results as on the former.

use std::fmt::Debug;
use std::ops::Range;
use std::rc::Rc;

use ndarray::{ArrayD, Axis, Dimension, IxDyn, Slice};

use crate::ancillary::builder::checked_product;
use crate::error::{UsidError, UsidResult};

/// Row-major flat offset of a multi-index.
fn ravel(index: &[usize], shape: &[usize]) -> usize {
  return index.iter()
    .zip(shape.iter())
    .fold(0, |acc, (i, n)| acc * n + i);
}

/// Multi-index of a row-major flat offset.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
  let mut index = vec![0; shape.len()];
  for (slot, n) in index.iter_mut().zip(shape.iter()).rev() {
    *slot = flat % n;
    flat /= n;
  }
  return index;
}

/// Checks that `axes` is a permutation of `0..ndim`.
fn check_permutation(axes: &[usize], ndim: usize) -> UsidResult<()> {
  let mut seen = vec![false; ndim];
  for a in axes {
    match seen.get_mut(*a) {
      Some(s) if !*s => *s = true,
      _ => return Err(UsidError::shape_mismatch(
        "axes",
        format!("{:?} is not a permutation of {} axes", axes, ndim)
      )),
    }
  }
  if axes.len() != ndim {
    return Err(UsidError::shape_mismatch(
      "axes",
      format!("{:?} is not a permutation of {} axes", axes, ndim)
    ));
  }
  return Ok(());
}

/// Something that can hand out elements of an array one at a time.
pub trait ElementSource<T> {
  /// The shape of the array.
  fn shape(&self) -> &[usize];

  /// The element at a row-major flat offset.
  fn element(&self, flat: usize) -> T;
}

/// An element source backed by a closure.
pub struct FnSource<T> {
  /// The shape of the array.
  shape: Vec<usize>,
  /// Computes an element from its flat offset.
  f: Box<dyn Fn(usize) -> T>
}

impl<T> FnSource<T> {
  /// Wraps a closure.
  pub fn new<F: Fn(usize) -> T + 'static>(shape: Vec<usize>, f: F) -> Self {
    return Self { shape, f: Box::new(f) };
  }
}

impl<T> ElementSource<T> for FnSource<T> {
  fn shape(&self) -> &[usize] {
    return &self.shape;
  }

  fn element(&self, flat: usize) -> T {
    return (self.f)(flat);
  }
}

impl<T: Clone> ElementSource<T> for ArrayD<T> {
  fn shape(&self) -> &[usize] {
    return ArrayD::shape(self);
  }

  fn element(&self, flat: usize) -> T {
    let index = unravel(flat, ArrayD::shape(self));
    return self[IxDyn(&index)].clone();
  }
}

/// A lazy operation recorded on a deferred array.
#[derive(Clone, Debug, PartialEq)]
enum DeferredOp {
  /// Row-major reshape.
  Reshape,
  /// Output axis k is input axis `axes[k]`.
  Permute(Vec<usize>),
  /// Output index along `axis` is input index minus `start`.
  Slice {
    /// The sliced axis.
    axis: usize,
    /// Offset of the slice.
    start: usize
  }
}

/// One recorded operation plus the shape it was applied to.
#[derive(Clone, Debug, PartialEq)]
struct DeferredStep {
  /// The operation.
  op: DeferredOp,
  /// The shape before the operation.
  input: Vec<usize>
}

/// An array whose elements are computed only when asked for.
#[derive(Clone)]
pub struct DeferredArray<T> {
  /// Where elements come from.
  source: Rc<dyn ElementSource<T>>,
  /// Operations applied so far, oldest first.
  steps: Vec<DeferredStep>,
  /// The current shape.
  shape: Vec<usize>
}

impl<T> Debug for DeferredArray<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return f.debug_struct("DeferredArray")
      .field("shape", &self.shape)
      .field("steps", &self.steps)
      .finish();
  }
}

impl<T: 'static> DeferredArray<T> {
  /// Wraps a source.
  pub fn new<S: ElementSource<T> + 'static>(source: S) -> Self {
    let shape = source.shape().to_vec();
    return Self { source: Rc::new(source), steps: Vec::new(), shape };
  }

  /// The current shape.
  pub fn shape(&self) -> &[usize] {
    return &self.shape;
  }

  /// Records an operation.
  fn push(&self, op: DeferredOp, shape: Vec<usize>) -> Self {
    let mut steps = self.steps.clone();
    steps.push(DeferredStep { op, input: self.shape.clone() });
    return Self { source: self.source.clone(), steps, shape };
  }

  /// Computes a single element. The index must be within the current shape.
  pub fn get(&self, index: &[usize]) -> T {
    let mut index = index.to_vec();
    let mut shape: &[usize] = &self.shape;
    for step in self.steps.iter().rev() {
      index = match &step.op {
        DeferredOp::Reshape => unravel(ravel(&index, shape), &step.input),
        DeferredOp::Permute(axes) => {
          let mut input = vec![0; index.len()];
          for (k, a) in axes.iter().enumerate() {
            input[*a] = index[k];
          }
          input
        },
        DeferredOp::Slice { axis, start } => {
          index[*axis] += start;
          index
        },
      };
      shape = &step.input;
    }
    return self.source.element(ravel(&index, self.source.shape()));
  }
}

/// The flat content of a main dataset.
#[derive(Clone, Debug)]
pub enum MainArray<T> {
  /// Held in memory.
  Eager(ArrayD<T>),
  /// Computed on demand.
  Deferred(DeferredArray<T>)
}

impl<T> From<ArrayD<T>> for MainArray<T> {
  fn from(value: ArrayD<T>) -> Self {
    return Self::Eager(value);
  }
}

impl<T: Clone + 'static> MainArray<T> {
  /// A deferred array computing each element from its flat offset.
  pub fn deferred<F: Fn(usize) -> T + 'static>(
    shape: Vec<usize>,
    f: F
  ) -> Self {
    return Self::Deferred(DeferredArray::new(FnSource::new(shape, f)));
  }

  /// The shape.
  pub fn shape(&self) -> &[usize] {
    return match self {
      Self::Eager(a) => a.shape(),
      Self::Deferred(d) => d.shape(),
    };
  }

  /// The number of axes.
  pub fn ndim(&self) -> usize {
    return self.shape().len();
  }

  /// The number of elements.
  pub fn len(&self) -> usize {
    return self.shape().iter().product();
  }

  /// Whether there are no elements at all.
  pub fn is_empty(&self) -> bool {
    return self.len() == 0;
  }

  /// Whether elements are computed on demand.
  pub fn is_deferred(&self) -> bool {
    return matches!(self, Self::Deferred(_));
  }

  /// Reshapes in row-major order.
  pub fn reshape(&self, shape: &[usize]) -> UsidResult<Self> {
    if checked_product(shape) != Some(self.len()) {
      return Err(UsidError::shape_mismatch(
        "reshape",
        format!(
          "cannot fit {} elements of {:?} into {:?}",
          self.len(),
          self.shape(),
          shape
        )
      ));
    }
    return match self {
      Self::Eager(a) => {
        ArrayD::from_shape_vec(IxDyn(shape), a.iter().cloned().collect())
          .map(Self::Eager)
          .map_err(|e| UsidError::shape_mismatch("reshape", e.to_string()))
      },
      Self::Deferred(d) => {
        Ok(Self::Deferred(d.push(DeferredOp::Reshape, shape.to_vec())))
      },
    };
  }

  /// Reorders axes: output axis k is input axis `axes[k]`.
  pub fn permute(&self, axes: &[usize]) -> UsidResult<Self> {
    check_permutation(axes, self.ndim())?;
    return Ok(match self {
      Self::Eager(a) => Self::Eager(a.clone().permuted_axes(IxDyn(axes))),
      Self::Deferred(d) => {
        let shape = axes.iter().map(|a| d.shape()[*a]).collect();
        Self::Deferred(d.push(DeferredOp::Permute(axes.to_vec()), shape))
      },
    });
  }

  /// Keeps a range of one axis.
  pub fn slice_axis(
    &self,
    axis: usize,
    range: Range<usize>
  ) -> UsidResult<Self> {
    let len = match self.shape().get(axis) {
      Some(n) => *n,
      None => return Err(UsidError::shape_mismatch(
        "slice",
        format!("no axis {} in shape {:?}", axis, self.shape())
      )),
    };
    if range.start >= range.end || range.end > len {
      return Err(UsidError::shape_mismatch(
        "slice",
        format!("{:?} does not fit axis {} of length {}", range, axis, len)
      ));
    }
    return Ok(match self {
      Self::Eager(a) => {
        Self::Eager(a.slice_axis(Axis(axis), Slice::from(range)).to_owned())
      },
      Self::Deferred(d) => {
        let mut shape = d.shape().to_vec();
        shape[axis] = range.end - range.start;
        let op = DeferredOp::Slice { axis, start: range.start };
        Self::Deferred(d.push(op, shape))
      },
    });
  }

  /// Computes every element into an in-memory array.
  pub fn materialize(&self) -> ArrayD<T> {
    return match self {
      Self::Eager(a) => a.clone(),
      Self::Deferred(d) => {
        ArrayD::from_shape_fn(IxDyn(d.shape()), |ix| d.get(ix.slice()))
      },
    };
  }

  /// Same as `materialize`, without copying eager arrays.
  pub fn into_array(self) -> ArrayD<T> {
    return match self {
      Self::Eager(a) => a,
      deferred => deferred.materialize(),
    };
  }
}
