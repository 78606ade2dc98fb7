use crate::{collection::Collection, node::NodePath};

/// Returns true if the arrays at `path` in `a` and `b` have the same size along `axis`.
///
/// Two 1-D arrays agree along axis `1`, which neither has.
/// Returns false if either collection has no array at `path`, or only one array has `axis`.
#[must_use]
pub fn paths_agree(a: &Collection, b: &Collection, path: &NodePath, axis: usize) -> bool {
    let (Some(a), Some(b)) = (a.array(path), b.array(path)) else {
        return false;
    };
    match (a.data().size_along(axis), b.data().size_along(axis)) {
        (Some(size_a), Some(size_b)) => size_a == size_b,
        _ => axis == 1 && a.shape().len() == 1 && b.shape().len() == 1,
    }
}
