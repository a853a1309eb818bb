//! Deployable-unit topology.

use tracing::trace;

use crate::construct::{ConstructId, ConstructTree};
use crate::error::CoreResult;

/// Whether `a` and `b` are deployed by the same stage.
///
/// Recomputed on every call: the same value may be consumed from many
/// locations, each with its own answer.
pub fn same_unit(tree: &ConstructTree, a: ConstructId, b: ConstructId) -> CoreResult<bool> {
    let unit_a = tree.enclosing_unit(a)?;
    let unit_b = tree.enclosing_unit(b)?;
    let same = unit_a == unit_b;
    trace!("same_unit({}, {}) = {}", a, b, same);
    Ok(same)
}
