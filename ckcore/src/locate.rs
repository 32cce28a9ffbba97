//! Entry and exit points of a function.
use ckinstr::modules::{Function, InsertPoint, Slot};
use smallvec::SmallVec;

use crate::utils::error::{CkResult, StructuralFault};

/// First non-metadata instruction of the entry block.
///
/// Phi nodes and meta-instructions are skipped. If the entry block holds
/// nothing else, the point is its terminator.
pub fn entry_point(function: &Function) -> CkResult<InsertPoint> {
    let entry = function
        .entry_block()
        .ok_or_else(|| StructuralFault::MalformedFunction {
            function: function.name.clone(),
            reason: "a function with a body must have at least one basic block".to_string(),
        })?;

    Ok(InsertPoint {
        block: 0,
        slot: entry.first_non_metadata(),
    })
}

/// Every return terminator of `function`, in declared block order.
///
/// Blocks always carry a terminator, so this cannot fail; a declaration has
/// no exit point.
pub fn exit_points(function: &Function) -> SmallVec<[InsertPoint; 4]> {
    function
        .body
        .iter()
        .enumerate()
        .filter(|(_, bb)| bb.terminator.is_return())
        .map(|(block, _)| InsertPoint {
            block,
            slot: Slot::Terminator,
        })
        .collect()
}
