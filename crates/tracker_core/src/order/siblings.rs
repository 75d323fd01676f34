//! Generic insert/remove/move/replace over one sibling set.
//!
//! Every operation renumbers by position, so the order invariant holds
//! regardless of the history that produced the sequence.

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A node that lives in an ordered sibling set.
pub trait Ordered {
    fn id(&self) -> &str;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

/// Errors from sibling-set operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// No sibling has this id.
    NotFound(String),
    /// Destination index is outside `0..len`.
    OutOfRange { index: usize, len: usize },
    /// Strict replace received an id twice.
    DuplicateId(String),
    /// Strict replace received a different id set than the current one.
    IdSetMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

impl Display for OrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "sibling not found: {id}"),
            Self::OutOfRange { index, len } => {
                write!(f, "destination index {index} out of range for {len} sibling(s)")
            }
            Self::DuplicateId(id) => write!(f, "duplicate sibling id: {id}"),
            Self::IdSetMismatch {
                missing,
                unexpected,
            } => write!(
                f,
                "sibling id set changed: missing [{}], unexpected [{}]",
                missing.join(", "),
                unexpected.join(", ")
            ),
        }
    }
}

impl Error for OrderError {}

/// Appends `node` as the last sibling and returns it.
///
/// `node.order` is overwritten with the current sibling count.
pub fn append<T: Ordered>(siblings: &mut Vec<T>, mut node: T) -> &T {
    let index = siblings.len();
    node.set_order(index as u32);
    siblings.push(node);
    &siblings[index]
}

/// Removes the sibling with `id` and closes the gap it leaves.
///
/// # Errors
/// - `NotFound` when no sibling has `id`; the sequence is unchanged.
pub fn remove_by_id<T: Ordered>(siblings: &mut Vec<T>, id: &str) -> Result<T, OrderError> {
    let index = position_of(siblings, id).ok_or_else(|| OrderError::NotFound(id.to_string()))?;
    let removed = siblings.remove(index);
    renumber(siblings);
    Ok(removed)
}

/// Moves the sibling with `id` to `destination`.
///
/// A move is remove-then-reinsert, never a swap: moving index 0 to 2 shifts
/// the elements previously at 1 and 2 down by one.
///
/// # Errors
/// - `NotFound` when `id` is absent.
/// - `OutOfRange` when `destination >= siblings.len()`.
pub fn move_to<T: Ordered>(
    siblings: &mut Vec<T>,
    id: &str,
    destination: usize,
) -> Result<(), OrderError> {
    let from = position_of(siblings, id).ok_or_else(|| OrderError::NotFound(id.to_string()))?;
    if destination >= siblings.len() {
        return Err(OrderError::OutOfRange {
            index: destination,
            len: siblings.len(),
        });
    }

    let node = siblings.remove(from);
    siblings.insert(destination, node);
    renumber(siblings);
    Ok(())
}

/// Accepts a caller-supplied ordering and renumbers it `0..n-1` as given.
///
/// Trusts the caller: the id set is not compared with any previous set and
/// duplicates are kept. Use [`replace_all_strict`] to check those.
pub fn replace_all<T: Ordered>(mut siblings: Vec<T>) -> Vec<T> {
    renumber(&mut siblings);
    siblings
}

/// Like [`replace_all`], but only when `proposed` is a permutation of
/// `current`.
///
/// # Errors
/// - `DuplicateId` when `proposed` lists an id twice.
/// - `IdSetMismatch` when ids were added or dropped.
pub fn replace_all_strict<T: Ordered>(current: &[T], proposed: Vec<T>) -> Result<Vec<T>, OrderError> {
    check_permutation(current, &proposed)?;
    Ok(replace_all(proposed))
}

fn check_permutation<T: Ordered>(current: &[T], proposed: &[T]) -> Result<(), OrderError> {
    let mut proposed_ids = HashSet::with_capacity(proposed.len());
    for node in proposed {
        if !proposed_ids.insert(node.id()) {
            return Err(OrderError::DuplicateId(node.id().to_string()));
        }
    }

    let current_ids: HashSet<&str> = current.iter().map(T::id).collect();
    if current_ids != proposed_ids {
        let mut missing: Vec<String> = current_ids
            .difference(&proposed_ids)
            .map(|id| id.to_string())
            .collect();
        let mut unexpected: Vec<String> = proposed_ids
            .difference(&current_ids)
            .map(|id| id.to_string())
            .collect();
        missing.sort();
        unexpected.sort();
        return Err(OrderError::IdSetMismatch {
            missing,
            unexpected,
        });
    }
    Ok(())
}

/// Sets every sibling's order to its position.
pub fn renumber<T: Ordered>(siblings: &mut [T]) {
    for (index, node) in siblings.iter_mut().enumerate() {
        node.set_order(index as u32);
    }
}

/// Returns whether the multiset of orders is exactly `{0, .., n-1}`.
///
/// Position is not considered; `[1, 0]` is dense.
pub fn is_dense<T: Ordered>(siblings: &[T]) -> bool {
    let mut orders: Vec<u32> = siblings.iter().map(T::order).collect();
    orders.sort_unstable();
    orders
        .iter()
        .enumerate()
        .all(|(index, order)| *order as usize == index)
}

pub fn position_of<T: Ordered>(siblings: &[T], id: &str) -> Option<usize> {
    siblings.iter().position(|node| node.id() == id)
}
