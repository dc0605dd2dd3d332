//! Candidate selection for allocation.
//!
//! Selection is a pure function over the fetched Available set so the
//! retry-on-race loop in the scheduler can be tested without concurrency.

use std::collections::HashSet;

use rand::seq::IteratorRandom;
use rand::Rng;

use crate::types::DbId;

/// Anything that can be offered to a client as an allocation candidate.
pub trait Candidate {
    fn candidate_id(&self) -> DbId;
}

impl Candidate for DbId {
    fn candidate_id(&self) -> DbId {
        *self
    }
}

/// Pick one element of `available` uniformly at random, skipping any id in
/// `excluded`. Returns `None` when nothing is left.
pub fn select_candidate<'a, T, R>(
    available: &'a [T],
    excluded: &HashSet<DbId>,
    rng: &mut R,
) -> Option<&'a T>
where
    T: Candidate,
    R: Rng + ?Sized,
{
    available
        .iter()
        .filter(|c| !excluded.contains(&c.candidate_id()))
        .choose(rng)
}
