//! Deterministic ranking over an observed participant set.
//!
//! The annotation channel returns holders in no particular order, so every
//! bot recomputes the same order locally from the set and the message time.

use std::collections::BTreeSet;

/// Participant ids, deduplicated and sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participants(Vec<i64>);

impl Participants {
    pub fn normalize(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.0.binary_search(&id).is_ok()
    }
}

impl FromIterator<i64> for Participants {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::normalize(iter)
    }
}

/// Start index of the rotation: `(msg_time div time_slice) mod n`.
///
/// Floor division keeps pre-epoch timestamps consistent across bots.
fn rotation_base(msg_time: i64, time_slice: u32, n: usize) -> usize {
    let slice = i64::from(time_slice.max(1));
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    // rem_euclid with a positive modulus is in 0..n
    usize::try_from(msg_time.div_euclid(slice).rem_euclid(n)).unwrap_or_default()
}

/// Ranking of `participants`: the sorted set rotated to start at
/// [`rotation_base`]. Empty input yields an empty ranking.
#[must_use]
pub fn decide_order(participants: &Participants, msg_time: i64, time_slice: u32) -> Vec<i64> {
    let ids = participants.as_slice();
    if ids.is_empty() {
        return Vec::new();
    }
    let base = rotation_base(msg_time, time_slice, ids.len());
    ids[base..].iter().chain(&ids[..base]).copied().collect()
}

/// Head of the ranking, used by the reduced variant.
#[must_use]
pub fn direct_winner(participants: &Participants, msg_time: i64, time_slice: u32) -> Option<i64> {
    let ids = participants.as_slice();
    if ids.is_empty() {
        return None;
    }
    ids.get(rotation_base(msg_time, time_slice, ids.len()))
        .copied()
}
