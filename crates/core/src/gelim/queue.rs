use std::collections::HashMap;

use crate::types::FamilyIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Active,
    Deferred,
}

/// The two work lists of the elimination loop.
///
/// Families are popped from the back of the active list. Deferring a family
/// takes it out of the active list (if present) and appends it to the
/// deferred list; a family already deferred is moved to the back instead of
/// being duplicated, so every family sits in at most one list.
///
/// Removal is lazy: each entry carries a stamp, and an entry whose stamp no
/// longer matches the family's current membership is skipped when popped.
#[derive(Debug, Clone, Default)]
pub struct FamilyQueues {
    lanes: [Vec<(FamilyIndex, u64)>; 2],
    /// Which physical lane currently plays the active role.
    active: usize,
    membership: HashMap<FamilyIndex, (Lane, u64)>,
    next_stamp: u64,
    live: [usize; 2],
}

impl FamilyQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane_index(&self, lane: Lane) -> usize {
        match lane {
            Lane::Active => self.active,
            Lane::Deferred => 1 - self.active,
        }
    }

    fn insert(&mut self, family: FamilyIndex, lane: Lane) {
        self.detach(family);
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let idx = self.lane_index(lane);
        self.lanes[idx].push((family, stamp));
        self.live[idx] += 1;
        self.membership.insert(family, (lane, stamp));
    }

    fn detach(&mut self, family: FamilyIndex) {
        if let Some((lane, _)) = self.membership.remove(&family) {
            let idx = self.lane_index(lane);
            self.live[idx] -= 1;
        }
    }

    /// Append a family to the active list.
    pub fn push_active(&mut self, family: FamilyIndex) {
        self.insert(family, Lane::Active);
    }

    /// Move a family to the back of the deferred list.
    pub fn defer(&mut self, family: FamilyIndex) {
        self.insert(family, Lane::Deferred);
    }

    /// Pop the most recently added active family.
    pub fn pop_active(&mut self) -> Option<FamilyIndex> {
        let idx = self.active;
        while let Some((family, stamp)) = self.lanes[idx].pop() {
            if self.membership.get(&family) == Some(&(Lane::Active, stamp)) {
                self.membership.remove(&family);
                self.live[idx] -= 1;
                return Some(family);
            }
        }
        None
    }

    /// Exchange the roles of the two lists.
    pub fn swap(&mut self) {
        for (lane, _) in self.membership.values_mut() {
            *lane = match lane {
                Lane::Active => Lane::Deferred,
                Lane::Deferred => Lane::Active,
            };
        }
        self.active = 1 - self.active;
    }

    pub fn active_len(&self) -> usize {
        self.live[self.active]
    }

    pub fn deferred_len(&self) -> usize {
        self.live[1 - self.active]
    }

    pub fn active_is_empty(&self) -> bool {
        self.active_len() == 0
    }

    pub fn deferred_is_empty(&self) -> bool {
        self.deferred_len() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    pub fn is_active(&self, family: FamilyIndex) -> bool {
        matches!(self.membership.get(&family), Some((Lane::Active, _)))
    }

    pub fn is_deferred(&self, family: FamilyIndex) -> bool {
        matches!(self.membership.get(&family), Some((Lane::Deferred, _)))
    }

    /// Deferred families in processing order once they become active
    /// (last element is popped first).
    pub fn deferred(&self) -> Vec<FamilyIndex> {
        self.live_entries(1 - self.active, Lane::Deferred)
    }

    /// Active families; the last element is popped next.
    pub fn active(&self) -> Vec<FamilyIndex> {
        self.live_entries(self.active, Lane::Active)
    }

    fn live_entries(&self, idx: usize, lane: Lane) -> Vec<FamilyIndex> {
        self.lanes[idx]
            .iter()
            .filter(|(f, stamp)| self.membership.get(f) == Some(&(lane, *stamp)))
            .map(|&(f, _)| f)
            .collect()
    }

    pub fn clear(&mut self) {
        self.lanes[0].clear();
        self.lanes[1].clear();
        self.membership.clear();
        self.live = [0, 0];
        self.active = 0;
    }
}
