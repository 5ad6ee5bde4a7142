use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::genetics::{NuclearFamily, PedigreeGraph};
use crate::types::{FamilyIndex, MemberIndex, PedigreeIndex};

/// Kind of problem recorded against a member at one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[default]
    None,
    NuclearFamily,
    Mendelian,
    /// Sex-linked marker alleles inconsistent with the member's sex.
    XyLinked,
}

/// Errors of one family member, keyed by marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberErrors {
    pub member: MemberIndex,
    pub errors: BTreeMap<usize, ErrorKind>,
}

impl MemberErrors {
    fn new(member: MemberIndex) -> Self {
        Self {
            member,
            errors: BTreeMap::new(),
        }
    }

    /// The recorded error at `marker`, if it is anything but `None`.
    pub fn error(&self, marker: usize) -> Option<ErrorKind> {
        self.errors
            .get(&marker)
            .copied()
            .filter(|&k| k != ErrorKind::None)
    }

    fn record(&mut self, marker: usize, kind: ErrorKind) {
        let entry = self.errors.entry(marker).or_insert(kind);
        if *entry == ErrorKind::None {
            *entry = kind;
        }
    }

    fn absorb(&mut self, other: &MemberErrors) {
        for (&marker, &kind) in &other.errors {
            self.record(marker, kind);
        }
    }
}

/// Error record of one nuclear family: mother first, father second, then
/// the children in family order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyErrors {
    pub family: FamilyIndex,
    pub members: Vec<MemberErrors>,
}

impl FamilyErrors {
    fn new(family: FamilyIndex, fam: &NuclearFamily) -> Self {
        let members = [fam.mother, fam.father]
            .into_iter()
            .chain(fam.children.iter().copied())
            .map(MemberErrors::new)
            .collect();
        Self { family, members }
    }

    pub fn mother(&self) -> &MemberErrors {
        &self.members[0]
    }

    pub fn father(&self) -> &MemberErrors {
        &self.members[1]
    }

    pub fn children(&self) -> &[MemberErrors] {
        &self.members[2..]
    }

    /// Markers at which the parents carry an error.
    pub fn markers(&self) -> Vec<usize> {
        let mut markers: Vec<usize> = self
            .mother()
            .errors
            .iter()
            .chain(self.father().errors.iter())
            .filter(|&(_, &k)| k != ErrorKind::None)
            .map(|(&m, _)| m)
            .collect();
        markers.sort_unstable();
        markers.dedup();
        markers
    }

    /// Children flagged at `marker`.
    pub fn inconsistent_children(&self, marker: usize) -> impl Iterator<Item = MemberIndex> + '_ {
        self.children()
            .iter()
            .filter(move |c| c.error(marker).is_some())
            .map(|c| c.member)
    }

    fn member_mut(&mut self, member: MemberIndex) -> Option<&mut MemberErrors> {
        self.members.iter_mut().find(|m| m.member == member)
    }
}

/// Per-marker counters of one pedigree. A counter is bumped once per
/// subpedigree run, so values above one mean several subpedigrees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PedigreeTally {
    pub checked: Vec<u32>,
    pub informative: Vec<u32>,
    pub inconsistent: Vec<u32>,
}

impl PedigreeTally {
    fn grow(&mut self, len: usize) {
        if self.checked.len() < len {
            self.checked.resize(len, 0);
            self.informative.resize(len, 0);
            self.inconsistent.resize(len, 0);
        }
    }

    pub fn marker_count(&self) -> usize {
        self.checked.len()
    }

    fn nonzero(values: &[u32]) -> usize {
        values.iter().filter(|&&v| v > 0).count()
    }
}

/// One row of the per-pedigree summary: numbers of markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PedigreeSummary {
    pub pedigree: String,
    pub inconsistent: usize,
    pub informative: usize,
    pub total: usize,
}

/// One row of the per-marker summary: numbers of pedigrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerSummary {
    pub marker: usize,
    pub inconsistent: usize,
    pub informative: usize,
    pub total: usize,
}

/// Collects Mendelian inconsistencies and informativeness counts across
/// markers and pedigrees.
///
/// Family records are created on the first error for a family and only ever
/// grow afterwards; iteration follows creation order.
#[derive(Debug, Clone, Default)]
pub struct InconsistencyHandler {
    families: IndexMap<FamilyIndex, FamilyErrors>,
    pedigrees: BTreeMap<PedigreeIndex, PedigreeTally>,
    sex_linked_error: bool,
}

impl InconsistencyHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, family_idx: FamilyIndex, fam: &NuclearFamily) -> (&mut FamilyErrors, bool) {
        let created = !self.families.contains_key(&family_idx);
        let record = self
            .families
            .entry(family_idx)
            .or_insert_with(|| FamilyErrors::new(family_idx, fam));
        (record, created)
    }

    /// Record an error against both parents of a family, used when no
    /// single child can be blamed. Returns whether a new family record was
    /// created.
    pub fn add_family_error(
        &mut self,
        family_idx: FamilyIndex,
        fam: &NuclearFamily,
        marker: usize,
        kind: ErrorKind,
    ) -> bool {
        if kind == ErrorKind::XyLinked {
            self.sex_linked_error = true;
        }
        let (record, created) = self.record(family_idx, fam);
        record.members[0].record(marker, kind);
        record.members[1].record(marker, kind);
        created
    }

    /// Record an error against one child. The parents are labelled as well
    /// so the family shows up at this marker. Returns whether a new family
    /// record was created.
    pub fn add_child_error(
        &mut self,
        family_idx: FamilyIndex,
        fam: &NuclearFamily,
        child: MemberIndex,
        marker: usize,
        kind: ErrorKind,
    ) -> bool {
        if kind == ErrorKind::XyLinked {
            self.sex_linked_error = true;
        }
        let (record, created) = self.record(family_idx, fam);
        record.members[0].record(marker, kind);
        record.members[1].record(marker, kind);
        if let Some(entry) = record.member_mut(child) {
            entry.record(marker, kind);
        } else {
            log::warn!("member {} is not a child of family {}", child, family_idx);
        }
        created
    }

    /// Count one check of `marker` on `pedigree`.
    pub fn mark_info(
        &mut self,
        pedigree: PedigreeIndex,
        marker: usize,
        inconsistent: bool,
        informative: bool,
    ) {
        let tally = self.pedigrees.entry(pedigree).or_default();
        tally.grow(marker + 1);
        tally.checked[marker] += 1;
        if informative {
            tally.informative[marker] += 1;
        }
        if inconsistent {
            tally.inconsistent[marker] += 1;
        }
    }

    pub fn families(&self) -> impl Iterator<Item = &FamilyErrors> {
        self.families.values()
    }

    pub fn family_errors(&self, family: FamilyIndex) -> Option<&FamilyErrors> {
        self.families.get(&family)
    }

    pub fn incon_family_count(&self) -> usize {
        self.families.len()
    }

    pub fn pedigrees(&self) -> impl Iterator<Item = (PedigreeIndex, &PedigreeTally)> {
        self.pedigrees.iter().map(|(&p, t)| (p, t))
    }

    pub fn tally(&self, pedigree: PedigreeIndex) -> Option<&PedigreeTally> {
        self.pedigrees.get(&pedigree)
    }

    pub fn has_sex_linked_errors(&self) -> bool {
        self.sex_linked_error
    }

    /// Whether anything at all has been recorded.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty() && self.pedigrees.is_empty()
    }

    /// Per-pedigree counts of markers, most problematic first.
    pub fn pedigree_summaries(&self, graph: &PedigreeGraph) -> Vec<PedigreeSummary> {
        let mut rows: Vec<PedigreeSummary> = self
            .pedigrees
            .iter()
            .map(|(&p, t)| PedigreeSummary {
                pedigree: graph.pedigree_name(p).to_string(),
                inconsistent: PedigreeTally::nonzero(&t.inconsistent),
                informative: PedigreeTally::nonzero(&t.informative),
                total: PedigreeTally::nonzero(&t.checked),
            })
            .collect();

        rows.sort_by(|l, r| {
            r.inconsistent
                .cmp(&l.inconsistent)
                .then(r.informative.cmp(&l.informative))
                .then(r.total.cmp(&l.total))
                .then_with(|| l.pedigree.cmp(&r.pedigree))
        });
        rows
    }

    /// Per-marker counts of pedigrees, most problematic first. Markers that
    /// were never checked still get a row when below `marker_count`.
    pub fn marker_summaries(&self, marker_count: usize) -> Vec<MarkerSummary> {
        let width = self
            .pedigrees
            .values()
            .map(PedigreeTally::marker_count)
            .max()
            .unwrap_or(0)
            .max(marker_count);

        let mut rows: Vec<MarkerSummary> = (0..width)
            .map(|marker| MarkerSummary {
                marker,
                inconsistent: 0,
                informative: 0,
                total: 0,
            })
            .collect();

        for tally in self.pedigrees.values() {
            for marker in 0..tally.marker_count() {
                let row = &mut rows[marker];
                if tally.inconsistent[marker] > 0 {
                    row.inconsistent += 1;
                }
                if tally.informative[marker] > 0 {
                    row.informative += 1;
                }
                if tally.checked[marker] > 0 {
                    row.total += 1;
                }
            }
        }

        rows.sort_by(|l, r| {
            r.inconsistent
                .cmp(&l.inconsistent)
                .then(r.informative.cmp(&l.informative))
                .then(l.marker.cmp(&r.marker))
        });
        rows
    }

    /// Fold another handler's records into this one. Tallies are summed and
    /// family records unioned.
    pub fn merge(&mut self, other: InconsistencyHandler) {
        self.sex_linked_error |= other.sex_linked_error;

        for (family, errors) in other.families {
            match self.families.get_mut(&family) {
                Some(existing) => {
                    for member in &errors.members {
                        if let Some(target) = existing.member_mut(member.member) {
                            target.absorb(member);
                        }
                    }
                }
                None => {
                    self.families.insert(family, errors);
                }
            }
        }

        for (pedigree, tally) in other.pedigrees {
            let mine = self.pedigrees.entry(pedigree).or_default();
            mine.grow(tally.marker_count());
            for m in 0..tally.marker_count() {
                mine.checked[m] += tally.checked[m];
                mine.informative[m] += tally.informative[m];
                mine.inconsistent[m] += tally.inconsistent[m];
            }
        }
    }

    pub fn clear(&mut self) {
        self.families.clear();
        self.pedigrees.clear();
        self.sex_linked_error = false;
    }
}
