use crate::config::{EliminationConfig, RemovalPolicy};
use crate::error::{GelimError, Result};
use crate::genetics::{
    ChildGenotypeSet, FamilySlots, InheritanceModel, Linkage, NuclearFamily, PedigreeGraph, Sex,
};
use crate::types::{FamilyIndex, GenotypeId, MemberIndex, Slot, SubpedigreeIndex};

use super::inconsistency::{ErrorKind, InconsistencyHandler};
use super::mask::GenotypeMask;
use super::parental::{all_parental_pairs, find_valid_pairs, genotype_alleles, GenotypePair, ValidParentalGenotypes};
use super::queue::FamilyQueues;

/// Outcome of processing one nuclear family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyStatus {
    /// At least one valid parental pair exists.
    Consistent,
    /// The family is not part of the current subpedigree or has no children.
    Unresolved,
    /// A parent had no genotypes left before the family was looked at.
    ParentsExhausted,
    /// No parental pair is consistent with the children.
    Inconsistent,
}

impl FamilyStatus {
    pub fn code(self) -> u8 {
        match self {
            FamilyStatus::Consistent => 0,
            FamilyStatus::Unresolved => 1,
            FamilyStatus::ParentsExhausted => 2,
            FamilyStatus::Inconsistent => 3,
        }
    }

    /// Whether the status means the subpedigree cannot be consistent.
    pub fn is_inconsistent(self) -> bool {
        matches!(self, FamilyStatus::ParentsExhausted | FamilyStatus::Inconsistent)
    }
}

/// Outcome of a subpedigree run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Consistent,
    /// No genotype information; no elimination was done.
    Uninformative,
    Inconsistent,
}

impl ProcessStatus {
    pub fn code(self) -> u8 {
        match self {
            ProcessStatus::Consistent => 0,
            ProcessStatus::Uninformative => 1,
            ProcessStatus::Inconsistent => 2,
        }
    }
}

/// Working data of one child during a family pass.
#[derive(Debug, Clone)]
struct ChildInfo {
    member: MemberIndex,
    slot: Slot,
    sex: Sex,
    /// Phased genotype ids enumerated when the pass started.
    genotypes: Vec<GenotypeId>,
    /// One bit per entry of `genotypes`.
    mask: GenotypeMask,
}

/// Genotype elimination over the nuclear families of one subpedigree.
///
/// The model handed to [`process`](Self::process) must be local to the
/// selected subpedigree: member `m` owns phenotype slot `subindex(m) + 1`.
/// The eliminator mutates the model in place and records every
/// inconsistency it finds in its [`InconsistencyHandler`].
///
/// Elimination is a fixed point over two work lists. Families whose members
/// lost genotypes are deferred rather than revisited at once, so that other
/// families get to contribute first. The loop ends when both lists are
/// empty; every pass either removes genotypes or drains a list, so it always
/// terminates.
#[derive(Debug)]
pub struct GenotypeEliminator<'g> {
    graph: &'g PedigreeGraph,
    subpedigree: Option<SubpedigreeIndex>,
    config: EliminationConfig,
    queues: FamilyQueues,
    errors: InconsistencyHandler,
    children: Vec<ChildInfo>,
}

impl<'g> GenotypeEliminator<'g> {
    pub fn new(graph: &'g PedigreeGraph, config: EliminationConfig) -> Self {
        Self {
            graph,
            subpedigree: None,
            config,
            queues: FamilyQueues::new(),
            errors: InconsistencyHandler::new(),
            children: Vec::new(),
        }
    }

    pub fn graph(&self) -> &'g PedigreeGraph {
        self.graph
    }

    pub fn config(&self) -> &EliminationConfig {
        &self.config
    }

    pub fn subpedigree(&self) -> Option<SubpedigreeIndex> {
        self.subpedigree
    }

    /// Select the subpedigree subsequent calls operate on. Switching to a
    /// different subpedigree drops any pending work.
    ///
    /// # Errors
    /// Returns an error if the index is out of range.
    pub fn set_subpedigree(&mut self, subpedigree: SubpedigreeIndex) -> Result<()> {
        if subpedigree >= self.graph.n_subpedigrees() {
            return Err(GelimError::Pedigree(format!(
                "Subpedigree {} out of range ({} subpedigrees)",
                subpedigree,
                self.graph.n_subpedigrees()
            )));
        }
        if self.subpedigree != Some(subpedigree) {
            self.queues.clear();
        }
        self.subpedigree = Some(subpedigree);
        Ok(())
    }

    pub fn queues(&self) -> &FamilyQueues {
        &self.queues
    }

    /// Drop pending work so the next [`process`](Self::process) reseeds.
    pub fn reset_queues(&mut self) {
        self.queues.clear();
    }

    pub fn errors(&self) -> &InconsistencyHandler {
        &self.errors
    }

    /// Take the recorded errors, leaving an empty handler behind.
    pub fn take_errors(&mut self) -> InconsistencyHandler {
        std::mem::take(&mut self.errors)
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    fn current(&self) -> Result<SubpedigreeIndex> {
        self.subpedigree
            .ok_or_else(|| GelimError::Pedigree("No subpedigree selected".to_string()))
    }

    /// Record that `marker` was checked on the current subpedigree without
    /// carrying any information.
    ///
    /// # Errors
    /// Returns an error if no subpedigree is selected.
    pub fn mark_uninformative(&mut self, marker: usize) -> Result<()> {
        self.mark_checked(marker, false)
    }

    /// Record a consistent check of `marker` that did not go through
    /// [`process`](Self::process).
    ///
    /// # Errors
    /// Returns an error if no subpedigree is selected.
    pub fn mark_checked(&mut self, marker: usize, informative: bool) -> Result<()> {
        let sub = self.current()?;
        let pedigree = self.graph.subpedigree(sub).pedigree;
        self.errors.mark_info(pedigree, marker, false, informative);
        Ok(())
    }

    /// Run elimination on the current subpedigree until no family changes.
    ///
    /// Pending work from an earlier call is resumed; otherwise the active
    /// list is seeded with every informative family. On sex-linked markers,
    /// males without any genotype are reported first and elimination is
    /// skipped when there are any.
    ///
    /// # Errors
    /// Returns an error if no subpedigree is selected.
    pub fn process(&mut self, model: &mut InheritanceModel, marker: usize) -> Result<ProcessStatus> {
        let sub = self.current()?;
        let pedigree = self.graph.subpedigree(sub).pedigree;
        let removal = self.config.removal;

        if self.config.check_sex_linkage
            && model.linkage().is_sex_linked()
            && self.check_sex_linked(model, marker, sub)
        {
            self.queues.clear();
            self.errors.mark_info(pedigree, marker, true, true);
            return Ok(ProcessStatus::Inconsistent);
        }

        if self.queues.active_is_empty() {
            if !self.queues.deferred_is_empty() {
                self.queues.swap();
            } else {
                self.seed(model, sub);
            }
        }

        let mut inconsistent = false;
        let mut passes = 0usize;

        while let Some(family) = self.queues.pop_active() {
            passes += 1;
            let status =
                self.process_family(model, marker, family, ErrorKind::Mendelian, removal, true);
            if status.is_inconsistent() {
                inconsistent = true;
            }
            if self.queues.active_is_empty() {
                self.queues.swap();
            }
        }

        log::debug!(
            "marker {}: subpedigree {} settled after {} family passes{}",
            marker,
            sub,
            passes,
            if inconsistent { " (inconsistent)" } else { "" }
        );

        self.errors.mark_info(pedigree, marker, inconsistent, true);

        Ok(if inconsistent {
            ProcessStatus::Inconsistent
        } else {
            ProcessStatus::Consistent
        })
    }

    /// Eliminate within a single nuclear family.
    ///
    /// Parental pairs are first checked against every child. Child genotypes
    /// are then kept only if some surviving pair can produce them; when no
    /// pair survives, all pairs are used instead so that the children at
    /// fault can still be told apart. Errors found are recorded with `kind`.
    /// With `propagate`, families of members that lost genotypes are
    /// deferred for another look.
    pub fn process_family(
        &mut self,
        model: &mut InheritanceModel,
        marker: usize,
        family: FamilyIndex,
        kind: ErrorKind,
        removal: RemovalPolicy,
        propagate: bool,
    ) -> FamilyStatus {
        let graph = self.graph;
        if family >= graph.n_families() {
            return FamilyStatus::Unresolved;
        }
        let fam = graph.family(family);
        if Some(fam.subpedigree) != self.subpedigree || fam.children.is_empty() {
            return FamilyStatus::Unresolved;
        }

        let slots = graph.family_slots(family);
        if !fits_model(&slots, model) {
            log::warn!(
                "family {} does not fit model '{}' ({} phenotypes)",
                family,
                model.name(),
                model.phenotype_count()
            );
            return FamilyStatus::Unresolved;
        }

        if model.unphased_count(slots.mother) == 0 || model.unphased_count(slots.father) == 0 {
            return FamilyStatus::ParentsExhausted;
        }

        self.children.clear();
        for (&member, child) in fam.children.iter().zip(&slots.children) {
            let genotypes: Vec<GenotypeId> = model
                .phased_penetrances(child.slot)
                .map(|(g, _)| g.id())
                .collect();
            let mask = GenotypeMask::new(genotypes.len());
            self.children.push(ChildInfo {
                member,
                slot: child.slot,
                sex: child.sex,
                genotypes,
                mask,
            });
        }

        let phased = self.config.phased_parents;
        let valid = find_valid_pairs(&slots, model, phased);

        if valid.is_consistent() {
            self.mark_children(model.linkage(), valid.pairs(), phased);
        } else {
            let all = all_parental_pairs(&slots, model, phased);
            self.mark_children(model.linkage(), &all, phased);
        }

        if self.config.trace_families {
            self.trace_family(family, fam, &valid);
        }

        self.generate_errors(family, fam, marker, kind, &valid);

        match removal {
            RemovalPolicy::None => {}
            RemovalPolicy::Genotype => self.remove_genotypes(model, fam, &valid, propagate),
            RemovalPolicy::All => self.remove_all(model, fam, &valid, propagate),
        }

        if valid.is_consistent() {
            FamilyStatus::Consistent
        } else {
            FamilyStatus::Inconsistent
        }
    }

    /// A family is informative when some member is already constrained.
    /// Families that do not fit `model` never are.
    pub fn informative_family(&self, model: &InheritanceModel, family: FamilyIndex) -> bool {
        if family >= self.graph.n_families() {
            return false;
        }
        let slots = self.graph.family_slots(family);
        if !fits_model(&slots, model) {
            return false;
        }
        let full_unphased = model.full_unphased_count();
        let full_phased = model.full_phased_count();

        model.unphased_count(slots.mother) != full_unphased
            || model.unphased_count(slots.father) != full_unphased
            || slots
                .children
                .iter()
                .any(|c| model.phased_count(c.slot) != full_phased)
    }

    fn seed(&mut self, model: &InheritanceModel, sub: SubpedigreeIndex) {
        self.queues.clear();
        let graph = self.graph;
        for &family in &graph.subpedigree(sub).families {
            if self.informative_family(model, family) {
                self.queues.push_active(family);
            }
        }
    }

    fn mark_children(&mut self, linkage: Linkage, pairs: &[GenotypePair], phased: bool) {
        for &(gm, gf) in pairs {
            let mother = genotype_alleles(gm, phased);
            let father = genotype_alleles(gf, phased);

            for child in &mut self.children {
                match ChildGenotypeSet::new(mother, father, child.sex, linkage) {
                    Some(set) => {
                        for (i, &g) in child.genotypes.iter().enumerate() {
                            if set.contains_id(g) {
                                child.mask.set(i);
                            }
                        }
                    }
                    None => {
                        for i in 0..child.genotypes.len() {
                            child.mask.set(i);
                        }
                    }
                }
            }
        }
    }

    /// Flag children none of whose genotypes survived; if no child is to
    /// blame but the family has no valid pair, flag the parents.
    fn generate_errors(
        &mut self,
        family: FamilyIndex,
        fam: &NuclearFamily,
        marker: usize,
        kind: ErrorKind,
        valid: &ValidParentalGenotypes,
    ) -> bool {
        let mut detected = false;

        for child in &self.children {
            if !child.genotypes.is_empty() && child.mask.none() {
                detected = true;
                self.errors
                    .add_child_error(family, fam, child.member, marker, kind);
            }
        }

        if !detected && !valid.is_consistent() {
            detected = true;
            self.errors.add_family_error(family, fam, marker, kind);
        }

        detected
    }

    fn remove_parental(model: &mut InheritanceModel, slot: Slot, ids: &[GenotypeId], phased: bool) {
        for &id in ids {
            if phased {
                model.remove_phased(slot, id);
            } else {
                model.remove_unphased(slot, id);
            }
        }
    }

    /// Remove children's genotypes at the given positions; returns the
    /// members that lost something.
    fn remove_child_positions<F>(&self, model: &mut InheritanceModel, select: F) -> Vec<MemberIndex>
    where
        F: Fn(&ChildInfo) -> Vec<usize>,
    {
        let mut changed = Vec::new();
        for child in &self.children {
            let mut removed = false;
            for i in select(child) {
                removed |= model.remove_phased(child.slot, child.genotypes[i]);
            }
            if removed {
                changed.push(child.member);
            }
        }
        changed
    }

    fn remove_genotypes(
        &mut self,
        model: &mut InheritanceModel,
        fam: &NuclearFamily,
        valid: &ValidParentalGenotypes,
        propagate: bool,
    ) {
        let graph = self.graph;
        let phased = valid.phased();

        if !valid.mother_invalid().is_empty() {
            Self::remove_parental(model, graph.slot(fam.mother), valid.mother_invalid(), phased);
            if propagate {
                self.parent_set_move(fam.mother, fam.father);
            }
        }

        if !valid.father_invalid().is_empty() {
            Self::remove_parental(model, graph.slot(fam.father), valid.father_invalid(), phased);
            if propagate {
                self.parent_set_move(fam.father, fam.mother);
            }
        }

        let changed = self.remove_child_positions(model, |c| c.mask.unset_positions().collect());
        if propagate {
            for child in changed {
                self.child_set_move(child);
            }
        }
    }

    fn remove_all(
        &mut self,
        model: &mut InheritanceModel,
        fam: &NuclearFamily,
        valid: &ValidParentalGenotypes,
        propagate: bool,
    ) {
        let graph = self.graph;
        let phased = valid.phased();

        if valid.mother_valid().is_empty() {
            Self::remove_parental(model, graph.slot(fam.mother), valid.mother_invalid(), phased);
            if propagate {
                self.parent_set_move(fam.mother, fam.father);
            }
        }

        if valid.father_valid().is_empty() {
            Self::remove_parental(model, graph.slot(fam.father), valid.father_invalid(), phased);
            if propagate {
                self.parent_set_move(fam.father, fam.mother);
            }
        }

        let changed = self.remove_child_positions(model, |c| {
            if !c.genotypes.is_empty() && c.mask.none() {
                (0..c.genotypes.len()).collect()
            } else {
                Vec::new()
            }
        });
        if propagate {
            for child in changed {
                self.child_set_move(child);
            }
        }
    }

    /// Defer the parental family of `member` and its families with mates
    /// other than `mate`.
    fn parent_set_move(&mut self, member: MemberIndex, mate: MemberIndex) {
        if let Some(family) = self.graph.parental_family(member) {
            self.queues.defer(family);
        }
        for &(other, family) in self.graph.mates(member) {
            if other != mate {
                self.queues.defer(family);
            }
        }
    }

    /// Defer every family in which `member` is a parent.
    fn child_set_move(&mut self, member: MemberIndex) {
        for &(_, family) in self.graph.mates(member) {
            self.queues.defer(family);
        }
    }

    /// Report males left without any genotype on a sex-linked marker.
    fn check_sex_linked(&mut self, model: &InheritanceModel, marker: usize, sub: SubpedigreeIndex) -> bool {
        let graph = self.graph;
        let mut found = false;

        for &member in &graph.subpedigree(sub).members {
            if graph.sex(member) != Sex::Male {
                continue;
            }
            let slot = graph.slot(member);
            if slot > model.phenotype_count() || model.phased_count(slot) > 0 {
                continue;
            }
            found = true;

            if let Some(family) = graph.parental_family(member) {
                self.errors.add_child_error(
                    family,
                    graph.family(family),
                    member,
                    marker,
                    ErrorKind::XyLinked,
                );
            } else if let Some(&(_, family)) = graph.mates(member).first() {
                self.errors
                    .add_family_error(family, graph.family(family), marker, ErrorKind::XyLinked);
            } else {
                log::debug!(
                    "member '{}' has no genotype at sex-linked marker {}",
                    graph.member_id(member),
                    marker
                );
            }
        }

        found
    }

    fn trace_family(&self, family: FamilyIndex, fam: &NuclearFamily, valid: &ValidParentalGenotypes) {
        let graph = self.graph;
        log::trace!(
            "family {}: {} x {}, {} pairs, mother {} valid / {} invalid, father {} valid / {} invalid",
            family,
            graph.member_id(fam.mother),
            graph.member_id(fam.father),
            valid.pairs().len(),
            valid.mother_valid().len(),
            valid.mother_invalid().len(),
            valid.father_valid().len(),
            valid.father_invalid().len()
        );
        log::trace!("  pairs: {:?}", valid.pairs());
        log::trace!("  MV: {:?} MI: {:?}", valid.mother_valid(), valid.mother_invalid());
        log::trace!("  FV: {:?} FI: {:?}", valid.father_valid(), valid.father_invalid());
        for child in &self.children {
            log::trace!(
                "  child {}: {} of {} genotypes kept",
                graph.member_id(child.member),
                child.mask.count_set(),
                child.genotypes.len()
            );
        }
    }
}

/// Whether every slot of the family has a row in `model`.
fn fits_model(slots: &FamilySlots, model: &InheritanceModel) -> bool {
    let max_slot = model.phenotype_count();
    slots.mother <= max_slot
        && slots.father <= max_slot
        && slots.children.iter().all(|c| c.slot <= max_slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::{Allele, MemberSpec, UnphasedGenotype};

    type Observed<'a> = &'a [(&'a str, &'a [(usize, usize)])];

    fn graph(records: &[(&str, Option<&str>, Option<&str>, Sex)]) -> PedigreeGraph {
        let specs: Vec<MemberSpec> = records
            .iter()
            .map(|&(id, father, mother, sex)| MemberSpec::new("P", id, father, mother, sex))
            .collect();
        PedigreeGraph::from_records(&specs).unwrap()
    }

    /// Model local to subpedigree 0; unlisted members are missing.
    fn local_model(g: &PedigreeGraph, n_alleles: usize, linkage: Linkage, observed: Observed<'_>) -> InheritanceModel {
        let alleles = (0..n_alleles)
            .map(|a| Allele::new((a + 1).to_string(), 1.0 / n_alleles as f64))
            .collect();
        let mut model = InheritanceModel::new("m", alleles).unwrap().with_linkage(linkage);

        for &member in &g.subpedigree(0).members {
            let id = g.member_id(member);
            let slot = model.add_phenotype(id, false);
            assert_eq!(slot, g.slot(member));
            match observed.iter().find(|(name, _)| *name == id) {
                Some((_, genotypes)) => {
                    model.set_strict(slot, true).unwrap();
                    for &(a, b) in genotypes.iter() {
                        model
                            .set_penetrance(slot, UnphasedGenotype::new(a, b), 1.0)
                            .unwrap();
                    }
                }
                None => model.copy_missing_sexed(slot, g.sex(member)).unwrap(),
            }
        }
        model
    }

    fn unphased_ids(model: &InheritanceModel, slot: Slot) -> Vec<UnphasedGenotype> {
        model
            .unphased_penetrances(slot)
            .into_iter()
            .map(|(g, _)| g)
            .collect()
    }

    fn snapshot(model: &InheritanceModel) -> Vec<Vec<GenotypeId>> {
        (0..=model.phenotype_count())
            .map(|s| model.phased_penetrances(s).map(|(g, _)| g.id()).collect())
            .collect()
    }

    fn eliminator(g: &PedigreeGraph) -> GenotypeEliminator<'_> {
        let mut gelim = GenotypeEliminator::new(g, EliminationConfig::default());
        gelim.set_subpedigree(0).unwrap();
        gelim
    }

    fn trio_graph() -> PedigreeGraph {
        graph(&[
            ("mom", None, None, Sex::Female),
            ("dad", None, None, Sex::Male),
            ("kid1", Some("dad"), Some("mom"), Sex::Female),
            ("kid2", Some("dad"), Some("mom"), Sex::Male),
            ("kid3", Some("dad"), Some("mom"), Sex::Male),
        ])
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FamilyStatus::Consistent.code(), 0);
        assert_eq!(FamilyStatus::Unresolved.code(), 1);
        assert_eq!(FamilyStatus::ParentsExhausted.code(), 2);
        assert_eq!(FamilyStatus::Inconsistent.code(), 3);
        assert_eq!(ProcessStatus::Uninformative.code(), 1);
        assert_eq!(ProcessStatus::Inconsistent.code(), 2);
    }

    #[test]
    fn test_incompatible_child_is_blamed() {
        // 1/1 x 1/2 with children 2/2, 1/2 and one without genotypes.
        // No parental pair fits, but child masks from all pairs single out
        // kid1, so kid1 is flagged and both parents are labeled with it.
        // Parents alone are flagged only when no child stands out.
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[
                ("mom", &[(0, 0)]),
                ("dad", &[(0, 1)]),
                ("kid1", &[(1, 1)]),
                ("kid2", &[(0, 1)]),
                ("kid3", &[]),
            ],
        );
        let mut gelim = eliminator(&g);

        let status =
            gelim.process_family(&mut model, 0, 0, ErrorKind::Mendelian, RemovalPolicy::None, false);
        assert_eq!(status, FamilyStatus::Inconsistent);
        assert_eq!(status.code(), 3);

        let rec = gelim.errors().family_errors(0).unwrap();
        assert_eq!(rec.mother().error(0), Some(ErrorKind::Mendelian));
        assert_eq!(rec.father().error(0), Some(ErrorKind::Mendelian));
        let kid1 = g.member_index("P", "kid1").unwrap();
        assert_eq!(rec.inconsistent_children(0).collect::<Vec<_>>(), vec![kid1]);
    }

    #[test]
    fn test_family_level_error_without_guilty_child() {
        // Alleles 1, 2, 3. Mother 1/2, father 1/1 or 3/3, children 1/1 and
        // 2/3: each child fits one of the pairs, no pair fits both.
        let g = trio_graph();
        let mut model = local_model(
            &g,
            3,
            Linkage::Autosomal,
            &[
                ("mom", &[(0, 1)]),
                ("dad", &[(0, 0), (2, 2)]),
                ("kid1", &[(0, 0)]),
                ("kid2", &[(1, 2)]),
            ],
        );
        let mut gelim = eliminator(&g);
        let status =
            gelim.process_family(&mut model, 4, 0, ErrorKind::Mendelian, RemovalPolicy::None, false);
        assert_eq!(status, FamilyStatus::Inconsistent);

        let rec = gelim.errors().family_errors(0).unwrap();
        assert_eq!(rec.mother().error(4), Some(ErrorKind::Mendelian));
        assert_eq!(rec.father().error(4), Some(ErrorKind::Mendelian));
        assert_eq!(rec.inconsistent_children(4).count(), 0);
    }

    #[test]
    fn test_single_family_is_reduced_exactly() {
        // Children 1/1 and 2/2 force both parents to 1/2.
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[("kid1", &[(0, 0)]), ("kid2", &[(1, 1)])],
        );
        let mut gelim = eliminator(&g);

        let status = gelim.process_family(
            &mut model,
            0,
            0,
            ErrorKind::Mendelian,
            RemovalPolicy::Genotype,
            true,
        );
        assert_eq!(status, FamilyStatus::Consistent);

        let het = UnphasedGenotype::new(0, 1);
        assert_eq!(unphased_ids(&model, g.slot(0)), vec![het]);
        assert_eq!(unphased_ids(&model, g.slot(1)), vec![het]);
        // The missing third child keeps every genotype 1/2 x 1/2 can give.
        assert_eq!(model.phased_count(g.slot(4)), 4);
        assert!(gelim.errors().family_errors(0).is_none());
    }

    #[test]
    fn test_child_genotypes_are_pruned() {
        // 1/1 x 1/1 leaves a missing child only 1/1.
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[("mom", &[(0, 0)]), ("dad", &[(0, 0)])],
        );
        let mut gelim = eliminator(&g);
        gelim.process_family(&mut model, 0, 0, ErrorKind::Mendelian, RemovalPolicy::Genotype, true);

        for kid in 2..5 {
            assert_eq!(unphased_ids(&model, g.slot(kid)), vec![UnphasedGenotype::new(0, 0)]);
        }
    }

    #[test]
    fn test_removal_none_leaves_model_untouched() {
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[("kid1", &[(0, 0)]), ("kid2", &[(1, 1)])],
        );
        let before = snapshot(&model);
        let mut gelim = eliminator(&g);
        gelim.process_family(&mut model, 0, 0, ErrorKind::Mendelian, RemovalPolicy::None, true);
        assert_eq!(snapshot(&model), before);
        assert!(gelim.queues().is_empty());
    }

    #[test]
    fn test_removal_all_purges_inconsistent_child() {
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[
                ("mom", &[(0, 0)]),
                ("dad", &[(0, 1)]),
                ("kid1", &[(1, 1)]),
                ("kid2", &[(0, 1)]),
            ],
        );
        let mut gelim = eliminator(&g);
        let status =
            gelim.process_family(&mut model, 0, 0, ErrorKind::Mendelian, RemovalPolicy::All, false);
        assert_eq!(status, FamilyStatus::Inconsistent);

        // No valid pair: both parents and the guilty child lose everything.
        assert_eq!(model.phased_count(g.slot(0)), 0);
        assert_eq!(model.phased_count(g.slot(1)), 0);
        assert_eq!(model.phased_count(g.slot(2)), 0);
        // kid2 had a surviving genotype under the unrestricted pairs.
        assert_eq!(model.phased_count(g.slot(3)), 2);

        let again =
            gelim.process_family(&mut model, 0, 0, ErrorKind::Mendelian, RemovalPolicy::All, false);
        assert_eq!(again, FamilyStatus::ParentsExhausted);
    }

    #[test]
    fn test_unresolved_family() {
        let g = graph(&[
            ("a", None, None, Sex::Female),
            ("b", None, None, Sex::Male),
            ("c", Some("b"), Some("a"), Sex::Male),
            ("x", None, None, Sex::Female),
            ("y", None, None, Sex::Male),
            ("z", Some("y"), Some("x"), Sex::Male),
        ]);
        assert_eq!(g.n_subpedigrees(), 2);
        let mut model = local_model(&g, 2, Linkage::Autosomal, &[]);
        let mut gelim = eliminator(&g);
        let other = g.family_of(3, 4).unwrap();
        let status =
            gelim.process_family(&mut model, 0, other, ErrorKind::Mendelian, RemovalPolicy::Genotype, true);
        assert_eq!(status, FamilyStatus::Unresolved);
        assert_eq!(
            gelim.process_family(&mut model, 0, 99, ErrorKind::Mendelian, RemovalPolicy::Genotype, true),
            FamilyStatus::Unresolved
        );
    }

    #[test]
    fn test_model_without_family_slots() {
        // Only mom and dad have rows; the children's slots are missing.
        let g = trio_graph();
        let alleles = vec![Allele::new("1", 0.5), Allele::new("2", 0.5)];
        let mut model = InheritanceModel::new("short", alleles).unwrap();
        let mom = model.add_phenotype("mom", true);
        model.set_penetrance(mom, UnphasedGenotype::new(0, 0), 1.0).unwrap();
        let dad = model.add_phenotype("dad", false);
        model.copy_missing_sexed(dad, Sex::Male).unwrap();

        let mut gelim = eliminator(&g);
        assert!(!gelim.informative_family(&model, 0));
        assert_eq!(
            gelim.process_family(&mut model, 0, 0, ErrorKind::Mendelian, RemovalPolicy::Genotype, true),
            FamilyStatus::Unresolved
        );
        assert_eq!(gelim.process(&mut model, 0).unwrap(), ProcessStatus::Consistent);
        assert!(gelim.queues().is_empty());
        assert_eq!(model.unphased_count(mom), 1);
    }

    #[test]
    fn test_removal_defers_other_mate_family_once() {
        // Alleles 1, 2, 3. mom has children with f1 and with f2.
        let g = graph(&[
            ("mom", None, None, Sex::Female),
            ("f1", None, None, Sex::Male),
            ("f2", None, None, Sex::Male),
            ("c1", Some("f1"), Some("mom"), Sex::Male),
            ("c2", Some("f2"), Some("mom"), Sex::Male),
        ]);
        let first = g.family_of(0, 1).unwrap();
        let second = g.family_of(0, 2).unwrap();

        let mut model = local_model(
            &g,
            3,
            Linkage::Autosomal,
            &[("f1", &[(0, 0)]), ("c1", &[(0, 1), (0, 2)])],
        );
        let mut gelim = eliminator(&g);

        // mom must carry 2 or 3: she loses 1/1.
        let status = gelim.process_family(
            &mut model,
            0,
            first,
            ErrorKind::Mendelian,
            RemovalPolicy::Genotype,
            true,
        );
        assert_eq!(status, FamilyStatus::Consistent);
        assert_eq!(model.unphased_count(g.slot(0)), 5);
        assert_eq!(gelim.queues().deferred(), vec![second]);

        // Narrow c1 to 1/2 only: mom loses more, the family is not queued twice.
        model.remove_unphased(g.slot(3), UnphasedGenotype::new(0, 2).id());
        gelim.process_family(
            &mut model,
            0,
            first,
            ErrorKind::Mendelian,
            RemovalPolicy::Genotype,
            true,
        );
        assert_eq!(model.unphased_count(g.slot(0)), 3);
        assert_eq!(gelim.queues().deferred(), vec![second]);
        assert_eq!(gelim.queues().deferred_len(), 1);
        assert!(!gelim.queues().is_active(second));
    }

    #[test]
    fn test_process_resumes_deferred_families() {
        // mom has children with f1 and f2; c2 x w -> gc with gc 3/3.
        let g = graph(&[
            ("mom", None, None, Sex::Female),
            ("f1", None, None, Sex::Male),
            ("f2", None, None, Sex::Male),
            ("c1", Some("f1"), Some("mom"), Sex::Male),
            ("c2", Some("f2"), Some("mom"), Sex::Male),
            ("w", None, None, Sex::Female),
            ("gc", Some("c2"), Some("w"), Sex::Male),
        ]);
        let first = g.family_of(0, 1).unwrap();
        let second = g.family_of(0, 2).unwrap();
        let third = g.family_of(5, 4).unwrap();

        let mut model = local_model(
            &g,
            3,
            Linkage::Autosomal,
            &[("f1", &[(0, 0)]), ("c1", &[(0, 1), (0, 2)]), ("gc", &[(2, 2)])],
        );
        let mut gelim = eliminator(&g);
        assert!(gelim.informative_family(&model, third));

        gelim.process_family(
            &mut model,
            0,
            first,
            ErrorKind::Mendelian,
            RemovalPolicy::Genotype,
            true,
        );
        assert_eq!(gelim.queues().deferred(), vec![second]);

        // Pending work is resumed: only the deferred family runs, so the
        // informative third family is left alone.
        let w = g.slot(5);
        let status = gelim.process(&mut model, 0).unwrap();
        assert_eq!(status, ProcessStatus::Consistent);
        assert!(gelim.queues().is_empty());
        assert_eq!(model.unphased_count(g.slot(0)), 5);
        assert_eq!(model.unphased_count(w), model.full_unphased_count());

        // With nothing pending the next call seeds every informative family.
        gelim.process(&mut model, 0).unwrap();
        assert!(gelim.queues().is_empty());
        assert_eq!(model.unphased_count(w), 3);
    }

    #[test]
    fn test_process_propagates_across_generations() {
        // Grandparents 1/1 x 1/1 pin mom to 1/1; mom x dad(2/2) pins kid.
        let g = graph(&[
            ("gm", None, None, Sex::Female),
            ("gf", None, None, Sex::Male),
            ("mom", Some("gf"), Some("gm"), Sex::Female),
            ("dad", None, None, Sex::Male),
            ("kid", Some("dad"), Some("mom"), Sex::Male),
        ]);
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[("gm", &[(0, 0)]), ("gf", &[(0, 0)]), ("dad", &[(1, 1)])],
        );
        let mut gelim = eliminator(&g);

        let status = gelim.process(&mut model, 0).unwrap();
        assert_eq!(status, ProcessStatus::Consistent);
        assert_eq!(unphased_ids(&model, g.slot(2)), vec![UnphasedGenotype::new(0, 0)]);
        assert_eq!(unphased_ids(&model, g.slot(4)), vec![UnphasedGenotype::new(0, 1)]);
        assert!(gelim.queues().is_empty());

        let tally = gelim.errors().tally(0).unwrap();
        assert_eq!(tally.checked, vec![1]);
        assert_eq!(tally.informative, vec![1]);
        assert_eq!(tally.inconsistent, vec![0]);
    }

    #[test]
    fn test_process_is_idempotent() {
        let g = graph(&[
            ("gm", None, None, Sex::Female),
            ("gf", None, None, Sex::Male),
            ("mom", Some("gf"), Some("gm"), Sex::Female),
            ("dad", None, None, Sex::Male),
            ("kid1", Some("dad"), Some("mom"), Sex::Male),
            ("kid2", Some("dad"), Some("mom"), Sex::Female),
        ]);
        let mut model = local_model(
            &g,
            3,
            Linkage::Autosomal,
            &[("gm", &[(0, 1)]), ("kid1", &[(1, 2)]), ("kid2", &[(0, 2)])],
        );
        let mut gelim = eliminator(&g);

        let first = gelim.process(&mut model, 0).unwrap();
        let settled = snapshot(&model);
        let second = gelim.process(&mut model, 0).unwrap();

        assert_eq!(first, second);
        assert_eq!(snapshot(&model), settled);
    }

    #[test]
    fn test_process_reports_inconsistency() {
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::Autosomal,
            &[("mom", &[(0, 0)]), ("dad", &[(0, 0)]), ("kid1", &[(1, 1)])],
        );
        let mut gelim = eliminator(&g);

        let status = gelim.process(&mut model, 2).unwrap();
        assert_eq!(status, ProcessStatus::Inconsistent);
        assert_eq!(status.code(), 2);
        assert_eq!(gelim.errors().incon_family_count(), 1);
        assert_eq!(gelim.errors().tally(0).unwrap().inconsistent, vec![0, 0, 1]);
    }

    #[test]
    fn test_uninformative_subpedigree_seeds_nothing() {
        let g = trio_graph();
        let mut model = local_model(&g, 2, Linkage::Autosomal, &[]);
        let mut gelim = eliminator(&g);
        assert!(!gelim.informative_family(&model, 0));

        let before = snapshot(&model);
        assert_eq!(gelim.process(&mut model, 0).unwrap(), ProcessStatus::Consistent);
        assert_eq!(snapshot(&model), before);

        gelim.mark_uninformative(1).unwrap();
        let tally = gelim.errors().tally(0).unwrap();
        assert_eq!(tally.checked, vec![1, 1]);
        assert_eq!(tally.informative, vec![1, 0]);
    }

    #[test]
    fn test_process_requires_subpedigree() {
        let g = trio_graph();
        let mut model = local_model(&g, 2, Linkage::Autosomal, &[]);
        let mut gelim = GenotypeEliminator::new(&g, EliminationConfig::default());
        assert!(gelim.process(&mut model, 0).is_err());
        assert!(gelim.set_subpedigree(7).is_err());
    }

    #[test]
    fn test_x_linked_son_takes_mothers_allele() {
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::XLinked,
            &[("mom", &[(1, 1)])],
        );
        let mut gelim = eliminator(&g);
        assert_eq!(gelim.process(&mut model, 0).unwrap(), ProcessStatus::Consistent);

        // Sons are hemizygous 2; the daughter gets 2 from mom.
        assert_eq!(unphased_ids(&model, g.slot(3)), vec![UnphasedGenotype::new(1, 1)]);
        let daughter = unphased_ids(&model, g.slot(2));
        assert!(daughter.iter().all(|u| u.alleles().contains(&1)));
    }

    #[test]
    fn test_x_linked_heterozygous_male_is_reported() {
        let g = trio_graph();
        let mut model = local_model(&g, 2, Linkage::XLinked, &[("kid2", &[])]);
        let mut gelim = eliminator(&g);

        assert_eq!(gelim.process(&mut model, 0).unwrap(), ProcessStatus::Inconsistent);
        assert!(gelim.errors().has_sex_linked_errors());
        let rec = gelim.errors().family_errors(0).unwrap();
        assert_eq!(rec.inconsistent_children(0).collect::<Vec<_>>(), vec![3]);
        assert_eq!(rec.children()[1].error(0), Some(ErrorKind::XyLinked));

        let mut quiet = GenotypeEliminator::new(&g, EliminationConfig::new().check_sex_linkage(false));
        quiet.set_subpedigree(0).unwrap();
        quiet.process(&mut model, 0).unwrap();
        assert!(!quiet.errors().has_sex_linked_errors());
    }

    #[test]
    fn test_y_linked_daughters_are_unconstrained() {
        let g = trio_graph();
        let mut model = local_model(
            &g,
            2,
            Linkage::YLinked,
            &[("dad", &[(1, 1)]), ("kid1", &[(0, 0)])],
        );
        let mut gelim = eliminator(&g);
        assert_eq!(gelim.process(&mut model, 0).unwrap(), ProcessStatus::Consistent);
        assert_eq!(unphased_ids(&model, g.slot(3)), vec![UnphasedGenotype::new(1, 1)]);
        assert_eq!(unphased_ids(&model, g.slot(2)), vec![UnphasedGenotype::new(0, 0)]);
    }
}
