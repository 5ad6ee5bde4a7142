use std::collections::BTreeSet;

use crate::genetics::InheritanceModel;
use crate::types::{AlleleId, Slot};

/// Decides which alleles of a subpedigree-local model can be merged into a
/// single placeholder allele without losing information.
pub trait AlleleRemapper {
    /// Alleles to merge.
    fn alleles_to_collapse(&self, model: &InheritanceModel) -> BTreeSet<AlleleId>;

    /// The remapped model, or `None` when fewer than two alleles would be
    /// merged.
    fn remap(&self, model: &InheritanceModel) -> Option<InheritanceModel> {
        let collapse = self.alleles_to_collapse(model);
        if collapse.len() < 2 {
            return None;
        }
        log::debug!(
            "model '{}': collapsing {} of {} alleles",
            model.name(),
            collapse.len(),
            model.allele_count()
        );
        Some(model.remap(&collapse))
    }
}

/// Collapses the alleles that no observed phenotype can carry.
///
/// Only strict (observed) phenotype rows count; missing members allow
/// everything and would keep every allele alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsentAlleleRemapper;

impl AbsentAlleleRemapper {
    /// Alleles occurring in some genotype of some strict phenotype.
    pub fn present_alleles(model: &InheritanceModel) -> BTreeSet<AlleleId> {
        (1..=model.phenotype_count())
            .filter(|&slot: &Slot| model.strict_phenotype(slot))
            .flat_map(|slot| model.phased_penetrances(slot))
            .flat_map(|(g, _)| g.alleles())
            .collect()
    }
}

impl AlleleRemapper for AbsentAlleleRemapper {
    fn alleles_to_collapse(&self, model: &InheritanceModel) -> BTreeSet<AlleleId> {
        let present = Self::present_alleles(model);
        (0..model.allele_count())
            .filter(|a| !present.contains(a))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::{Allele, Sex, UnphasedGenotype, REMAP_ALLELE};

    fn model() -> InheritanceModel {
        let alleles = ["A", "B", "C", "D"]
            .iter()
            .map(|n| Allele::new(*n, 0.25))
            .collect();
        let mut m = InheritanceModel::new("m", alleles).unwrap();
        let s1 = m.add_phenotype("000000", true);
        m.set_penetrance(s1, UnphasedGenotype::new(0, 1), 1.0).unwrap();
        let s2 = m.add_phenotype("000001", false);
        m.copy_missing_sexed(s2, Sex::Female).unwrap();
        m
    }

    #[test]
    fn test_absent_alleles_collapse() {
        let m = model();
        let remapper = AbsentAlleleRemapper;
        let collapse = remapper.alleles_to_collapse(&m);
        assert_eq!(collapse, BTreeSet::from([2, 3]));

        let remapped = remapper.remap(&m).unwrap();
        assert_eq!(remapped.allele_count(), 3);
        assert_eq!(remapped.alleles()[2].name, REMAP_ALLELE);
        // The missing member now ranges over 3 x 3 phased genotypes.
        assert_eq!(remapped.phased_count(2), 9);
        assert_eq!(remapped.phased_count(1), 2);
    }

    #[test]
    fn test_single_absent_allele_is_kept() {
        let mut m = model();
        m.set_penetrance(1, UnphasedGenotype::new(2, 2), 1.0).unwrap();
        assert_eq!(AbsentAlleleRemapper.alleles_to_collapse(&m).len(), 1);
        assert!(AbsentAlleleRemapper.remap(&m).is_none());
    }
}
