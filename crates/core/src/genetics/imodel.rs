use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GelimError, Result};
use crate::types::{AlleleId, GenotypeId, Penetrance, Slot};

use super::genotype::{
    phased_genotype_count, unphased_genotype_count, Allele, Linkage, PhasedGenotype,
    UnphasedGenotype,
};
use super::pedigree::Sex;

/// Row 0 of every model: penetrance 1.0 on every genotype.
pub const MISSING_PHENOTYPE: Slot = 0;

/// Name of the allele that absorbs collapsed alleles during remapping.
pub const REMAP_ALLELE: &str = "~remap";

/// One phenotype row: the non-zero penetrances of its phased genotypes.
#[derive(Debug, Clone)]
struct PhenotypeRow {
    name: String,
    /// Whether the row carries observed data (as opposed to "missing").
    strict: bool,
    penetrance: BTreeMap<GenotypeId, Penetrance>,
}

/// Inheritance model for one marker: alleles, linkage, and a table mapping
/// each phenotype row to the genotypes it allows.
///
/// Only non-zero penetrances are stored, so the enumerated genotypes of a
/// row are exactly its possible genotypes. The unphased view is derived from
/// the phased one: an unphased genotype is enumerated while at least one of
/// its phased orientations is.
#[derive(Debug, Clone)]
pub struct InheritanceModel {
    name: String,
    alleles: Vec<Allele>,
    linkage: Linkage,
    rows: Vec<PhenotypeRow>,
}

impl InheritanceModel {
    /// Create a model over the given alleles with only the missing phenotype.
    ///
    /// # Errors
    /// Returns an error if there are no alleles or an allele name repeats.
    pub fn new(name: &str, alleles: Vec<Allele>) -> Result<Self> {
        if alleles.is_empty() {
            return Err(GelimError::Model(format!(
                "Model '{}' must have at least one allele",
                name
            )));
        }
        let mut names = BTreeSet::new();
        for a in &alleles {
            if !names.insert(a.name.as_str()) {
                return Err(GelimError::Model(format!(
                    "Duplicate allele '{}' in model '{}'",
                    a.name, name
                )));
            }
        }

        let full = phased_genotype_count(alleles.len());
        let missing = PhenotypeRow {
            name: String::new(),
            strict: false,
            penetrance: (0..full).map(|id| (id, 1.0)).collect(),
        };

        Ok(Self {
            name: name.to_string(),
            alleles,
            linkage: Linkage::Autosomal,
            rows: vec![missing],
        })
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn set_linkage(&mut self, linkage: Linkage) {
        self.linkage = linkage;
    }

    pub fn allele_count(&self) -> usize {
        self.alleles.len()
    }

    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    pub fn allele_id(&self, name: &str) -> Option<AlleleId> {
        self.alleles.iter().position(|a| a.name == name)
    }

    /// Number of phased genotypes an unconstrained row enumerates.
    pub fn full_phased_count(&self) -> usize {
        phased_genotype_count(self.alleles.len())
    }

    /// Number of unphased genotypes an unconstrained row enumerates.
    pub fn full_unphased_count(&self) -> usize {
        unphased_genotype_count(self.alleles.len())
    }

    /// Number of phenotype rows, not counting the missing phenotype. Valid
    /// slots are `0..=phenotype_count()`.
    pub fn phenotype_count(&self) -> usize {
        self.rows.len() - 1
    }

    /// Add an empty phenotype row (no possible genotypes) and return its slot.
    pub fn add_phenotype(&mut self, name: &str, strict: bool) -> Slot {
        self.rows.push(PhenotypeRow {
            name: name.to_string(),
            strict,
            penetrance: BTreeMap::new(),
        });
        self.rows.len() - 1
    }

    pub fn phenotype_name(&self, slot: Slot) -> Option<&str> {
        self.rows.get(slot).map(|r| r.name.as_str())
    }

    pub fn phenotype_id(&self, name: &str) -> Option<Slot> {
        self.rows
            .iter()
            .skip(1)
            .position(|r| r.name == name)
            .map(|p| p + 1)
    }

    pub fn strict_phenotype(&self, slot: Slot) -> bool {
        self.rows.get(slot).map_or(false, |r| r.strict)
    }

    pub fn set_strict(&mut self, slot: Slot, strict: bool) -> Result<()> {
        self.row_mut(slot)?.strict = strict;
        Ok(())
    }

    /// Set the penetrance of both phased orientations of `g`.
    pub fn set_penetrance(&mut self, slot: Slot, g: UnphasedGenotype, p: Penetrance) -> Result<()> {
        let (a, b) = g.phased_forms();
        self.set_phased_penetrance(slot, a, p)?;
        self.set_phased_penetrance(slot, b, p)
    }

    pub fn set_phased_penetrance(
        &mut self,
        slot: Slot,
        g: PhasedGenotype,
        p: Penetrance,
    ) -> Result<()> {
        self.check_genotype(g)?;
        let row = self.row_mut(slot)?;
        if p == 0.0 {
            row.penetrance.remove(&g.id());
        } else {
            row.penetrance.insert(g.id(), p);
        }
        Ok(())
    }

    pub fn phased_penetrance(&self, slot: Slot, id: GenotypeId) -> Penetrance {
        self.rows
            .get(slot)
            .and_then(|r| r.penetrance.get(&id).copied())
            .unwrap_or(0.0)
    }

    /// Enumerated phased genotypes of a row, in id order.
    ///
    /// # Panics
    /// Panics if `slot` is out of range.
    pub fn phased_penetrances(
        &self,
        slot: Slot,
    ) -> impl Iterator<Item = (PhasedGenotype, Penetrance)> + '_ {
        self.rows[slot]
            .penetrance
            .iter()
            .map(|(&id, &p)| (PhasedGenotype::from_id(id), p))
    }

    /// Enumerated unphased genotypes of a row, in id order. The penetrance
    /// reported is the larger of the two phased orientations.
    ///
    /// # Panics
    /// Panics if `slot` is out of range.
    pub fn unphased_penetrances(&self, slot: Slot) -> Vec<(UnphasedGenotype, Penetrance)> {
        let mut merged: BTreeMap<GenotypeId, Penetrance> = BTreeMap::new();
        for (g, p) in self.phased_penetrances(slot) {
            let entry = merged.entry(g.unphased().id()).or_insert(p);
            if p > *entry {
                *entry = p;
            }
        }
        merged
            .into_iter()
            .map(|(id, p)| (UnphasedGenotype::from_id(id), p))
            .collect()
    }

    /// # Panics
    /// Panics if `slot` is out of range.
    pub fn phased_count(&self, slot: Slot) -> usize {
        self.rows[slot].penetrance.len()
    }

    /// # Panics
    /// Panics if `slot` is out of range.
    pub fn unphased_count(&self, slot: Slot) -> usize {
        let row = &self.rows[slot];
        row.penetrance
            .keys()
            .filter(|&&id| {
                let g = PhasedGenotype::from_id(id);
                // Count each unphased genotype once: via its first stored
                // orientation.
                g.maternal() <= g.paternal() || !row.penetrance.contains_key(&g.flipped().id())
            })
            .count()
    }

    /// Remove one phased genotype from a row. Returns whether it was present.
    pub fn remove_phased(&mut self, slot: Slot, id: GenotypeId) -> bool {
        self.rows
            .get_mut(slot)
            .map_or(false, |r| r.penetrance.remove(&id).is_some())
    }

    /// Remove both phased orientations of an unphased genotype. Returns
    /// whether anything was removed.
    pub fn remove_unphased(&mut self, slot: Slot, id: GenotypeId) -> bool {
        let (a, b) = UnphasedGenotype::from_id(id).phased_forms();
        let removed_a = self.remove_phased(slot, a.id());
        let removed_b = self.remove_phased(slot, b.id());
        removed_a || removed_b
    }

    /// Copy the penetrance row `src_slot` of `src` into `dst_slot` of this
    /// model, dropping heterozygous genotypes for males on sex-linked markers.
    ///
    /// # Errors
    /// Returns an error if the allele sets differ or a slot is out of range.
    pub fn copy_penetrance_sexed(
        &mut self,
        src: &InheritanceModel,
        src_slot: Slot,
        dst_slot: Slot,
        sex: Sex,
    ) -> Result<()> {
        if !self.same_alleles(src) {
            return Err(GelimError::AlleleMismatch {
                left: self.name.clone(),
                right: src.name.clone(),
            });
        }
        let source = src.rows.get(src_slot).ok_or_else(|| {
            GelimError::Model(format!(
                "Phenotype {} out of range in model '{}'",
                src_slot, src.name
            ))
        })?;
        let hemizygous = self.linkage.is_sex_linked() && sex == Sex::Male;
        let penetrance = source
            .penetrance
            .iter()
            .filter(|(&id, _)| !hemizygous || PhasedGenotype::from_id(id).is_homozygous())
            .map(|(&id, &p)| (id, p))
            .collect();

        self.row_mut(dst_slot)?.penetrance = penetrance;
        Ok(())
    }

    /// Reset a row to this model's missing phenotype.
    pub fn copy_missing_sexed(&mut self, dst_slot: Slot, sex: Sex) -> Result<()> {
        let hemizygous = self.linkage.is_sex_linked() && sex == Sex::Male;
        let penetrance = self.rows[MISSING_PHENOTYPE]
            .penetrance
            .iter()
            .filter(|(&id, _)| !hemizygous || PhasedGenotype::from_id(id).is_homozygous())
            .map(|(&id, &p)| (id, p))
            .collect();
        self.row_mut(dst_slot)?.penetrance = penetrance;
        Ok(())
    }

    /// The row has both possible and impossible genotypes.
    pub fn genotype_informative_phenotype(&self, slot: Slot) -> bool {
        let n = self.phased_count(slot);
        n > 0 && n < self.full_phased_count()
    }

    /// The row discriminates between genotypes at all: either some genotype
    /// is impossible or the penetrances are not uniform.
    pub fn penetrance_informative_phenotype(&self, slot: Slot) -> bool {
        if self.genotype_informative_phenotype(slot) {
            return true;
        }
        let mut values = self.rows[slot].penetrance.values();
        match values.next() {
            Some(&first) => values.any(|&p| p != first),
            None => false,
        }
    }

    pub fn genotype_informative(&self) -> bool {
        (1..self.rows.len()).any(|s| self.genotype_informative_phenotype(s))
    }

    pub fn penetrance_informative(&self) -> bool {
        (1..self.rows.len()).any(|s| self.penetrance_informative_phenotype(s))
    }

    /// Build a model in which every allele of `collapse` is merged into a
    /// single trailing `~remap` allele. Alleles outside the set keep their
    /// relative order; merged penetrances take the larger value.
    ///
    /// Fewer than two alleles to collapse leaves the model unchanged.
    pub fn remap(&self, collapse: &BTreeSet<AlleleId>) -> InheritanceModel {
        let collapse: BTreeSet<AlleleId> = collapse
            .iter()
            .copied()
            .filter(|&a| a < self.alleles.len())
            .collect();
        if collapse.len() < 2 {
            return self.clone();
        }

        let mut alleles = Vec::with_capacity(self.alleles.len() - collapse.len() + 1);
        let mut mapping = vec![0; self.alleles.len()];
        for (id, allele) in self.alleles.iter().enumerate() {
            if !collapse.contains(&id) {
                mapping[id] = alleles.len();
                alleles.push(allele.clone());
            }
        }
        let remap_id = alleles.len();
        let frequency = collapse.iter().map(|&a| self.alleles[a].frequency).sum();
        alleles.push(Allele::new(REMAP_ALLELE, frequency));
        for &a in &collapse {
            mapping[a] = remap_id;
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut penetrance: BTreeMap<GenotypeId, Penetrance> = BTreeMap::new();
                for (&id, &p) in &row.penetrance {
                    let g = PhasedGenotype::from_id(id);
                    let mapped = PhasedGenotype::new(mapping[g.maternal()], mapping[g.paternal()]);
                    let entry = penetrance.entry(mapped.id()).or_insert(p);
                    if p > *entry {
                        *entry = p;
                    }
                }
                PhenotypeRow {
                    name: row.name.clone(),
                    strict: row.strict,
                    penetrance,
                }
            })
            .collect();

        InheritanceModel {
            name: self.name.clone(),
            alleles,
            linkage: self.linkage,
            rows,
        }
    }

    fn same_alleles(&self, other: &InheritanceModel) -> bool {
        self.alleles.len() == other.alleles.len()
            && self
                .alleles
                .iter()
                .zip(&other.alleles)
                .all(|(a, b)| a.name == b.name)
    }

    fn check_genotype(&self, g: PhasedGenotype) -> Result<()> {
        let n = self.alleles.len();
        if g.maternal() >= n || g.paternal() >= n {
            return Err(GelimError::Model(format!(
                "Genotype ({}, {}) uses an allele outside model '{}' ({} alleles)",
                g.maternal(),
                g.paternal(),
                self.name,
                n
            )));
        }
        Ok(())
    }

    fn row_mut(&mut self, slot: Slot) -> Result<&mut PhenotypeRow> {
        let name = &self.name;
        let n = self.rows.len();
        self.rows.get_mut(slot).ok_or_else(|| {
            GelimError::Model(format!(
                "Phenotype {} out of range in model '{}' ({} rows)",
                slot, name, n
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_allele_model() -> InheritanceModel {
        InheritanceModel::new(
            "M1",
            vec![
                Allele::new("1", 0.5),
                Allele::new("2", 0.3),
                Allele::new("3", 0.2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_phenotype_is_full() {
        let model = three_allele_model();
        assert_eq!(model.phased_count(MISSING_PHENOTYPE), 9);
        assert_eq!(model.unphased_count(MISSING_PHENOTYPE), 6);
        assert_eq!(model.full_unphased_count(), 6);
        assert!(!model.penetrance_informative());
    }

    #[test]
    fn test_duplicate_allele_rejected() {
        let result = InheritanceModel::new("M", vec![Allele::new("A", 0.5), Allele::new("A", 0.5)]);
        assert!(result.is_err());
        assert!(InheritanceModel::new("M", vec![]).is_err());
    }

    #[test]
    fn test_unphased_view_follows_phased_removal() {
        let mut model = three_allele_model();
        let slot = model.add_phenotype("1/2", true);
        model.set_penetrance(slot, UnphasedGenotype::new(0, 1), 1.0).unwrap();
        assert_eq!(model.phased_count(slot), 2);
        assert_eq!(model.unphased_count(slot), 1);

        assert!(model.remove_phased(slot, PhasedGenotype::new(0, 1).id()));
        assert_eq!(model.phased_count(slot), 1);
        assert_eq!(model.unphased_count(slot), 1);

        assert!(model.remove_phased(slot, PhasedGenotype::new(1, 0).id()));
        assert_eq!(model.unphased_count(slot), 0);
        assert!(!model.remove_phased(slot, PhasedGenotype::new(1, 0).id()));
    }

    #[test]
    fn test_remove_unphased_drops_both_orientations() {
        let mut model = three_allele_model();
        let slot = model.add_phenotype("x", true);
        model.copy_missing_sexed(slot, Sex::Unknown).unwrap();
        assert!(model.remove_unphased(slot, UnphasedGenotype::new(1, 2).id()));
        assert_eq!(model.phased_count(slot), 7);
        assert_eq!(model.unphased_count(slot), 5);
        assert!(model.genotype_informative_phenotype(slot));
    }

    #[test]
    fn test_informativeness() {
        let mut model = three_allele_model();
        let slot = model.add_phenotype("uniform", true);
        model.copy_missing_sexed(slot, Sex::Unknown).unwrap();
        assert!(!model.penetrance_informative());
        assert!(!model.genotype_informative());

        model
            .set_phased_penetrance(slot, PhasedGenotype::new(2, 2), 0.5)
            .unwrap();
        assert!(model.penetrance_informative());
        assert!(!model.genotype_informative());

        model.remove_phased(slot, PhasedGenotype::new(2, 2).id());
        assert!(model.genotype_informative());
    }

    #[test]
    fn test_copy_penetrance_sexed_x_linked_male() {
        let base = three_allele_model().with_linkage(Linkage::XLinked);
        let mut model = base.clone();
        let slot = model.add_phenotype("00001", false);
        model.copy_penetrance_sexed(&base, MISSING_PHENOTYPE, slot, Sex::Male).unwrap();
        assert_eq!(model.phased_count(slot), 3);
        assert!(model
            .phased_penetrances(slot)
            .all(|(g, _)| g.is_homozygous()));

        let slot_f = model.add_phenotype("00002", false);
        model.copy_penetrance_sexed(&base, MISSING_PHENOTYPE, slot_f, Sex::Female).unwrap();
        assert_eq!(model.phased_count(slot_f), 9);
    }

    #[test]
    fn test_copy_penetrance_rejects_other_alleles() {
        let other = InheritanceModel::new("M2", vec![Allele::new("A", 1.0)]).unwrap();
        let mut model = three_allele_model();
        let slot = model.add_phenotype("p", true);
        assert!(model.copy_penetrance_sexed(&other, 0, slot, Sex::Unknown).is_err());
    }

    #[test]
    fn test_remap_collapses_alleles() {
        let mut model = InheritanceModel::new(
            "M",
            vec![
                Allele::new("A", 0.4),
                Allele::new("B", 0.3),
                Allele::new("C", 0.2),
                Allele::new("D", 0.1),
            ],
        )
        .unwrap();
        let slot = model.add_phenotype("A/B", true);
        model.set_penetrance(slot, UnphasedGenotype::new(0, 1), 1.0).unwrap();

        let collapse: BTreeSet<AlleleId> = [2, 3].into_iter().collect();
        let remapped = model.remap(&collapse);

        assert_eq!(remapped.allele_count(), 3);
        assert_eq!(remapped.alleles()[2].name, REMAP_ALLELE);
        assert_relative_eq!(remapped.alleles()[2].frequency, 0.3, epsilon = 1e-12);
        assert_eq!(remapped.phased_count(MISSING_PHENOTYPE), 9);
        assert_eq!(remapped.phased_count(slot), 2);
        assert_eq!(remapped.phenotype_name(slot), Some("A/B"));

        let single: BTreeSet<AlleleId> = [3].into_iter().collect();
        assert_eq!(model.remap(&single).allele_count(), 4);
    }
}
