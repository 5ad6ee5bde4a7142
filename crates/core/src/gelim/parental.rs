use crate::genetics::{ChildGenotypeSet, FamilySlots, InheritanceModel, PhasedGenotype, Sex, UnphasedGenotype};
use crate::types::{AlleleId, GenotypeId, Slot};

use super::mask::GenotypeMask;

/// A (mother genotype id, father genotype id) combination.
pub type GenotypePair = (GenotypeId, GenotypeId);

/// Parental genotype combinations of one nuclear family that are Mendelian
/// consistent with every child's remaining genotypes.
///
/// Each parent's genotypes, as enumerated when the set was built, are split
/// into a valid and an invalid list: a genotype is valid iff it takes part in
/// at least one valid pair.
#[derive(Debug, Clone, Default)]
pub struct ValidParentalGenotypes {
    phased: bool,
    pairs: Vec<GenotypePair>,
    mother_valid: Vec<GenotypeId>,
    mother_invalid: Vec<GenotypeId>,
    father_valid: Vec<GenotypeId>,
    father_invalid: Vec<GenotypeId>,
}

impl ValidParentalGenotypes {
    /// Whether the genotype ids are phased ids (otherwise unphased).
    pub fn phased(&self) -> bool {
        self.phased
    }

    /// At least one valid pair exists.
    pub fn is_consistent(&self) -> bool {
        !self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[GenotypePair] {
        &self.pairs
    }

    pub fn mother_valid(&self) -> &[GenotypeId] {
        &self.mother_valid
    }

    pub fn mother_invalid(&self) -> &[GenotypeId] {
        &self.mother_invalid
    }

    pub fn father_valid(&self) -> &[GenotypeId] {
        &self.father_valid
    }

    pub fn father_invalid(&self) -> &[GenotypeId] {
        &self.father_invalid
    }
}

/// Enumerate every (mother, father) genotype combination currently allowed
/// by `model` and keep those for which each child has at least one genotype
/// in the combination's Mendelian child set.
///
/// Children without any enumerated genotype are skipped: they carry no
/// information and would otherwise invalidate every combination. The cost is
/// `O(|Gm| x |Gf| x children)`.
pub fn find_valid_pairs(
    family: &FamilySlots,
    model: &InheritanceModel,
    phased: bool,
) -> ValidParentalGenotypes {
    let linkage = model.linkage();
    let mother = parental_genotypes(model, family.mother, phased);
    let father = parental_genotypes(model, family.father, phased);

    let children: Vec<(Sex, Vec<PhasedGenotype>)> = family
        .children
        .iter()
        .map(|c| {
            let genotypes: Vec<PhasedGenotype> =
                model.phased_penetrances(c.slot).map(|(g, _)| g).collect();
            (c.sex, genotypes)
        })
        .filter(|(_, genotypes)| !genotypes.is_empty())
        .collect();

    let mut mother_bits = GenotypeMask::new(mother.len());
    let mut father_bits = GenotypeMask::new(father.len());
    let mut pairs = Vec::new();

    for (i, &(gm, am)) in mother.iter().enumerate() {
        for (j, &(gf, af)) in father.iter().enumerate() {
            let valid = children.iter().all(|(sex, genotypes)| {
                match ChildGenotypeSet::new(am, af, *sex, linkage) {
                    Some(cg) => genotypes.iter().any(|&g| cg.contains(g)),
                    None => true,
                }
            });

            if valid {
                pairs.push((gm, gf));
                mother_bits.set(i);
                father_bits.set(j);
            }
        }
    }

    let (mother_valid, mother_invalid) = partition(&mother, &mother_bits);
    let (father_valid, father_invalid) = partition(&father, &father_bits);

    ValidParentalGenotypes {
        phased,
        pairs,
        mother_valid,
        mother_invalid,
        father_valid,
        father_invalid,
    }
}

/// Every (mother, father) combination of the currently enumerated parental
/// genotypes, valid or not.
pub fn all_parental_pairs(
    family: &FamilySlots,
    model: &InheritanceModel,
    phased: bool,
) -> Vec<GenotypePair> {
    let mother = parental_genotypes(model, family.mother, phased);
    let father = parental_genotypes(model, family.father, phased);
    mother
        .iter()
        .flat_map(|&(gm, _)| father.iter().map(move |&(gf, _)| (gm, gf)))
        .collect()
}

/// Alleles of a parental genotype id.
pub fn genotype_alleles(id: GenotypeId, phased: bool) -> [AlleleId; 2] {
    if phased {
        PhasedGenotype::from_id(id).alleles()
    } else {
        UnphasedGenotype::from_id(id).alleles()
    }
}

fn parental_genotypes(
    model: &InheritanceModel,
    slot: Slot,
    phased: bool,
) -> Vec<(GenotypeId, [AlleleId; 2])> {
    if phased {
        model
            .phased_penetrances(slot)
            .map(|(g, _)| (g.id(), g.alleles()))
            .collect()
    } else {
        model
            .unphased_penetrances(slot)
            .into_iter()
            .map(|(g, _)| (g.id(), g.alleles()))
            .collect()
    }
}

fn partition(
    genotypes: &[(GenotypeId, [AlleleId; 2])],
    bits: &GenotypeMask,
) -> (Vec<GenotypeId>, Vec<GenotypeId>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for (i, &(id, _)) in genotypes.iter().enumerate() {
        if bits.get(i) {
            valid.push(id);
        } else {
            invalid.push(id);
        }
    }
    (valid, invalid)
}
