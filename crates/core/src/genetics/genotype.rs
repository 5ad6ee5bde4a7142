use serde::Serialize;

use crate::types::{AlleleId, GenotypeId};

use super::pedigree::Sex;

/// Chromosomal location of a marker, which decides how alleles pass from
/// parents to children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Linkage {
    #[default]
    Autosomal,
    XLinked,
    YLinked,
}

impl Linkage {
    pub fn is_sex_linked(self) -> bool {
        !matches!(self, Linkage::Autosomal)
    }
}

/// A named allele with its population frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Allele {
    pub name: String,
    pub frequency: f64,
}

impl Allele {
    pub fn new(name: impl Into<String>, frequency: f64) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// Ordered allele pair: the first allele is maternal, the second paternal.
///
/// Ids are a pure function of the two allele ids and do not depend on how
/// many alleles the model holds, so the ids of a model with `n` alleles are
/// exactly `0..n*n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhasedGenotype {
    maternal: AlleleId,
    paternal: AlleleId,
}

impl PhasedGenotype {
    pub fn new(maternal: AlleleId, paternal: AlleleId) -> Self {
        Self { maternal, paternal }
    }

    pub fn from_id(id: GenotypeId) -> Self {
        let m = isqrt(id);
        let r = id - m * m;
        if r <= m {
            Self::new(m, r)
        } else {
            Self::new(r - m - 1, m)
        }
    }

    pub fn id(&self) -> GenotypeId {
        let m = self.maternal.max(self.paternal);
        if self.maternal == m {
            m * m + self.paternal
        } else {
            m * m + m + 1 + self.maternal
        }
    }

    pub fn maternal(&self) -> AlleleId {
        self.maternal
    }

    pub fn paternal(&self) -> AlleleId {
        self.paternal
    }

    pub fn alleles(&self) -> [AlleleId; 2] {
        [self.maternal, self.paternal]
    }

    pub fn flipped(&self) -> Self {
        Self::new(self.paternal, self.maternal)
    }

    pub fn unphased(&self) -> UnphasedGenotype {
        UnphasedGenotype::new(self.maternal, self.paternal)
    }

    pub fn is_homozygous(&self) -> bool {
        self.maternal == self.paternal
    }
}

/// Unordered allele pair, stored with `first <= second`.
///
/// Ids of a model with `n` alleles are exactly `0..n*(n+1)/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnphasedGenotype {
    first: AlleleId,
    second: AlleleId,
}

impl UnphasedGenotype {
    pub fn new(a: AlleleId, b: AlleleId) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
        }
    }

    pub fn from_id(id: GenotypeId) -> Self {
        // Largest j with j*(j+1)/2 <= id.
        let mut j = (isqrt(8 * id + 1) - 1) / 2;
        while (j + 1) * (j + 2) / 2 <= id {
            j += 1;
        }
        Self::new(id - j * (j + 1) / 2, j)
    }

    pub fn id(&self) -> GenotypeId {
        self.second * (self.second + 1) / 2 + self.first
    }

    pub fn alleles(&self) -> [AlleleId; 2] {
        [self.first, self.second]
    }

    /// The two phased orientations (identical for homozygotes).
    pub fn phased_forms(&self) -> (PhasedGenotype, PhasedGenotype) {
        (
            PhasedGenotype::new(self.first, self.second),
            PhasedGenotype::new(self.second, self.first),
        )
    }

    pub fn is_homozygous(&self) -> bool {
        self.first == self.second
    }
}

/// Number of phased genotypes over `n_alleles` alleles.
pub fn phased_genotype_count(n_alleles: usize) -> usize {
    n_alleles * n_alleles
}

/// Number of unphased genotypes over `n_alleles` alleles.
pub fn unphased_genotype_count(n_alleles: usize) -> usize {
    n_alleles * (n_alleles + 1) / 2
}

fn isqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

/// The phased genotypes a child can receive from two parental genotypes.
///
/// Child genotypes are phased with respect to the parents: the maternal
/// allele comes first. Duplicates arising from homozygous parents are
/// collapsed.
#[derive(Debug, Clone, Copy)]
pub struct ChildGenotypeSet {
    genotypes: [PhasedGenotype; 4],
    len: usize,
}

impl ChildGenotypeSet {
    /// Build the child set for the given parental alleles, taking the
    /// marker's linkage and the child's sex into account.
    ///
    /// Returns `None` when the marker places no constraint on the child
    /// (Y-linked marker and a child that is not known to be male).
    pub fn new(
        mother: [AlleleId; 2],
        father: [AlleleId; 2],
        child_sex: Sex,
        linkage: Linkage,
    ) -> Option<Self> {
        match (linkage, child_sex) {
            (Linkage::Autosomal, _) | (Linkage::XLinked, Sex::Female | Sex::Unknown) => {
                Some(Self::autosomal(mother, father))
            }
            // Sons carry their mother's X, coded as a homozygote.
            (Linkage::XLinked, Sex::Male) => {
                let mut set = Self::empty();
                for a in mother {
                    set.push_unique(PhasedGenotype::new(a, a));
                }
                Some(set)
            }
            (Linkage::YLinked, Sex::Male) => {
                let mut set = Self::empty();
                for a in father {
                    set.push_unique(PhasedGenotype::new(a, a));
                }
                Some(set)
            }
            (Linkage::YLinked, Sex::Female | Sex::Unknown) => None,
        }
    }

    /// The four maternal x paternal allele combinations.
    pub fn autosomal(mother: [AlleleId; 2], father: [AlleleId; 2]) -> Self {
        let mut set = Self::empty();
        for m in mother {
            for f in father {
                set.push_unique(PhasedGenotype::new(m, f));
            }
        }
        set
    }

    fn empty() -> Self {
        Self {
            genotypes: [PhasedGenotype::new(0, 0); 4],
            len: 0,
        }
    }

    fn push_unique(&mut self, g: PhasedGenotype) {
        if !self.contains(g) {
            self.genotypes[self.len] = g;
            self.len += 1;
        }
    }

    pub fn contains(&self, g: PhasedGenotype) -> bool {
        self.genotypes[..self.len].contains(&g)
    }

    pub fn contains_id(&self, id: GenotypeId) -> bool {
        self.contains(PhasedGenotype::from_id(id))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhasedGenotype> {
        self.genotypes[..self.len].iter()
    }
}
