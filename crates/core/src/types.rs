/// Index of a member in the pedigree graph arena.
pub type MemberIndex = usize;

/// Index of a nuclear family in the pedigree graph arena.
pub type FamilyIndex = usize;

/// Index of a subpedigree (connected component) in the pedigree graph.
pub type SubpedigreeIndex = usize;

/// Index of a named pedigree in the pedigree graph.
pub type PedigreeIndex = usize;

/// Index of an allele within an inheritance model.
pub type AlleleId = usize;

/// Identifier of a phased or unphased genotype within an inheritance model.
pub type GenotypeId = usize;

/// Phenotype row of an inheritance model. Row 0 is the missing phenotype;
/// subpedigree-local models use `subindex + 1` for each member.
pub type Slot = usize;

/// Penetrance weight.
pub type Penetrance = f64;
