// Genetics collaborators consumed by genotype elimination:
// genotype space, inheritance models, pedigree graph, marker data.

pub mod genotype;
pub mod imodel;
pub mod markers;
pub mod pedigree;

pub use genotype::{Allele, ChildGenotypeSet, Linkage, PhasedGenotype, UnphasedGenotype};
pub use imodel::{InheritanceModel, MISSING_PHENOTYPE, REMAP_ALLELE};
pub use markers::{Marker, MarkerData};
pub use pedigree::{ChildSlot, FamilySlots, MemberSpec, NuclearFamily, PedigreeGraph, Sex, Subpedigree};
