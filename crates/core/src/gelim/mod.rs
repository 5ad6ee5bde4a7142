// Mendelian genotype elimination: valid parental pairs per nuclear family,
// the fixed-point eliminator over a subpedigree, inconsistency records and
// the per-subpedigree model builder.

pub mod builder;
pub mod eliminate;
pub mod inconsistency;
pub mod mask;
pub mod parental;
pub mod queue;
pub mod remap;

pub use builder::{ModelBuild, PedigreeModelGenerator};
pub use eliminate::{FamilyStatus, GenotypeEliminator, ProcessStatus};
pub use inconsistency::{
    ErrorKind, FamilyErrors, InconsistencyHandler, MarkerSummary, MemberErrors, PedigreeSummary,
    PedigreeTally,
};
pub use mask::GenotypeMask;
pub use parental::{all_parental_pairs, find_valid_pairs, GenotypePair, ValidParentalGenotypes};
pub use queue::FamilyQueues;
pub use remap::{AbsentAlleleRemapper, AlleleRemapper};
