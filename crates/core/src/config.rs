use serde::Serialize;

use crate::error::{GelimError, Result};

/// What genotype elimination removes from the model after each family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RemovalPolicy {
    /// Record errors only; the model is never mutated.
    None,
    /// Remove every individual genotype shown to be impossible.
    #[default]
    Genotype,
    /// Remove all of an individual's genotypes, but only when none of them
    /// remain valid.
    All,
}

impl std::str::FromStr for RemovalPolicy {
    type Err = GelimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(RemovalPolicy::None),
            "genotype" | "genotypes" => Ok(RemovalPolicy::Genotype),
            "all" => Ok(RemovalPolicy::All),
            other => Err(GelimError::Config(format!(
                "Unknown removal policy '{}'. Use 'none', 'genotype' or 'all'.",
                other
            ))),
        }
    }
}

/// Settings for one [`GenotypeEliminator`](crate::gelim::GenotypeEliminator).
#[derive(Debug, Clone, Serialize)]
pub struct EliminationConfig {
    /// Removal policy used by `process`.
    pub removal: RemovalPolicy,
    /// Treat parental genotypes as ordered (parent of origin tracked).
    pub phased_parents: bool,
    /// Check males on X/Y-linked markers before elimination.
    pub check_sex_linkage: bool,
    /// Emit per-family valid-pair and child-mask dumps at `trace` level.
    pub trace_families: bool,
}

impl Default for EliminationConfig {
    fn default() -> Self {
        Self {
            removal: RemovalPolicy::Genotype,
            phased_parents: false,
            check_sex_linkage: true,
            trace_families: false,
        }
    }
}

impl EliminationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removal(mut self, policy: RemovalPolicy) -> Self {
        self.removal = policy;
        self
    }

    pub fn phased_parents(mut self, phased: bool) -> Self {
        self.phased_parents = phased;
        self
    }

    pub fn check_sex_linkage(mut self, check: bool) -> Self {
        self.check_sex_linkage = check;
        self
    }

    pub fn trace_families(mut self, trace: bool) -> Self {
        self.trace_families = trace;
        self
    }
}

/// Construction options for
/// [`PedigreeModelGenerator`](crate::gelim::PedigreeModelGenerator).
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorOptions {
    /// Collapse absent alleles before genotype elimination.
    pub prior_remap: bool,
    /// Collapse alleles made absent by genotype elimination.
    pub post_remap: bool,
    /// Run genotype elimination at all.
    pub genotype_elimination: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            prior_remap: true,
            post_remap: true,
            genotype_elimination: true,
        }
    }
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prior_remap(mut self, remap: bool) -> Self {
        self.prior_remap = remap;
        self
    }

    pub fn post_remap(mut self, remap: bool) -> Self {
        self.post_remap = remap;
        self
    }

    pub fn genotype_elimination(mut self, eliminate: bool) -> Self {
        self.genotype_elimination = eliminate;
        self
    }

    pub fn remaps(&self) -> bool {
        self.prior_remap || self.post_remap
    }
}
