use std::collections::BTreeSet;

use crate::config::{EliminationConfig, GeneratorOptions};
use crate::error::{GelimError, Result};
use crate::genetics::{Allele, InheritanceModel, MarkerData, PedigreeGraph, MISSING_PHENOTYPE, REMAP_ALLELE};
use crate::types::{AlleleId, Slot, SubpedigreeIndex};

use super::eliminate::{GenotypeEliminator, ProcessStatus};
use super::inconsistency::InconsistencyHandler;
use super::remap::{AbsentAlleleRemapper, AlleleRemapper};

/// A subpedigree-local model and what building it found out.
#[derive(Debug, Clone)]
pub struct ModelBuild {
    pub model: InheritanceModel,
    /// The marker carried genotype information for this subpedigree.
    pub informative: bool,
    /// Genotype elimination found a Mendelian inconsistency, or the marker
    /// does not exist.
    pub inconsistent: bool,
}

/// Builds per-subpedigree inheritance models for one marker at a time.
///
/// Member `i` of the subpedigree gets phenotype slot `i + 1`, holding its
/// observed phenotype's penetrances (or the missing phenotype). Depending on
/// the [`GeneratorOptions`], absent alleles are collapsed before and after
/// genotype elimination. Models that carry no usable information come back
/// collapsed to a single placeholder allele.
///
/// Inconsistencies accumulate in the generator across builds; read them via
/// [`errors`](Self::errors).
#[derive(Debug)]
pub struct PedigreeModelGenerator<'g, R = AbsentAlleleRemapper> {
    graph: &'g PedigreeGraph,
    markers: &'g MarkerData,
    options: GeneratorOptions,
    eliminator: GenotypeEliminator<'g>,
    remapper: R,
}

impl<'g> PedigreeModelGenerator<'g> {
    pub fn new(
        graph: &'g PedigreeGraph,
        markers: &'g MarkerData,
        options: GeneratorOptions,
        config: EliminationConfig,
    ) -> Self {
        Self::with_remapper(graph, markers, options, config, AbsentAlleleRemapper)
    }
}

impl<'g, R: AlleleRemapper> PedigreeModelGenerator<'g, R> {
    pub fn with_remapper(
        graph: &'g PedigreeGraph,
        markers: &'g MarkerData,
        options: GeneratorOptions,
        config: EliminationConfig,
        remapper: R,
    ) -> Self {
        Self {
            graph,
            markers,
            options,
            eliminator: GenotypeEliminator::new(graph, config),
            remapper,
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn eliminator(&self) -> &GenotypeEliminator<'g> {
        &self.eliminator
    }

    pub fn errors(&self) -> &InconsistencyHandler {
        self.eliminator.errors()
    }

    pub fn take_errors(&mut self) -> InconsistencyHandler {
        self.eliminator.take_errors()
    }

    pub fn clear_errors(&mut self) {
        self.eliminator.clear_errors();
    }

    /// Build the model of `marker` for subpedigree `sub` from the marker
    /// data's own model and phenotypes.
    ///
    /// # Errors
    /// Returns an error if `sub` is out of range or a phenotype cannot be
    /// copied from the marker model.
    pub fn build(&mut self, sub: SubpedigreeIndex, marker: usize) -> Result<ModelBuild> {
        self.check_subpedigree(sub)?;

        let markers = self.markers;
        let Some(m) = markers.marker(marker) else {
            return self.out_of_range(sub);
        };

        let phenotypes: Vec<Slot> = self
            .graph
            .subpedigree(sub)
            .members
            .iter()
            .map(|&member| markers.phenotype(marker, member).unwrap_or(MISSING_PHENOTYPE))
            .collect();

        self.build_with(sub, marker, &m.model, &phenotypes)
    }

    /// Build from an explicit base model and one phenotype slot per
    /// subpedigree member (in subindex order, `MISSING_PHENOTYPE` when
    /// missing).
    ///
    /// # Errors
    /// Returns an error if `sub` is out of range, the phenotype list does not
    /// match the subpedigree, or a phenotype is not part of `base`.
    pub fn build_with(
        &mut self,
        sub: SubpedigreeIndex,
        marker: usize,
        base: &InheritanceModel,
        phenotypes: &[Slot],
    ) -> Result<ModelBuild> {
        self.check_subpedigree(sub)?;
        if marker >= self.markers.marker_count() {
            return self.out_of_range(sub);
        }

        let graph = self.graph;
        let members = &graph.subpedigree(sub).members;
        if phenotypes.len() != members.len() {
            return Err(GelimError::Model(format!(
                "Subpedigree {} has {} members but {} phenotypes were given",
                sub,
                members.len(),
                phenotypes.len()
            )));
        }

        let mut model =
            InheritanceModel::new(base.name(), base.alleles().to_vec())?.with_linkage(base.linkage());

        // Missing members stay empty for now; copying them is wasted work
        // when the model turns out to be uninformative.
        for (ind, (&member, &pid)) in members.iter().zip(phenotypes).enumerate() {
            let missing = pid == MISSING_PHENOTYPE;
            let slot = model.add_phenotype(&format!("{:06}", ind), !missing);
            if !missing {
                model.copy_penetrance_sexed(base, pid, slot, graph.sex(member))?;
            }
        }

        self.eliminator.set_subpedigree(sub)?;
        let forced = has_empty_observation(&model);

        if !forced && !model.penetrance_informative() {
            self.eliminator.mark_uninformative(marker)?;
            if self.options.remaps() {
                let model = self.collapse_to_empty(model, sub)?;
                return Ok(uninformative(model));
            }
            self.copy_missing_members(&mut model, base, sub, phenotypes)?;
            return Ok(uninformative(model));
        }

        self.copy_missing_members(&mut model, base, sub, phenotypes)?;

        if !forced && !model.genotype_informative() {
            self.eliminator.mark_checked(marker, true)?;
            return Ok(ModelBuild {
                model,
                informative: true,
                inconsistent: false,
            });
        }

        if self.options.prior_remap {
            if let Some(remapped) = self.remapper.remap(&model) {
                model = remapped;
            }
            if !forced && !model.penetrance_informative() {
                self.eliminator.mark_uninformative(marker)?;
                let model = self.collapse_to_empty(model, sub)?;
                return Ok(uninformative(model));
            }
        }

        if self.options.genotype_elimination {
            self.eliminator.reset_queues();
            let status = self.eliminator.process(&mut model, marker)?;
            if status == ProcessStatus::Inconsistent {
                log::debug!(
                    "marker {} ('{}'): subpedigree {} inconsistent",
                    marker,
                    base.name(),
                    sub
                );
                let model = self.collapse_to_empty(model, sub)?;
                return Ok(ModelBuild {
                    model,
                    informative: true,
                    inconsistent: true,
                });
            }
        } else {
            self.eliminator.mark_checked(marker, true)?;
        }

        if self.options.post_remap {
            if let Some(remapped) = self.remapper.remap(&model) {
                model = remapped;
            }
            if !model.penetrance_informative() {
                let model = self.collapse_to_empty(model, sub)?;
                return Ok(uninformative(model));
            }
        }

        Ok(ModelBuild {
            model,
            informative: true,
            inconsistent: false,
        })
    }

    /// A single-allele model in which every member of `sub` is missing.
    ///
    /// # Errors
    /// Returns an error if `sub` is out of range.
    pub fn empty_model(&self, sub: SubpedigreeIndex) -> Result<InheritanceModel> {
        self.check_subpedigree(sub)?;
        let mut model = InheritanceModel::new(REMAP_ALLELE, vec![Allele::new(REMAP_ALLELE, 1.0)])?;
        for (ind, &member) in self.graph.subpedigree(sub).members.iter().enumerate() {
            let slot = model.add_phenotype(&format!("{:06}", ind), false);
            model.copy_missing_sexed(slot, self.graph.sex(member))?;
        }
        Ok(model)
    }

    /// Merge all alleles of `model` into the placeholder allele and reset
    /// every member to missing.
    fn collapse_to_empty(&self, model: InheritanceModel, sub: SubpedigreeIndex) -> Result<InheritanceModel> {
        let all: BTreeSet<AlleleId> = (0..model.allele_count()).collect();
        let mut model = model.remap(&all);
        for (ind, &member) in self.graph.subpedigree(sub).members.iter().enumerate() {
            let slot = ind + 1;
            model.copy_missing_sexed(slot, self.graph.sex(member))?;
            model.set_strict(slot, false)?;
        }
        Ok(model)
    }

    /// Fill every non-strict member slot from `base`.
    fn copy_missing_members(
        &self,
        model: &mut InheritanceModel,
        base: &InheritanceModel,
        sub: SubpedigreeIndex,
        phenotypes: &[Slot],
    ) -> Result<()> {
        for (ind, &member) in self.graph.subpedigree(sub).members.iter().enumerate() {
            let slot = ind + 1;
            if !model.strict_phenotype(slot) {
                model.copy_penetrance_sexed(base, phenotypes[ind], slot, self.graph.sex(member))?;
            }
        }
        Ok(())
    }

    fn out_of_range(&self, sub: SubpedigreeIndex) -> Result<ModelBuild> {
        Ok(ModelBuild {
            model: self.empty_model(sub)?,
            informative: false,
            inconsistent: true,
        })
    }

    fn check_subpedigree(&self, sub: SubpedigreeIndex) -> Result<()> {
        if sub >= self.graph.n_subpedigrees() {
            return Err(GelimError::Pedigree(format!(
                "Subpedigree {} out of range ({} subpedigrees)",
                sub,
                self.graph.n_subpedigrees()
            )));
        }
        Ok(())
    }
}

fn uninformative(model: InheritanceModel) -> ModelBuild {
    ModelBuild {
        model,
        informative: false,
        inconsistent: false,
    }
}

/// An observed phenotype that allows no genotype at all, such as a
/// heterozygous male on an X-linked marker.
fn has_empty_observation(model: &InheritanceModel) -> bool {
    (1..=model.phenotype_count()).any(|s| model.strict_phenotype(s) && model.phased_count(s) == 0)
}
