use crate::error::{GelimError, Result};
use crate::types::{MemberIndex, Slot};

use super::genotype::Linkage;
use super::imodel::InheritanceModel;

/// A named marker and its population-level inheritance model.
#[derive(Debug, Clone)]
pub struct Marker {
    pub name: String,
    pub model: InheritanceModel,
}

/// Marker models plus each member's observed phenotype at every marker.
#[derive(Debug, Clone, Default)]
pub struct MarkerData {
    markers: Vec<Marker>,
    /// phenotypes[marker][member]: phenotype slot in the marker's model, or
    /// `None` when missing.
    phenotypes: Vec<Vec<Option<Slot>>>,
}

impl MarkerData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker with one phenotype entry per member of the pedigree graph.
    ///
    /// # Errors
    /// Returns an error if a phenotype slot does not exist in `model`.
    pub fn add_marker(
        &mut self,
        name: &str,
        model: InheritanceModel,
        phenotypes: Vec<Option<Slot>>,
    ) -> Result<usize> {
        if let Some(bad) = phenotypes
            .iter()
            .flatten()
            .find(|&&p| p > model.phenotype_count())
        {
            return Err(GelimError::Model(format!(
                "Marker '{}' refers to phenotype {} but the model has {}",
                name,
                bad,
                model.phenotype_count()
            )));
        }
        self.markers.push(Marker {
            name: name.to_string(),
            model,
        });
        self.phenotypes.push(phenotypes);
        Ok(self.markers.len() - 1)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker_index(&self, name: &str) -> Option<usize> {
        self.markers.iter().position(|m| m.name == name)
    }

    /// Observed phenotype of a member at a marker; `None` when missing or
    /// when either index is out of range.
    pub fn phenotype(&self, marker: usize, member: MemberIndex) -> Option<Slot> {
        self.phenotypes.get(marker)?.get(member).copied().flatten()
    }

    /// # Errors
    /// Returns an error if the marker does not exist.
    pub fn set_linkage(&mut self, marker: usize, linkage: Linkage) -> Result<()> {
        let count = self.markers.len();
        let m = self
            .markers
            .get_mut(marker)
            .ok_or(GelimError::MarkerOutOfRange {
                index: marker,
                count,
            })?;
        m.model.set_linkage(linkage);
        Ok(())
    }
}
