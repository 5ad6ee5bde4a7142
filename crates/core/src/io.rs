use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{GelimError, Result};
use crate::genetics::pedigree::parse_parent;
use crate::genetics::{Allele, InheritanceModel, MarkerData, MemberSpec, PedigreeGraph, Sex, UnphasedGenotype};
use crate::types::Slot;

/// Pedigree name used when the file has no pedigree column.
pub const DEFAULT_PEDIGREE: &str = "1";

const ID_COLUMNS: &[&str] = &["id", "individual", "animal"];
const FATHER_COLUMNS: &[&str] = &["father", "sire"];
const MOTHER_COLUMNS: &[&str] = &["mother", "dam"];
const PEDIGREE_COLUMNS: &[&str] = &["pedigree", "ped"];
const SEX_COLUMNS: &[&str] = &["sex"];

/// Read a pedigree with codominant marker genotypes from a CSV file.
///
/// Recognised columns (case-insensitive): `pedigree` (optional), `id` (or
/// `individual`/`animal`), `father` (or `sire`), `mother` (or `dam`) and
/// `sex` (optional). Every other column is a marker with genotypes written
/// `A/B`. Empty cells, `0`, `NA`, `0/0` and `?/?` are missing.
///
/// Each marker's model has the alleles observed in its column, sorted by
/// name and equally frequent, and one strict phenotype per observed
/// genotype.
///
/// # Errors
/// Returns an error if the file cannot be read, a required column is
/// missing, a genotype is malformed, or the pedigree is invalid.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<(PedigreeGraph, MarkerData)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let id_col = find_column(&headers, ID_COLUMNS).ok_or_else(|| GelimError::ColumnNotFound("id".into()))?;
    let father_col =
        find_column(&headers, FATHER_COLUMNS).ok_or_else(|| GelimError::ColumnNotFound("father".into()))?;
    let mother_col =
        find_column(&headers, MOTHER_COLUMNS).ok_or_else(|| GelimError::ColumnNotFound("mother".into()))?;
    let pedigree_col = find_column(&headers, PEDIGREE_COLUMNS);
    let sex_col = find_column(&headers, SEX_COLUMNS);

    let reserved = [Some(id_col), Some(father_col), Some(mother_col), pedigree_col, sex_col];
    let marker_cols: Vec<usize> = (0..headers.len())
        .filter(|c| !reserved.contains(&Some(*c)))
        .collect();

    let mut specs = Vec::new();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); marker_cols.len()];

    for result in reader.records() {
        let record = result?;
        let field = |c: usize| record.get(c).unwrap_or("");

        let pedigree = pedigree_col.map_or(DEFAULT_PEDIGREE, field);
        let father = parse_parent(field(father_col));
        let mother = parse_parent(field(mother_col));
        let sex = sex_col.map_or(Sex::Unknown, |c| Sex::parse(field(c)));

        specs.push(MemberSpec::new(
            pedigree,
            field(id_col),
            father.as_deref(),
            mother.as_deref(),
            sex,
        ));
        for (m, &c) in marker_cols.iter().enumerate() {
            cells[m].push(field(c).to_string());
        }
    }

    if specs.is_empty() {
        return Err(GelimError::Data(format!(
            "No pedigree members in '{}'",
            path.as_ref().display()
        )));
    }

    let graph = PedigreeGraph::from_records(&specs)?;
    graph.validate()?;

    let mut markers = MarkerData::new();
    for (m, &c) in marker_cols.iter().enumerate() {
        let (model, phenotypes) = marker_model(&headers[c], &cells[m])?;
        markers.add_marker(&headers[c], model, phenotypes)?;
    }

    log::info!(
        "Loaded {} members in {} pedigrees with {} markers",
        graph.n_members(),
        graph.n_pedigrees(),
        markers.marker_count()
    );

    Ok((graph, markers))
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

/// Whether a genotype cell means "not typed".
pub fn is_missing_genotype(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || cell == "0"
        || cell.eq_ignore_ascii_case("na")
        || cell == "0/0"
        || cell == "?/?"
}

/// Split an `A/B` genotype into its two allele names.
pub fn parse_genotype(cell: &str) -> Option<(&str, &str)> {
    let (a, b) = cell.trim().split_once('/')?;
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() || b.contains('/') {
        return None;
    }
    Some((a, b))
}

fn marker_model(name: &str, cells: &[String]) -> Result<(InheritanceModel, Vec<Option<Slot>>)> {
    let mut parsed: Vec<Option<(&str, &str)>> = Vec::with_capacity(cells.len());
    let mut names: BTreeSet<&str> = BTreeSet::new();

    for cell in cells {
        if is_missing_genotype(cell) {
            parsed.push(None);
            continue;
        }
        let (a, b) = parse_genotype(cell).ok_or_else(|| GelimError::UnknownGenotype {
            marker: name.to_string(),
            genotype: cell.clone(),
        })?;
        names.insert(a);
        names.insert(b);
        parsed.push(Some((a, b)));
    }

    if names.is_empty() {
        // Nothing typed: a one-allele model where everyone is missing.
        let model = InheritanceModel::new(name, vec![Allele::new("?", 1.0)])?;
        return Ok((model, vec![None; cells.len()]));
    }

    let frequency = 1.0 / names.len() as f64;
    let alleles: Vec<Allele> = names.iter().map(|n| Allele::new(*n, frequency)).collect();
    let mut model = InheritanceModel::new(name, alleles)?;

    let mut slots: BTreeMap<UnphasedGenotype, Slot> = BTreeMap::new();
    let mut phenotypes = Vec::with_capacity(parsed.len());

    for entry in parsed {
        let Some((a, b)) = entry else {
            phenotypes.push(None);
            continue;
        };
        let (Some(ia), Some(ib)) = (model.allele_id(a), model.allele_id(b)) else {
            return Err(GelimError::Model(format!("Allele lookup failed in marker '{}'", name)));
        };
        let genotype = UnphasedGenotype::new(ia, ib);
        let slot = match slots.get(&genotype) {
            Some(&slot) => slot,
            None => {
                let [x, y] = genotype.alleles();
                let label = format!("{}/{}", model.alleles()[x].name, model.alleles()[y].name);
                let slot = model.add_phenotype(&label, true);
                model.set_penetrance(slot, genotype, 1.0)?;
                slots.insert(genotype, slot);
                slot
            }
        };
        phenotypes.push(Some(slot));
    }

    Ok((model, phenotypes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Helper: write CSV content to a temporary file and return the path.
    fn write_temp_csv(content: &str) -> String {
        let dir = std::env::temp_dir();
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = format!("test_gelim_{}_{}.csv", std::process::id(), id);
        let path = dir.join(file_name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_load_csv_basic() {
        let csv = "pedigree,id,father,mother,sex,D1S1,D1S2\n\
                   F1,1,0,0,M,A/B,0\n\
                   F1,2,0,0,F,B/B,120/124\n\
                   F1,3,1,2,F,B/A,?/?\n\
                   F2,1,0,0,M,,124/124\n";
        let path = write_temp_csv(csv);
        let (graph, markers) = load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(graph.n_members(), 4);
        assert_eq!(graph.n_pedigrees(), 2);
        assert_eq!(graph.n_families(), 1);
        assert_eq!(graph.sex(0), Sex::Male);
        assert_eq!(markers.marker_count(), 2);

        let d1s1 = markers.marker(0).unwrap();
        assert_eq!(d1s1.name, "D1S1");
        assert_eq!(d1s1.model.allele_count(), 2);
        assert_relative_eq!(d1s1.model.alleles()[1].frequency, 0.5);
        // A/B and B/A share a phenotype.
        assert_eq!(markers.phenotype(0, 0), markers.phenotype(0, 2));
        assert_eq!(markers.phenotype(0, 3), None);
        assert_eq!(d1s1.model.phenotype_count(), 2);

        let d1s2 = markers.marker(1).unwrap();
        assert_eq!(d1s2.model.alleles()[0].name, "120");
        assert_eq!(markers.phenotype(1, 0), None);
        assert_eq!(markers.phenotype(1, 2), None);
        let slot = markers.phenotype(1, 1).unwrap();
        assert_eq!(d1s2.model.phenotype_name(slot), Some("120/124"));
    }

    #[test]
    fn test_load_csv_aliases_without_pedigree() {
        let csv = "animal,sire,dam,M1\nx,,,1/1\ny,,,1/2\nz,x,y,2/2\n";
        let path = write_temp_csv(csv);
        let (graph, markers) = load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(graph.pedigree_name(0), DEFAULT_PEDIGREE);
        assert_eq!(graph.n_families(), 1);
        assert_eq!(markers.marker_count(), 1);
        assert_eq!(graph.sex(2), Sex::Unknown);
    }

    #[test]
    fn test_load_csv_rejects_bad_genotype() {
        let csv = "id,father,mother,M1\na,0,0,A-B\n";
        let path = write_temp_csv(csv);
        let result = load_csv(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GelimError::UnknownGenotype { .. })));
    }

    #[test]
    fn test_load_csv_missing_column() {
        let csv = "id,mother,M1\na,0,A/A\n";
        let path = write_temp_csv(csv);
        let result = load_csv(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GelimError::ColumnNotFound(_))));
    }

    #[test]
    fn test_load_csv_empty() {
        let path = write_temp_csv("id,father,mother,M1\n");
        let result = load_csv(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(GelimError::Data(_))));
    }

    #[test]
    fn test_untyped_marker() {
        let (model, phenotypes) = marker_model("M", &["".to_string(), "NA".to_string()]).unwrap();
        assert_eq!(model.allele_count(), 1);
        assert_eq!(phenotypes, vec![None, None]);
    }

    #[test]
    fn test_missing_and_parse() {
        assert!(is_missing_genotype("0/0"));
        assert!(is_missing_genotype(" na "));
        assert!(!is_missing_genotype("1/1"));
        assert_eq!(parse_genotype("A / B"), Some(("A", "B")));
        assert_eq!(parse_genotype("A/B/C"), None);
        assert_eq!(parse_genotype("AB"), None);
    }
}
