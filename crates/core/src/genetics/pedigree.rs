use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::{GelimError, Result};
use crate::types::{FamilyIndex, MemberIndex, PedigreeIndex, Slot, SubpedigreeIndex};

/// Sex of a pedigree member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Parse a sex code. `M`, `male` and `1` are male; `F`, `female` and `2`
    /// are female; anything else is unknown.
    pub fn parse(s: &str) -> Sex {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" | "1" => Sex::Male,
            "f" | "female" | "2" => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

/// Input description of one pedigree member.
#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub pedigree: String,
    pub id: String,
    pub father: Option<String>,
    pub mother: Option<String>,
    pub sex: Sex,
}

impl MemberSpec {
    pub fn new(pedigree: &str, id: &str, father: Option<&str>, mother: Option<&str>, sex: Sex) -> Self {
        Self {
            pedigree: pedigree.to_string(),
            id: id.to_string(),
            father: father.map(str::to_string),
            mother: mother.map(str::to_string),
            sex,
        }
    }
}

#[derive(Debug, Clone)]
struct MemberRecord {
    id: String,
    pedigree: PedigreeIndex,
    sex: Sex,
    father: Option<MemberIndex>,
    mother: Option<MemberIndex>,
    /// Family in which this member is a child.
    parental_family: Option<FamilyIndex>,
    /// (mate, family) for every family in which this member is a parent.
    mates: Vec<(MemberIndex, FamilyIndex)>,
    subpedigree: SubpedigreeIndex,
    subindex: usize,
}

/// One mother, one father and their shared children.
#[derive(Debug, Clone)]
pub struct NuclearFamily {
    pub mother: MemberIndex,
    pub father: MemberIndex,
    pub children: Vec<MemberIndex>,
    pub subpedigree: SubpedigreeIndex,
}

/// A connected component of one pedigree.
#[derive(Debug, Clone)]
pub struct Subpedigree {
    pub pedigree: PedigreeIndex,
    /// Members in subindex order.
    pub members: Vec<MemberIndex>,
    pub families: Vec<FamilyIndex>,
}

/// A child's model slot together with its sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSlot {
    pub slot: Slot,
    pub sex: Sex,
}

/// A nuclear family expressed as model slots of a subpedigree-local model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySlots {
    pub mother: Slot,
    pub father: Slot,
    pub children: Vec<ChildSlot>,
}

/// Arena of pedigree members and nuclear families.
///
/// Members, families and subpedigrees are addressed by `usize` handles; all
/// relationships (parents, mates, parental family) are handle lookups, so the
/// graph holds no reference cycles. Handles are stable for the lifetime of
/// the graph.
#[derive(Debug, Clone, Default)]
pub struct PedigreeGraph {
    pedigrees: Vec<String>,
    members: Vec<MemberRecord>,
    /// (pedigree, member id) -> member index.
    id_to_index: HashMap<(PedigreeIndex, String), MemberIndex>,
    families: Vec<NuclearFamily>,
    subpedigrees: Vec<Subpedigree>,
}

impl PedigreeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one member and rebuild families and subpedigrees.
    ///
    /// Parents must already be in the graph; a parent id that is not found
    /// is treated as unknown, as is a lone known parent. Adding members
    /// parents-first yields the same graph as [`from_records`](Self::from_records).
    ///
    /// # Errors
    /// Returns an error if the member id already exists in its pedigree.
    pub fn add_member(&mut self, spec: MemberSpec) -> Result<MemberIndex> {
        let ped = match self.pedigree_index(&spec.pedigree) {
            Some(p) => p,
            None => {
                self.pedigrees.push(spec.pedigree.clone());
                self.pedigrees.len() - 1
            }
        };
        let key = (ped, spec.id.clone());
        if self.id_to_index.contains_key(&key) {
            return Err(GelimError::Pedigree(format!(
                "Duplicate member ID '{}' in pedigree '{}'",
                spec.id, spec.pedigree
            )));
        }

        let resolve = |parent: &Option<String>, role: &str| -> Option<MemberIndex> {
            let parent = parent.as_ref()?;
            let found = self.id_to_index.get(&(ped, parent.clone())).copied();
            if found.is_none() {
                log::warn!(
                    "Member '{}' in pedigree '{}': {} '{}' not found, treated as unknown",
                    spec.id,
                    spec.pedigree,
                    role,
                    parent
                );
            }
            found
        };
        let mut father = resolve(&spec.father, "father");
        let mut mother = resolve(&spec.mother, "mother");
        if father.is_some() != mother.is_some() {
            log::warn!(
                "Member '{}' in pedigree '{}' has only one known parent, treated as a founder",
                spec.id,
                spec.pedigree
            );
            father = None;
            mother = None;
        }

        let index = self.members.len();
        self.id_to_index.insert(key, index);
        self.members.push(MemberRecord {
            id: spec.id,
            pedigree: ped,
            sex: spec.sex,
            father,
            mother,
            parental_family: None,
            mates: Vec::new(),
            subpedigree: 0,
            subindex: 0,
        });
        self.rebuild();
        Ok(index)
    }

    fn rebuild(&mut self) {
        for rec in &mut self.members {
            rec.parental_family = None;
            rec.mates.clear();
        }
        self.families.clear();
        self.subpedigrees.clear();
        self.build_families();
        self.build_subpedigrees();
    }

    /// Build the graph from member records.
    ///
    /// Parent ids that do not resolve within the member's pedigree are
    /// treated as unknown. A member with exactly one known parent is treated
    /// as a founder, since a nuclear family needs both parents.
    ///
    /// # Errors
    /// Returns an error if a member id repeats within a pedigree.
    pub fn from_records(records: &[MemberSpec]) -> Result<Self> {
        let mut pedigrees: Vec<String> = Vec::new();
        let mut pedigree_index: HashMap<String, PedigreeIndex> = HashMap::new();
        let mut members = Vec::with_capacity(records.len());
        let mut id_to_index = HashMap::with_capacity(records.len());

        // First pass: register all members so parent lookups can succeed
        // regardless of input order.
        for spec in records {
            let ped = *pedigree_index.entry(spec.pedigree.clone()).or_insert_with(|| {
                pedigrees.push(spec.pedigree.clone());
                pedigrees.len() - 1
            });
            let key = (ped, spec.id.clone());
            if id_to_index.contains_key(&key) {
                return Err(GelimError::Pedigree(format!(
                    "Duplicate member ID '{}' in pedigree '{}'",
                    spec.id, spec.pedigree
                )));
            }
            id_to_index.insert(key, members.len());
            members.push(MemberRecord {
                id: spec.id.clone(),
                pedigree: ped,
                sex: spec.sex,
                father: None,
                mother: None,
                parental_family: None,
                mates: Vec::new(),
                subpedigree: 0,
                subindex: 0,
            });
        }

        // Second pass: resolve parents.
        for (i, spec) in records.iter().enumerate() {
            let ped = members[i].pedigree;
            let resolve = |parent: &Option<String>, role: &str| -> Option<MemberIndex> {
                let parent = parent.as_ref()?;
                let found = id_to_index.get(&(ped, parent.clone())).copied();
                if found.is_none() {
                    log::warn!(
                        "Member '{}' in pedigree '{}': {} '{}' not found, treated as unknown",
                        spec.id,
                        spec.pedigree,
                        role,
                        parent
                    );
                }
                found
            };
            let father = resolve(&spec.father, "father");
            let mother = resolve(&spec.mother, "mother");

            if father.is_some() != mother.is_some() {
                log::warn!(
                    "Member '{}' in pedigree '{}' has only one known parent, treated as a founder",
                    spec.id,
                    spec.pedigree
                );
                continue;
            }
            members[i].father = father;
            members[i].mother = mother;
        }

        let mut graph = Self {
            pedigrees,
            members,
            id_to_index,
            families: Vec::new(),
            subpedigrees: Vec::new(),
        };
        graph.build_families();
        graph.build_subpedigrees();
        Ok(graph)
    }

    fn build_families(&mut self) {
        let mut family_of: BTreeMap<(MemberIndex, MemberIndex), FamilyIndex> = BTreeMap::new();

        for child in 0..self.members.len() {
            let (Some(mother), Some(father)) = (self.members[child].mother, self.members[child].father)
            else {
                continue;
            };
            let fam = *family_of.entry((mother, father)).or_insert_with(|| {
                self.families.push(NuclearFamily {
                    mother,
                    father,
                    children: Vec::new(),
                    subpedigree: 0,
                });
                self.families.len() - 1
            });
            self.families[fam].children.push(child);
            self.members[child].parental_family = Some(fam);
        }

        for (f, fam) in self.families.iter().enumerate() {
            self.members[fam.mother].mates.push((fam.father, f));
            self.members[fam.father].mates.push((fam.mother, f));
        }
    }

    fn build_subpedigrees(&mut self) {
        let n = self.members.len();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for fam in &self.families {
            for &child in &fam.children {
                for p in [fam.mother, fam.father] {
                    let (a, b) = (find(&mut parent, child), find(&mut parent, p));
                    if a != b {
                        parent[a.max(b)] = a.min(b);
                    }
                }
            }
        }

        let mut component_to_sub: HashMap<usize, SubpedigreeIndex> = HashMap::new();
        for m in 0..n {
            let root = find(&mut parent, m);
            let sub = *component_to_sub.entry(root).or_insert_with(|| {
                self.subpedigrees.push(Subpedigree {
                    pedigree: self.members[m].pedigree,
                    members: Vec::new(),
                    families: Vec::new(),
                });
                self.subpedigrees.len() - 1
            });
            self.members[m].subpedigree = sub;
            self.members[m].subindex = self.subpedigrees[sub].members.len();
            self.subpedigrees[sub].members.push(m);
        }

        for (f, fam) in self.families.iter_mut().enumerate() {
            let sub = self.members[fam.mother].subpedigree;
            fam.subpedigree = sub;
            self.subpedigrees[sub].families.push(f);
        }
    }

    /// Number of members across all pedigrees.
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Number of nuclear families.
    pub fn n_families(&self) -> usize {
        self.families.len()
    }

    /// Number of subpedigrees (connected components).
    pub fn n_subpedigrees(&self) -> usize {
        self.subpedigrees.len()
    }

    /// Number of distinct pedigree names.
    pub fn n_pedigrees(&self) -> usize {
        self.pedigrees.len()
    }

    /// Name of a pedigree.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn pedigree_name(&self, index: PedigreeIndex) -> &str {
        &self.pedigrees[index]
    }

    /// Look up a pedigree by name.
    pub fn pedigree_index(&self, name: &str) -> Option<PedigreeIndex> {
        self.pedigrees.iter().position(|p| p == name)
    }

    /// Look up a member by pedigree name and member id.
    pub fn member_index(&self, pedigree: &str, id: &str) -> Option<MemberIndex> {
        let ped = self.pedigree_index(pedigree)?;
        self.id_to_index.get(&(ped, id.to_string())).copied()
    }

    /// Input id of a member.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn member_id(&self, index: MemberIndex) -> &str {
        &self.members[index].id
    }

    /// Pedigree the member belongs to.
    pub fn member_pedigree(&self, index: MemberIndex) -> PedigreeIndex {
        self.members[index].pedigree
    }

    /// Sex of the member.
    pub fn sex(&self, index: MemberIndex) -> Sex {
        self.members[index].sex
    }

    /// Father of the member, or `None` for a founder.
    pub fn father(&self, index: MemberIndex) -> Option<MemberIndex> {
        self.members[index].father
    }

    /// Mother of the member, or `None` for a founder.
    pub fn mother(&self, index: MemberIndex) -> Option<MemberIndex> {
        self.members[index].mother
    }

    /// Family in which the member is a child, if any.
    pub fn parental_family(&self, index: MemberIndex) -> Option<FamilyIndex> {
        self.members[index].parental_family
    }

    /// (mate, family) pairs for every family in which the member is a parent.
    pub fn mates(&self, index: MemberIndex) -> &[(MemberIndex, FamilyIndex)] {
        &self.members[index].mates
    }

    /// Subpedigree containing the member.
    pub fn subpedigree_of(&self, index: MemberIndex) -> SubpedigreeIndex {
        self.members[index].subpedigree
    }

    /// Position of the member within its subpedigree.
    pub fn subindex(&self, index: MemberIndex) -> usize {
        self.members[index].subindex
    }

    /// Phenotype slot of the member in a subpedigree-local model.
    pub fn slot(&self, index: MemberIndex) -> Slot {
        self.members[index].subindex + 1
    }

    /// Nuclear family by index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn family(&self, index: FamilyIndex) -> &NuclearFamily {
        &self.families[index]
    }

    /// Iterate over all nuclear families with their indices.
    pub fn families(&self) -> impl Iterator<Item = (FamilyIndex, &NuclearFamily)> {
        self.families.iter().enumerate()
    }

    /// Family with the given parents, if they share any children.
    pub fn family_of(&self, mother: MemberIndex, father: MemberIndex) -> Option<FamilyIndex> {
        self.members
            .get(mother)?
            .mates
            .iter()
            .find(|(mate, _)| *mate == father)
            .map(|&(_, f)| f)
            .filter(|&f| self.families[f].mother == mother)
    }

    /// Subpedigree by index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn subpedigree(&self, index: SubpedigreeIndex) -> &Subpedigree {
        &self.subpedigrees[index]
    }

    /// Iterate over all subpedigrees with their indices.
    pub fn subpedigrees(&self) -> impl Iterator<Item = (SubpedigreeIndex, &Subpedigree)> {
        self.subpedigrees.iter().enumerate()
    }

    /// The family as slots of its subpedigree-local model.
    pub fn family_slots(&self, index: FamilyIndex) -> FamilySlots {
        let fam = &self.families[index];
        FamilySlots {
            mother: self.slot(fam.mother),
            father: self.slot(fam.father),
            children: fam
                .children
                .iter()
                .map(|&c| ChildSlot {
                    slot: self.slot(c),
                    sex: self.sex(c),
                })
                .collect(),
        }
    }

    /// Validate the pedigree for consistency.
    ///
    /// Checks:
    /// - No member is its own parent.
    /// - No member is its own ancestor (cycle detection).
    ///
    /// # Errors
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let n = self.members.len();

        for (i, rec) in self.members.iter().enumerate() {
            if rec.father == Some(i) || rec.mother == Some(i) {
                return Err(GelimError::Pedigree(format!(
                    "Member '{}' in pedigree '{}' is listed as its own parent",
                    rec.id, self.pedigrees[rec.pedigree]
                )));
            }
        }

        // Kahn's algorithm over parent -> child edges; unvisited nodes sit
        // on a cycle.
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0u32; n];

        for (i, rec) in self.members.iter().enumerate() {
            for p in [rec.father, rec.mother].into_iter().flatten() {
                children_of[p].push(i);
                in_degree[i] += 1;
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0usize;

        while let Some(node) = queue.pop() {
            visited += 1;
            for &child in &children_of[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push(child);
                }
            }
        }

        if visited != n {
            return Err(GelimError::Pedigree("Pedigree contains a cycle".to_string()));
        }

        Ok(())
    }
}

/// Parse a parent string, returning `None` for unknown parents.
///
/// Unknown parents are coded as `"0"`, `""`, `"NA"`, or `"na"`.
pub fn parse_parent(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed.eq_ignore_ascii_case("na") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
