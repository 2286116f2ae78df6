use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlannerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Female => f.write_str("female"),
            Sex::Male => f.write_str("male"),
        }
    }
}

/// Population group used to pick reference intakes, e.g. (female, "19-30").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Demographic {
    pub sex: Sex,
    pub age_band: String,
}

impl fmt::Display for Demographic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sex, self.age_band)
    }
}

/// Daily reference values for one demographic, keyed by nutrient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientReferences {
    pub targets: BTreeMap<String, f64>,
    pub ear: BTreeMap<String, f64>,
    pub upper_limits: BTreeMap<String, f64>,
}

impl NutrientReferences {
    pub fn target(&self, key: &str) -> Option<f64> {
        self.targets.get(key).copied()
    }

    pub fn ear(&self, key: &str) -> Option<f64> {
        self.ear.get(key).copied()
    }

    pub fn upper_limit(&self, key: &str) -> Option<f64> {
        self.upper_limits.get(key).copied()
    }

    /// Every nutrient the tables mention, in key order.
    pub fn tracked_keys(&self) -> BTreeSet<String> {
        self.targets
            .keys()
            .chain(self.ear.keys())
            .chain(self.upper_limits.keys())
            .cloned()
            .collect()
    }

    pub fn knows(&self, key: &str) -> bool {
        self.targets.contains_key(key)
            || self.ear.contains_key(key)
            || self.upper_limits.contains_key(key)
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    sex: Sex,
    age_band: String,
    nutrient: String,
    target: Option<f64>,
    ear: Option<f64>,
    ul: Option<f64>,
}

/// Reference intake tables for every demographic.
///
/// CSV columns: `sex,age_band,nutrient,target,ear,ul`; the last three may be empty.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    tables: HashMap<Demographic, NutrientReferences>,
}

impl ReferenceTables {
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let tables = Self::from_reader(file)?;
        debug!(path = %path.display(), groups = tables.tables.len(), "loaded reference tables");
        Ok(tables)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut tables: HashMap<Demographic, NutrientReferences> = HashMap::new();

        for row in csv_reader.deserialize() {
            let row: ReferenceRow = row?;
            let key = row.nutrient.to_lowercase();
            let entry = tables
                .entry(Demographic {
                    sex: row.sex,
                    age_band: row.age_band,
                })
                .or_default();

            for (value, map) in [
                (row.target, &mut entry.targets),
                (row.ear, &mut entry.ear),
                (row.ul, &mut entry.upper_limits),
            ] {
                if let Some(v) = value {
                    if v < 0.0 {
                        return Err(PlannerError::InvalidInput(format!(
                            "negative reference value for {}",
                            key
                        )));
                    }
                    map.insert(key.clone(), v);
                }
            }
        }

        Ok(Self { tables })
    }

    pub fn lookup(&self, demographic: &Demographic) -> Result<&NutrientReferences> {
        self.tables
            .get(demographic)
            .ok_or_else(|| PlannerError::UnknownDemographic(demographic.to_string()))
    }

    pub fn demographics(&self) -> Vec<&Demographic> {
        let mut groups: Vec<&Demographic> = self.tables.keys().collect();
        groups.sort_by(|a, b| (a.sex as u8, &a.age_band).cmp(&(b.sex as u8, &b.age_band)));
        groups
    }
}
