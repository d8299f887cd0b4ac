use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Genre assigned when no classifier signal fires; every catalog must define it.
pub const FALLBACK_GENRE: &str = "Expository";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSpec {
    pub label: String,
    pub min_score: i64,
    pub max_score: i64,
    pub age_group: String,
    pub grade_hint: String,
    pub vocabulary_band: String,
    pub purpose: String,
}

impl BandSpec {
    pub fn contains(&self, score: i64) -> bool {
        (self.min_score..=self.max_score).contains(&score)
    }

    pub fn midpoint(&self) -> i64 {
        (self.min_score + self.max_score) / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreSpec {
    pub name: String,
    pub code: String,
    pub thinking_type: String,
    pub instruction: String,
    pub default_topic: String,
    /// Classifier keywords added to the built-in list for this genre.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthSpec {
    pub name: String,
    pub target_words: i64,
    pub min_words: i64,
    pub max_words: i64,
    pub purpose: String,
}

impl LengthSpec {
    pub fn contains(&self, word_count: i64) -> bool {
        (self.min_words..=self.max_words).contains(&word_count)
    }

    pub fn range_label(&self) -> String {
        format!("{}-{}", self.min_words, self.max_words)
    }
}

/// Read-only configuration tables shared by the validator, the importer and
/// the prompt builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub bands: Vec<BandSpec>,
    pub genres: Vec<GenreSpec>,
    pub lengths: Vec<LengthSpec>,
}

impl Catalog {
    pub fn standard() -> Self {
        let band = |label: &str,
                    min_score: i64,
                    max_score: i64,
                    age_group: &str,
                    grade_hint: &str,
                    vocabulary_band: &str,
                    purpose: &str| BandSpec {
            label: label.to_string(),
            min_score,
            max_score,
            age_group: age_group.to_string(),
            grade_hint: grade_hint.to_string(),
            vocabulary_band: vocabulary_band.to_string(),
            purpose: purpose.to_string(),
        };
        let genre = |name: &str,
                     code: &str,
                     thinking_type: &str,
                     instruction: &str,
                     default_topic: &str| GenreSpec {
            name: name.to_string(),
            code: code.to_string(),
            thinking_type: thinking_type.to_string(),
            instruction: instruction.to_string(),
            default_topic: default_topic.to_string(),
            keywords: Vec::new(),
        };
        let length = |name: &str, target_words: i64, min_words: i64, max_words: i64, purpose: &str| {
            LengthSpec {
                name: name.to_string(),
                target_words,
                min_words,
                max_words,
                purpose: purpose.to_string(),
            }
        };

        Self {
            bands: vec![
                band("100-300", 100, 300, "Early Elementary", "Elementary 1-2", "Pre-A1", "sentence sense"),
                band("300-500", 300, 500, "Upper Elementary", "Elementary 3-4", "A1/A2", "reading in meaning units"),
                band("500-700", 500, 700, "Transitional", "Elementary 5-6", "A2/B1", "paragraph comprehension"),
                band("700-900", 700, 900, "Middle School", "Middle 1-2", "A2/B1", "information comprehension"),
                band("900-1100", 900, 1100, "Upper Secondary", "Middle 3-High 1", "B1/B2", "logic and cause-effect"),
                band("1100-1300", 1100, 1300, "Pre-CSAT", "High 2-3", "B2", "abstract concepts"),
                band("1300-1500", 1300, 1500, "Academic", "University", "B2/C1", "academic reading"),
            ],
            genres: vec![
                genre(
                    "Narrative",
                    "NAR",
                    "time and events",
                    "Write a story or personal experience with characters, setting, and events in chronological order.",
                    "Daily Life",
                ),
                genre(
                    "Expository",
                    "EXP",
                    "explanation",
                    "Write an explanatory text that clearly explains a concept or process with examples.",
                    "Nature",
                ),
                genre(
                    "Informational",
                    "INF",
                    "facts",
                    "Write a factual text presenting objective information, similar to a news article or report.",
                    "General Knowledge",
                ),
                genre(
                    "Argumentative",
                    "ARG",
                    "claims and evidence",
                    "Write a text that presents a clear claim supported by reasons and evidence.",
                    "Opinion",
                ),
                genre(
                    "Procedural",
                    "PRO",
                    "process",
                    "Write a how-to text with clear step-by-step instructions.",
                    "How-to",
                ),
                genre(
                    "Literary",
                    "LIT",
                    "emotion and expression",
                    "Write an expressive essay or literary piece with attention to style and emotional depth.",
                    "Feelings",
                ),
            ],
            lengths: vec![
                length("Micro", 50, 40, 60, "warm-up / sentence practice"),
                length("Short", 100, 80, 120, "core classroom reading"),
                length("Medium", 200, 170, 230, "intensive reading"),
                length("Long", 350, 280, 420, "extensive reading / exam prep"),
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let catalog: Catalog = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn load_or_standard(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::standard()),
        }
    }

    /// Bands must ascend without overlap (adjacent bands may share an edge),
    /// lengths must ascend, and names must be unique.
    fn check(&self) -> Result<()> {
        if self.bands.is_empty() || self.genres.is_empty() || self.lengths.is_empty() {
            bail!("catalog must define at least one band, genre and length type");
        }
        for band in &self.bands {
            if band.min_score > band.max_score {
                bail!("band {} has min_score above max_score", band.label);
            }
        }
        for pair in self.bands.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.min_score < lower.max_score || upper.max_score <= lower.max_score {
                bail!(
                    "band {} must start at or above the end of band {}",
                    upper.label,
                    lower.label
                );
            }
        }
        for length in &self.lengths {
            if length.min_words > length.max_words {
                bail!("length type {} has min_words above max_words", length.name);
            }
        }
        for pair in self.lengths.windows(2) {
            let (shorter, longer) = (&pair[0], &pair[1]);
            if longer.min_words <= shorter.max_words {
                bail!(
                    "length type {} must start above the end of length type {}",
                    longer.name,
                    shorter.name
                );
            }
        }

        ensure_unique("band", self.bands.iter().map(|band| band.label.as_str()))?;
        ensure_unique("genre", self.genres.iter().map(|genre| genre.name.as_str()))?;
        ensure_unique("genre code", self.genres.iter().map(|genre| genre.code.as_str()))?;
        ensure_unique(
            "length type",
            self.lengths.iter().map(|length| length.name.as_str()),
        )?;

        if self.genre(FALLBACK_GENRE).is_none() {
            bail!("catalog must define the fallback genre {FALLBACK_GENRE}");
        }
        Ok(())
    }

    pub fn band(&self, label: &str) -> Option<&BandSpec> {
        self.bands.iter().find(|band| band.label == label)
    }

    pub fn genre(&self, name: &str) -> Option<&GenreSpec> {
        self.genres.iter().find(|genre| genre.name == name)
    }

    pub fn length(&self, name: &str) -> Option<&LengthSpec> {
        self.lengths.iter().find(|length| length.name == name)
    }

    pub fn genre_code(&self, name: &str) -> &str {
        self.genre(name).map(|genre| genre.code.as_str()).unwrap_or("UNK")
    }

    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|genre| genre.name.as_str()).collect()
    }

    pub fn length_names(&self) -> Vec<&str> {
        self.lengths.iter().map(|length| length.name.as_str()).collect()
    }

    pub fn default_topic(&self, genre: &str, age_group: &str) -> String {
        // Only the middle-school audience has curated topics.
        if age_group == "Middle School" {
            let curated = match genre {
                "Narrative" => Some("Friendship"),
                "Expository" => Some("Science and Nature"),
                "Informational" => Some("Daily Life"),
                "Argumentative" => Some("School Rules"),
                "Procedural" => Some("Cooking"),
                "Literary" => Some("Growing Up"),
                _ => None,
            };
            if let Some(topic) = curated {
                return topic.to_string();
            }
        }

        self.genre(genre)
            .map(|spec| spec.default_topic.clone())
            .unwrap_or_else(|| "General".to_string())
    }
}

fn ensure_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            bail!("duplicate {kind} {name} in catalog");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_fixed_table_sizes() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.bands.len(), 7);
        assert_eq!(catalog.genres.len(), 6);
        assert_eq!(catalog.lengths.len(), 4);
        assert!(catalog.check().is_ok());
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let catalog = Catalog::standard();
        let band = catalog.band("700-900").expect("band should exist");
        assert!(band.contains(700));
        assert!(band.contains(900));
        assert!(!band.contains(901));
        assert_eq!(band.midpoint(), 800);
    }

    #[test]
    fn unknown_genre_code_falls_back_to_unk() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.genre_code("Literary"), "LIT");
        assert_eq!(catalog.genre_code("Unicorn"), "UNK");
    }

    #[test]
    fn default_topic_prefers_curated_middle_school_topics() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.default_topic("Procedural", "Middle School"), "Cooking");
        assert_eq!(catalog.default_topic("Procedural", "Academic"), "How-to");
        assert_eq!(catalog.default_topic("Unicorn", "Academic"), "General");
    }

    #[test]
    fn catalog_round_trips_through_json_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("catalog.json");
        let mut catalog = Catalog::standard();
        catalog.lengths.truncate(2);
        fs::write(&path, serde_json::to_vec(&catalog).expect("catalog should serialize"))
            .expect("catalog file should be written");

        let loaded = Catalog::load(&path).expect("catalog should load");
        assert_eq!(loaded.lengths.len(), 2);
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn catalog_with_inverted_band_is_rejected() {
        let mut catalog = Catalog::standard();
        catalog.bands[0].min_score = 400;
        let error = catalog.check().expect_err("inverted band should be rejected");
        assert!(error.to_string().contains("100-300"));
    }

    #[test]
    fn catalog_with_unordered_tables_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("catalog.json");
        let mut catalog = Catalog::standard();
        catalog.bands.swap(0, 3);
        fs::write(&path, serde_json::to_vec(&catalog).expect("catalog should serialize"))
            .expect("catalog file should be written");
        let error = Catalog::load(&path).expect_err("swapped bands should be rejected");
        assert!(format!("{error:#}").contains("band 300-500"));

        let mut catalog = Catalog::standard();
        catalog.lengths.swap(0, 3);
        let error = catalog.check().expect_err("swapped lengths should be rejected");
        assert!(error.to_string().contains("length type Short"));
    }

    #[test]
    fn overlapping_bands_are_rejected_but_shared_edges_are_not() {
        let mut catalog = Catalog::standard();
        assert_eq!(catalog.bands[0].max_score, catalog.bands[1].min_score);
        catalog.bands[1].min_score = 250;
        assert!(catalog.check().is_err());
    }

    #[test]
    fn duplicate_names_and_missing_fallback_are_rejected() {
        let mut catalog = Catalog::standard();
        catalog.genres[2].code = "NAR".to_string();
        let error = catalog.check().expect_err("duplicate code should be rejected");
        assert_eq!(error.to_string(), "duplicate genre code NAR in catalog");

        let mut catalog = Catalog::standard();
        catalog.genres.retain(|genre| genre.name != FALLBACK_GENRE);
        let error = catalog.check().expect_err("missing fallback should be rejected");
        assert!(error.to_string().contains("Expository"));
    }
}
