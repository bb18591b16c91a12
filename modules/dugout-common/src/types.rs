use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// --- Labels ---

/// Classification tag on a post's text. Three-valued: a row starts out
/// unlabeled and is only ever moved to one of the two known classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Label {
    #[default]
    Unknown,
    /// Not an injury report.
    NotInjury,
    /// An injury report.
    Injury,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Unknown => "unknown",
            Label::NotInjury => "0",
            Label::Injury => "1",
        }
    }

    /// Lenient parse. `0` and `1` are the known classes; everything else —
    /// including the `x` placeholder used in correction sheets — reads as
    /// unknown.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim() {
            "0" => Label::NotInjury,
            "1" => Label::Injury,
            _ => Label::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Label::Unknown)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Label::from_str_loose(&s))
    }
}

/// Serde adapter for the label column of correction sheets, which keep the
/// legacy `x` spelling for "not yet resolved" instead of `unknown`.
pub mod correction_label {
    use super::Label;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(label: &Label, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match label {
            Label::Unknown => "x",
            known => known.as_str(),
        };
        serializer.serialize_str(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Label, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Label::from_str_loose(&s))
    }
}

// --- Raw snapshot rows ---

/// One observation of a post at scrape time, exactly as the scraper wrote
/// it. `url_list` and `photo_list` stay raw strings (possibly
/// bracket-decorated, e.g. `['https://…']`) — only their presence matters
/// downstream. Exact equality across all nine fields drives chunk dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub permalink: String,
    pub text: String,
    pub reply_count: u64,
    pub repost_count: u64,
    pub like_count: u64,
    pub url_list: String,
    pub photo_list: String,
    #[serde(with = "flag")]
    pub is_repost: bool,
    pub scrape_date: NaiveDate,
}

// --- Canonical records ---

/// The reconciled one-row-per-(permalink, text) view: counters are the
/// maximum seen across all contributing snapshots, presence flags the OR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub permalink: String,
    pub text: String,
    pub reply_count: u64,
    pub repost_count: u64,
    pub like_count: u64,
    #[serde(with = "flag")]
    pub link_present: bool,
    #[serde(with = "flag")]
    pub photo_present: bool,
    #[serde(with = "flag")]
    pub is_repost: bool,
    pub label: Label,
}

// --- Label corrections ---

/// An externally supplied (label, text) pair from an annotation sheet.
/// Column order matches the sheet format: label first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCorrection {
    #[serde(with = "correction_label")]
    pub label: Label,
    pub text: String,
}

// --- Presence helpers ---

/// Whether a scraped list-valued field holds anything, after stripping
/// bracket/quote decoration. `[]`, `''`, and whitespace count as empty.
pub fn list_present(raw: &str) -> bool {
    !raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',')
        .is_empty()
}

/// Lenient boolean columns: scrapers emit `True`/`False`, `true`/`false`,
/// or `1`/`0` depending on the run that produced the file.
pub mod flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.trim() {
            "1" | "true" | "True" | "TRUE" => Ok(true),
            "0" | "false" | "False" | "FALSE" | "" => Ok(false),
            other => Err(de::Error::custom(format!("not a boolean flag: {other:?}"))),
        }
    }
}
