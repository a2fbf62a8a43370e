use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::FillerError;
use crate::lexicon::LogicalFieldKey;
use crate::sanitize::values::{sanitize_for_key, split_name, split_phone};

/// One applicant record: open string vocabulary, superset of the logical
/// keys. Absent or blank keys are simply not requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApplicantData {
    #[serde(deserialize_with = "stringly_map")]
    values: BTreeMap<String, String>,
}

fn stringly_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_yaml::Value> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| {
            let text = match v {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k, text))
        })
        .collect())
}

impl ApplicantData {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, FillerError> {
        serde_yaml::from_str(content).map_err(|e| FillerError::Input {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, FillerError> {
        let content = std::fs::read_to_string(path).map_err(|e| FillerError::Input {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| FillerError::Input {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Raw value for a data key, if present and non-blank.
    pub fn get(&self, raw_key: &str) -> Option<&str> {
        self.values
            .get(raw_key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-blank value among `aliases`, in order.
    pub fn first_of(&self, aliases: &[String]) -> Option<&str> {
        aliases.iter().find_map(|alias| self.get(alias))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Logical keys the record asks for (canonical names or aliases).
    pub fn requested_keys(&self) -> BTreeSet<LogicalFieldKey> {
        self.direct_values().into_keys().collect()
    }

    fn direct_values(&self) -> BTreeMap<LogicalFieldKey, String> {
        let mut out = BTreeMap::new();
        for (raw_key, value) in &self.values {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match LogicalFieldKey::from_data_key(raw_key) {
                // Canonical spellings win over aliases.
                Some(key) if raw_key.parse::<LogicalFieldKey>().is_ok() => {
                    out.insert(key, value.to_string());
                }
                Some(key) => {
                    out.entry(key).or_insert_with(|| value.to_string());
                }
                None => debug!(key = %raw_key, "applicant key has no logical field"),
            }
        }
        out
    }

    /// Sanitized per-key values, including derived split/confirm values.
    pub fn field_values(&self) -> FieldValues {
        let direct = self.direct_values();
        let requested: BTreeSet<LogicalFieldKey> = direct.keys().copied().collect();
        let mut values: BTreeMap<LogicalFieldKey, String> = direct
            .iter()
            .map(|(k, v)| (*k, sanitize_for_key(*k, v)))
            .collect();
        let mut derived = BTreeSet::new();

        let mut offer = |values: &mut BTreeMap<LogicalFieldKey, String>, key: LogicalFieldKey, value: String| {
            if !value.is_empty() && !values.contains_key(&key) {
                values.insert(key, sanitize_for_key(key, &value));
                derived.insert(key);
            }
        };

        if let Some(name) = direct.get(&LogicalFieldKey::Name) {
            let (last, first) = split_name(name);
            offer(&mut values, LogicalFieldKey::LastName, last);
            offer(&mut values, LogicalFieldKey::FirstName, first);
        }
        if let Some(kana) = direct.get(&LogicalFieldKey::Furigana) {
            let (sei, mei) = split_name(kana);
            offer(&mut values, LogicalFieldKey::KanaSei, sei);
            offer(&mut values, LogicalFieldKey::KanaMei, mei);
        }
        if let Some(phone) = direct.get(&LogicalFieldKey::Phone) {
            let (a, b, c) = split_phone(phone);
            offer(&mut values, LogicalFieldKey::Phone1, a);
            offer(&mut values, LogicalFieldKey::Phone2, b);
            offer(&mut values, LogicalFieldKey::Phone3, c);
        }
        if let Some(email) = direct.get(&LogicalFieldKey::Email) {
            offer(&mut values, LogicalFieldKey::EmailConfirm, email.clone());
        }

        FieldValues {
            values,
            requested,
            derived,
        }
    }
}

/// Values the matcher works with for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    pub values: BTreeMap<LogicalFieldKey, String>,
    /// Keys the applicant supplied directly; only these can be unmapped.
    pub requested: BTreeSet<LogicalFieldKey>,
    /// Keys offered by splitting or copying a requested value.
    pub derived: BTreeSet<LogicalFieldKey>,
}

impl FieldValues {
    pub fn get(&self, key: LogicalFieldKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = LogicalFieldKey> + '_ {
        self.values.keys().copied()
    }

    pub fn contains(&self, key: LogicalFieldKey) -> bool {
        self.values.contains_key(&key)
    }
}
