use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FillerError;
use crate::lexicon::keys::LogicalFieldKey;
use crate::lexicon::pattern::{PatternSet, PatternSpec, TokenList};
use crate::text::normalize::text_fingerprint;

const BUILTIN_LEXICON: &str = include_str!("../../resources/lexicon.yaml");

// ============================================================================
// File model (YAML)
// ============================================================================

/// Lexicon as written on disk. Compiled into [`Lexicon`] once per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconSpec {
    pub version: u32,
    pub candidates: HashMap<LogicalFieldKey, Vec<PatternSpec>>,
    #[serde(default)]
    pub strong_tokens: HashMap<LogicalFieldKey, Vec<PatternSpec>>,
    #[serde(default)]
    pub negative_tokens: HashMap<LogicalFieldKey, Vec<PatternSpec>>,
    #[serde(default)]
    pub confirm_tokens: Vec<String>,
    #[serde(default)]
    pub search_tokens: Vec<String>,
    #[serde(default)]
    pub honeypot_tokens: Vec<String>,
    #[serde(default)]
    pub address_tokens: Vec<String>,
    #[serde(default)]
    pub stopwords: Vec<String>,
    #[serde(default)]
    pub autocomplete: HashMap<String, LogicalFieldKey>,
    pub radio: RadioVocabulary,
    pub consent: ConsentVocabulary,
    pub select: SelectVocabulary,
    pub job: JobVocabulary,
    #[serde(default)]
    pub data_aliases: DataAliases,
    #[serde(default)]
    pub success_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioVocabulary {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub marketing: Vec<String>,
    #[serde(default)]
    pub required_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentVocabulary {
    pub vocabulary: String,
    pub affirmative: String,
    pub selectors: Vec<String>,
    pub optin_prefer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectVocabulary {
    pub placeholder: String,
    pub inquiry_attr: String,
    pub position_attr: String,
    pub inquiry_penalty: String,
    pub generic_fallback: String,
    pub token_split: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTier {
    Executive,
    Director,
    Manager,
    JuniorManager,
    Specialist,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRule {
    pub tier: JobTier,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobVocabulary {
    pub c_level: String,
    pub tiers: Vec<JobRule>,
    pub options: HashMap<JobTier, Vec<String>>,
    pub fallback: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataAliases {
    #[serde(default)]
    pub prefecture: Vec<String>,
    #[serde(default)]
    pub inquiry: Vec<String>,
    #[serde(default)]
    pub job_title: Vec<String>,
}

// ============================================================================
// Compiled lexicon
// ============================================================================

/// Compiled, read-only lexicon shared by every task in the process.
#[derive(Debug, Clone)]
pub struct Lexicon {
    pub version: u32,
    pub fingerprint: String,
    candidates: HashMap<LogicalFieldKey, PatternSet>,
    strong: HashMap<LogicalFieldKey, PatternSet>,
    negative: HashMap<LogicalFieldKey, PatternSet>,
    pub confirm_tokens: TokenList,
    pub search_tokens: TokenList,
    pub honeypot_tokens: TokenList,
    pub address_tokens: TokenList,
    pub stopwords: TokenList,
    autocomplete: HashMap<String, LogicalFieldKey>,
    pub radio_positive: TokenList,
    pub radio_negative: TokenList,
    pub radio_marketing: TokenList,
    pub radio_required_markers: TokenList,
    pub consent_vocabulary: Regex,
    pub consent_affirmative: Regex,
    pub consent_selectors: Vec<String>,
    pub optin_prefer: Regex,
    pub select_placeholder: Regex,
    pub inquiry_attr: Regex,
    pub position_attr: Regex,
    pub inquiry_penalty: Regex,
    pub generic_fallback: Regex,
    pub token_split: Regex,
    pub job_c_level: Regex,
    pub job_tiers: Vec<(JobTier, Regex)>,
    pub job_options: HashMap<JobTier, Vec<String>>,
    pub job_fallback: Regex,
    pub data_aliases: DataAliases,
    pub success_phrases: TokenList,
}

impl Lexicon {
    /// The lexicon embedded in the binary.
    pub fn builtin() -> Result<Self, FillerError> {
        Self::from_yaml_str(BUILTIN_LEXICON)
    }

    /// Load an external lexicon file, replacing the built-in one.
    pub fn from_path(path: &Path) -> Result<Self, FillerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FillerError::Lexicon(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, FillerError> {
        let spec: LexiconSpec = serde_yaml::from_str(content)
            .map_err(|e| FillerError::Lexicon(format!("invalid lexicon YAML: {}", e)))?;
        let lexicon = Self::compile(&spec, text_fingerprint(content))?;
        info!(
            version = lexicon.version,
            fingerprint = %lexicon.fingerprint,
            keys = lexicon.candidates.len(),
            "lexicon loaded"
        );
        Ok(lexicon)
    }

    pub fn compile(spec: &LexiconSpec, fingerprint: String) -> Result<Self, FillerError> {
        let regex = |label: &str, src: &str| {
            Regex::new(src).map_err(|e| FillerError::Lexicon(format!("{}: {}", label, e)))
        };
        let set_map = |label: &str, map: &HashMap<LogicalFieldKey, Vec<PatternSpec>>| {
            map.iter()
                .map(|(key, specs)| {
                    PatternSet::compile(specs)
                        .map(|set| (*key, set))
                        .map_err(|e| FillerError::Lexicon(format!("{}.{}: {}", label, key, e)))
                })
                .collect::<Result<HashMap<_, _>, _>>()
        };

        let job_tiers = spec
            .job
            .tiers
            .iter()
            .map(|rule| regex("job.tiers", &rule.pattern).map(|re| (rule.tier, re)))
            .collect::<Result<Vec<_>, _>>()?;

        let autocomplete = spec
            .autocomplete
            .iter()
            .map(|(token, key)| (token.trim().to_lowercase(), *key))
            .collect();

        Ok(Self {
            version: spec.version,
            fingerprint,
            candidates: set_map("candidates", &spec.candidates)?,
            strong: set_map("strong_tokens", &spec.strong_tokens)?,
            negative: set_map("negative_tokens", &spec.negative_tokens)?,
            confirm_tokens: TokenList::new(&spec.confirm_tokens),
            search_tokens: TokenList::new(&spec.search_tokens),
            honeypot_tokens: TokenList::new(&spec.honeypot_tokens),
            address_tokens: TokenList::new(&spec.address_tokens),
            stopwords: TokenList::new(&spec.stopwords),
            autocomplete,
            radio_positive: TokenList::new(&spec.radio.positive),
            radio_negative: TokenList::new(&spec.radio.negative),
            radio_marketing: TokenList::new(&spec.radio.marketing),
            radio_required_markers: TokenList::new(&spec.radio.required_markers),
            consent_vocabulary: regex("consent.vocabulary", &spec.consent.vocabulary)?,
            consent_affirmative: regex("consent.affirmative", &spec.consent.affirmative)?,
            consent_selectors: spec.consent.selectors.clone(),
            optin_prefer: regex("consent.optin_prefer", &spec.consent.optin_prefer)?,
            select_placeholder: regex("select.placeholder", &spec.select.placeholder)?,
            inquiry_attr: regex("select.inquiry_attr", &spec.select.inquiry_attr)?,
            position_attr: regex("select.position_attr", &spec.select.position_attr)?,
            inquiry_penalty: regex("select.inquiry_penalty", &spec.select.inquiry_penalty)?,
            generic_fallback: regex("select.generic_fallback", &spec.select.generic_fallback)?,
            token_split: regex("select.token_split", &spec.select.token_split)?,
            job_c_level: regex("job.c_level", &spec.job.c_level)?,
            job_tiers,
            job_options: spec.job.options.clone(),
            job_fallback: regex("job.fallback", &spec.job.fallback)?,
            data_aliases: spec.data_aliases.clone(),
            success_phrases: TokenList::new(&spec.success_phrases),
        })
    }

    pub fn candidates(&self, key: LogicalFieldKey) -> Option<&PatternSet> {
        self.candidates.get(&key)
    }

    pub fn strong(&self, key: LogicalFieldKey) -> Option<&PatternSet> {
        self.strong.get(&key)
    }

    pub fn negative(&self, key: LogicalFieldKey) -> Option<&PatternSet> {
        self.negative.get(&key)
    }

    /// Whether `text` (normalized) hits any candidate pattern for `key`.
    pub fn label_mentions(&self, key: LogicalFieldKey, text: &str) -> bool {
        self.candidates(key).is_some_and(|set| set.is_match(text))
    }

    /// Key implied by an `autocomplete` attribute, if recognized.
    ///
    /// Section and shipping/billing prefixes (`section-x shipping tel`) are
    /// skipped; the last token carries the field name.
    pub fn autocomplete_key(&self, raw: &str) -> Option<LogicalFieldKey> {
        let lowered = raw.trim().to_lowercase();
        let token = lowered.split_whitespace().last()?;
        self.autocomplete.get(token).copied()
    }

    pub fn is_confirm_tagged(&self, text: &str) -> bool {
        self.confirm_tokens.any_in(text)
    }

    /// Strip stopwords ("必須", "任意", ...) from a normalized label.
    pub fn strip_stopwords(&self, text: &str) -> String {
        let mut out = text.to_string();
        for word in self.stopwords.iter() {
            out = out.replace(word, " ");
        }
        crate::text::normalize::collapse_whitespace(&out)
    }
}
