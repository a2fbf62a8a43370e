mod common;

use form_filler::error::FillerError;
use form_filler::lexicon::pattern::{PatternSet, PatternSpec, TokenList};
use form_filler::lexicon::{JobTier, Lexicon, LogicalFieldKey};

use crate::common::builders::lexicon;

// ============================================================================
// Built-in lexicon
// ============================================================================

#[test]
fn builtin_lexicon_covers_every_core_key() {
    let lex = lexicon();
    use LogicalFieldKey::*;
    for key in [
        Name, LastName, FirstName, Furigana, KanaSei, KanaMei, Email, EmailConfirm, Phone, Phone1, Phone2, Phone3,
        Company, Department, Position, Website, Subject, Message, Address, PostalCode, Prefecture, City, Street,
    ] {
        assert!(lex.candidates(key).is_some_and(|set| !set.is_empty()), "no candidates for {}", key);
    }
    assert!(lex.version >= 1);
    assert_eq!(lex.fingerprint.len(), 40);
}

#[test]
fn builtin_fingerprint_is_stable_across_loads() {
    let a = Lexicon::builtin().unwrap();
    let b = Lexicon::builtin().unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
}

#[test]
fn autocomplete_tokens_map_to_keys() {
    let lex = lexicon();
    assert_eq!(lex.autocomplete_key("email"), Some(LogicalFieldKey::Email));
    assert_eq!(lex.autocomplete_key("tel"), Some(LogicalFieldKey::Phone));
    assert_eq!(lex.autocomplete_key("given-name"), Some(LogicalFieldKey::FirstName));
    assert_eq!(lex.autocomplete_key("family-name"), Some(LogicalFieldKey::LastName));
    assert_eq!(lex.autocomplete_key("section-a shipping postal-code"), Some(LogicalFieldKey::PostalCode));
    assert_eq!(lex.autocomplete_key("Organization"), Some(LogicalFieldKey::Company));
    assert_eq!(lex.autocomplete_key("off"), None);
    assert_eq!(lex.autocomplete_key(""), None);
}

#[test]
fn stopwords_are_stripped_from_labels() {
    let lex = lexicon();
    assert_eq!(lex.strip_stopwords("お名前 必須"), "お名前");
    assert_eq!(lex.strip_stopwords("email *"), "email");
}

#[test]
fn confirm_tagging_uses_substrings() {
    let lex = lexicon();
    assert!(lex.is_confirm_tagged("email_confirm"));
    assert!(lex.is_confirm_tagged("メールアドレス(確認用)"));
    assert!(!lex.is_confirm_tagged("email"));
}

#[test]
fn job_vocabulary_is_loaded_in_tier_order() {
    let lex = lexicon();
    let tiers: Vec<JobTier> = lex.job_tiers.iter().map(|(tier, _)| *tier).collect();
    assert_eq!(tiers.first(), Some(&JobTier::Executive));
    assert_eq!(tiers.last(), Some(&JobTier::Staff));
    assert!(lex.job_options.contains_key(&JobTier::Manager));
}

#[test]
fn data_aliases_are_loaded() {
    let lex = lexicon();
    assert!(lex.data_aliases.prefecture.iter().any(|a| a == "prefecture"));
    assert!(lex.data_aliases.inquiry.iter().any(|a| a == "inquiry_intent"));
    assert!(lex.data_aliases.job_title.iter().any(|a| a == "job_title"));
}

// ============================================================================
// Loading errors
// ============================================================================

#[test]
fn invalid_yaml_is_a_lexicon_error() {
    let err = Lexicon::from_yaml_str("version: [unclosed").unwrap_err();
    assert!(matches!(err, FillerError::Lexicon(_)));
}

#[test]
fn invalid_regex_names_the_offending_entry() {
    let builtin = include_str!("../resources/lexicon.yaml");
    let broken = builtin.replace(
        "c_level: '\\bc[eftom]o\\b'",
        "c_level: '(unclosed'",
    );
    assert_ne!(broken, builtin, "fixture replacement did not apply");
    let err = Lexicon::from_yaml_str(&broken).unwrap_err();
    match err {
        FillerError::Lexicon(msg) => assert!(msg.contains("job.c_level"), "{}", msg),
        other => panic!("expected lexicon error, got {:?}", other),
    }
}

#[test]
fn missing_file_is_a_lexicon_error() {
    let err = Lexicon::from_path(std::path::Path::new("/nonexistent/lexicon.yaml")).unwrap_err();
    assert!(matches!(err, FillerError::Lexicon(_)));
}

// ============================================================================
// Patterns
// ============================================================================

#[test]
fn guarded_pattern_rejects_embedded_matches() {
    let set = PatternSet::compile(&[PatternSpec::token("tel")]).unwrap();
    assert!(set.is_match("tel"));
    assert!(set.is_match("your-tel"));
    assert!(!set.is_match("hotel"));
    assert!(!set.is_match("telling"));
}

#[test]
fn guarded_pattern_finds_a_later_clean_match() {
    let set = PatternSet::compile(&[PatternSpec::token("tel")]).unwrap();
    assert!(set.is_match("hotel tel"));
}

#[test]
fn best_match_len_prefers_the_longest_rule() {
    let set = PatternSet::compile(&[
        PatternSpec::Plain("mail".into()),
        PatternSpec::Plain("e[-_ ]?mail".into()),
    ])
    .unwrap();
    assert_eq!(set.best_match_len("e-mail"), Some(6));
    assert_eq!(set.best_match_len(""), None);
    assert_eq!(set.best_match_len("phone"), None);
}

#[test]
fn guarded_spec_deserializes_from_yaml_mapping() {
    let spec: PatternSpec = serde_yaml::from_str("{ re: 'state', not_preceded_by: '[a-z]' }").unwrap();
    let pattern = spec.compile().unwrap();
    assert!(pattern.is_match("state"));
    assert!(!pattern.is_match("estate"));
}

#[test]
fn token_list_normalizes_its_entries() {
    let list = TokenList::new(&["ＨＰ_".to_string(), "".to_string()]);
    assert!(list.any_in("field_hp_1"));
    assert!(!list.exact(""));
}

#[test]
fn token_list_word_matching_bounds_latin_tokens() {
    let list = TokenList::new(&["no".to_string(), "ok".to_string(), "しない".to_string()]);
    assert!(list.any_in("yes, i know"));
    assert!(!list.any_word("yes, i know"));
    assert!(!list.any_word("facebook"));
    assert!(list.any_word("no thanks"));
    assert!(list.any_word("ok_1"));
    assert!(list.any_word("希望しない"));
}

// ============================================================================
// Logical keys
// ============================================================================

#[test]
fn data_key_aliases_resolve() {
    assert_eq!(LogicalFieldKey::from_data_key("email"), Some(LogicalFieldKey::Email));
    assert_eq!(LogicalFieldKey::from_data_key("tel"), Some(LogicalFieldKey::Phone));
    assert_eq!(LogicalFieldKey::from_data_key("company_name"), Some(LogicalFieldKey::Company));
    assert_eq!(LogicalFieldKey::from_data_key("favourite_colour"), None);
}

#[test]
fn extension_keys_round_trip_through_strings() {
    let key: LogicalFieldKey = "ext_03".parse().unwrap();
    assert_eq!(key, LogicalFieldKey::Extension(3));
    assert_eq!(key.as_str(), "ext_03");
}

#[test]
fn priority_follows_vocabulary_order() {
    assert!(LogicalFieldKey::Subject.priority() < LogicalFieldKey::Name.priority());
    assert!(LogicalFieldKey::Email.priority() < LogicalFieldKey::Message.priority());
    let ranks: Vec<usize> = LogicalFieldKey::all().into_iter().map(LogicalFieldKey::priority).collect();
    let expected: Vec<usize> = (0..ranks.len()).collect();
    assert_eq!(ranks, expected);
}
