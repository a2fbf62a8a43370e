pub mod applicant;
pub mod matcher;
pub mod scorer;

pub use applicant::{ApplicantData, FieldValues};
pub use matcher::{AssignmentMap, FieldTarget, MatchOutcome, match_field_values, match_fields};
pub use scorer::{FieldScorer, ScoringConfig};
