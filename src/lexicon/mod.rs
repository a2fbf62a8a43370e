pub mod keys;
pub mod lexicon_model;
pub mod pattern;

pub use keys::LogicalFieldKey;
pub use lexicon_model::{JobTier, Lexicon};
