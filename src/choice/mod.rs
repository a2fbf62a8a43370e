pub mod apply;
pub mod consent;
pub mod radio;
pub mod select;

pub use consent::{ConsentAction, ConsentVia, FixedHit, consent_candidates, optin_candidates};
pub use radio::{RadioPick, RadioVia, plan_required_radios, radio_groups};
pub use select::{SelectDecision, SelectInputs, SelectKind, classify_select, resolve_assigned_select, resolve_select};
