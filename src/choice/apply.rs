use tracing::{debug, info};

use crate::browser::actions;
use crate::browser::driver::BrowserDriver;
use crate::choice::consent::ConsentAction;
use crate::choice::radio::RadioPick;
use crate::choice::select::SelectDecision;

/// Apply a select decision through the label → value → mutation chain.
pub async fn apply_select(driver: &mut dyn BrowserDriver, frame: usize, selector: &str, decision: &SelectDecision) -> bool {
    let ok = actions::select_option(driver, frame, selector, &decision.label, &decision.value).await;
    if ok {
        debug!(selector, kind = %decision.kind, label = %decision.label, "select applied");
    }
    ok
}

/// Check each planned radio. Returns the picks that took.
pub async fn apply_radio_picks(driver: &mut dyn BrowserDriver, picks: &[RadioPick]) -> Vec<RadioPick> {
    let mut applied = Vec::new();
    for pick in picks {
        if actions::check(driver, pick.frame_index, &pick.selector).await {
            debug!(group = %pick.group, label = %pick.label, "radio checked");
            applied.push(pick.clone());
        }
    }
    applied
}

/// Try consent targets in order and stop at the first that ends up checked.
pub async fn accept_consent(driver: &mut dyn BrowserDriver, candidates: &[ConsentAction]) -> Option<ConsentAction> {
    for candidate in candidates {
        if actions::check(driver, candidate.frame_index, &candidate.selector).await {
            info!(selector = %candidate.selector, via = ?candidate.via, "consent accepted");
            return Some(candidate.clone());
        }
    }
    None
}

/// Check at most one optional checkbox.
pub async fn apply_optin(driver: &mut dyn BrowserDriver, candidates: &[ConsentAction]) -> Option<ConsentAction> {
    for candidate in candidates {
        if actions::check(driver, candidate.frame_index, &candidate.selector).await {
            debug!(selector = %candidate.selector, label = %candidate.label, "opt-in checkbox checked");
            return Some(candidate.clone());
        }
    }
    None
}
