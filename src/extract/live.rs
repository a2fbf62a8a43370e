use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::browser::driver::{BrowserDriver, FrameRef};
use crate::browser::scripts;
use crate::choice::consent::FixedHit;
use crate::extract::descriptor::FieldDescriptor;
use crate::lexicon::Lexicon;

/// Frames of the current page, falling back to the main document alone.
pub async fn list_frames(driver: &mut dyn BrowserDriver) -> Vec<FrameRef> {
    match driver.frames().await {
        Ok(frames) if !frames.is_empty() => frames,
        Ok(_) => vec![FrameRef { index: 0, url: String::new() }],
        Err(e) => {
            warn!(error = %e, "frame listing failed, scanning main document only");
            vec![FrameRef { index: 0, url: String::new() }]
        }
    }
}

/// Scan every frame of the live page.
///
/// A frame whose evaluation fails is skipped, as is any single element
/// whose payload does not deserialize. The call itself never fails.
pub async fn extract_fields(driver: &mut dyn BrowserDriver, frames: &[FrameRef], scope: Option<&str>) -> Vec<FieldDescriptor> {
    let mut out = Vec::new();
    for frame in frames {
        let raw = match driver
            .evaluate(frame.index, scripts::EXTRACT_FIELDS, json!({ "scope": scope }))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(frame = frame.index, url = %frame.url, error = %e, "frame scan failed");
                continue;
            }
        };
        let Value::Array(items) = raw else {
            debug!(frame = frame.index, "frame scan returned no element list");
            continue;
        };
        for item in items {
            match serde_json::from_value::<FieldDescriptor>(item) {
                Ok(mut d) => {
                    d.frame_index = frame.index;
                    if d.frame_url.is_empty() {
                        d.frame_url = frame.url.clone();
                    }
                    d.order = out.len();
                    out.push(d);
                }
                Err(e) => debug!(frame = frame.index, error = %e, "skipped malformed element"),
            }
        }
    }
    debug!(fields = out.len(), frames = frames.len(), "live extraction done");
    out
}

#[derive(Debug, Deserialize)]
struct MarkedElement {
    selector: String,
    #[serde(default)]
    checked: bool,
}

/// Probe the lexicon's fixed consent selectors in every frame. Each hit
/// is tagged with a data attribute so it can be re-located later.
pub async fn find_fixed_consent(driver: &mut dyn BrowserDriver, frames: &[FrameRef], lexicon: &Lexicon) -> Vec<FixedHit> {
    let mut hits = Vec::new();
    for frame in frames {
        for (i, query) in lexicon.consent_selectors.iter().enumerate() {
            let mark = format!("consent-{}-{}", frame.index, i);
            let raw = match driver
                .evaluate(frame.index, scripts::MARK_FIRST, json!({ "query": query, "mark": mark }))
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(query = %query, error = %e, "consent selector probe failed");
                    continue;
                }
            };
            if raw.is_null() {
                continue;
            }
            if let Ok(found) = serde_json::from_value::<MarkedElement>(raw) {
                hits.push(FixedHit {
                    frame_index: frame.index,
                    selector: found.selector,
                    query: query.clone(),
                    checked: found.checked,
                });
            }
        }
    }
    hits
}
