use std::time::Duration;

use crate::runner::task::{FormResult, FormStatus};

// ============================================================================
// Console reporter: batch summary
// ============================================================================

/// Format a batch run for terminal output.
///
/// Produces output like:
/// ```text
/// === Form run: 3 tasks ===
///
/// ✓ OK           https://a.example/contact
/// ✗ SUBMIT_FAIL  https://b.example/form (no success message)
///     unmapped: phone, company
///
/// === Results: OK 1, SUBMIT_FAIL 1, ERROR 1 in 12.3s ===
/// ```
pub fn format_run_summary(results: &[FormResult], elapsed: Option<Duration>) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Form run: {} tasks ===\n\n", results.len()));

    for result in results {
        let marker = match result.status {
            FormStatus::Ok | FormStatus::DryRun => "\u{2713}",
            _ => "\u{2717}",
        };
        out.push_str(&format!("{} {:<12} {}", marker, result.status.as_str(), result.form_url));
        if result.status != FormStatus::Ok && !result.note.is_empty() {
            out.push_str(&format!(" ({})", result.note));
        }
        out.push('\n');
        if !result.unmapped_fields.is_empty() {
            out.push_str(&format!("    unmapped: {}\n", result.unmapped_fields.join(", ")));
        }
    }

    let counts: Vec<String> = FormStatus::all()
        .iter()
        .filter_map(|status| {
            let n = results.iter().filter(|r| r.status == *status).count();
            (n > 0).then(|| format!("{} {}", status, n))
        })
        .collect();

    out.push_str("\n=== Results: ");
    if counts.is_empty() {
        out.push_str("nothing processed");
    } else {
        out.push_str(&counts.join(", "));
    }
    if let Some(elapsed) = elapsed {
        out.push_str(&format!(" in {:.1}s", elapsed.as_secs_f64()));
    }
    out.push_str(" ===\n");

    out
}
