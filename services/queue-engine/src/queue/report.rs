//! Human-readable report fragments shared by the engine entry points.

use std::fmt::Display;

/// Builds the outcome lines for a batch job over named objects.
///
/// Each non-empty list produces one line, in the order successes,
/// not-found, errors:
///
/// ```text
/// \nDeployments successfully re-associate: a, b.
/// \nDeployments failed to re-associate (Not Found): c.
/// \nDeployments failed to re-associate (Error): d.
/// ```
pub fn generate_response_string<S: Display>(
    object: &str,
    job: &str,
    successes: &[S],
    not_found: &[S],
    errors: &[S],
) -> String {
    let mut response = String::new();
    if !successes.is_empty() {
        response.push_str(&format!(
            "\n{object}s successfully {job}: {}.",
            join(successes)
        ));
    }
    if !not_found.is_empty() {
        response.push_str(&format!(
            "\n{object}s failed to {job} (Not Found): {}.",
            join(not_found)
        ));
    }
    if !errors.is_empty() {
        response.push_str(&format!(
            "\n{object}s failed to {job} (Error): {}.",
            join(errors)
        ));
    }
    response
}

pub(crate) fn join<S: Display>(items: &[S]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The `error` field of a sweep report listing per-item failures.
pub(crate) fn error_summary(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(format!(
        "{} Error(s) Occurred:\n{}",
        errors.len(),
        errors.join("\n")
    ))
}
