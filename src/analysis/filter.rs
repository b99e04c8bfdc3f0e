//! Tag selection.
//!
//! The historian export mixes every point on the site. SAT (supply air
//! temperature) tags are recognised by a substring marker in the tag name;
//! one of them is then picked by exact name.

use crate::model::Reading;

/// Keep readings whose tag contains `marker` (matched literally).
pub fn filter_by_marker(readings: Vec<Reading>, marker: &str) -> Vec<Reading> {
    readings
        .into_iter()
        .filter(|r| r.tag_name.contains(marker))
        .collect()
}

/// Keep readings for exactly one tag.
///
/// An absent tag yields an empty vector; the scorer rejects that explicitly.
pub fn select_tag(readings: Vec<Reading>, tag: &str) -> Vec<Reading> {
    readings.into_iter().filter(|r| r.tag_name == tag).collect()
}

/// Distinct tags containing `marker`, in the order they first appear.
pub fn sat_tags(readings: &[Reading], marker: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for r in readings {
        if r.tag_name.contains(marker) && !tags.iter().any(|t| t == &r.tag_name) {
            tags.push(r.tag_name.clone());
        }
    }
    tags
}
