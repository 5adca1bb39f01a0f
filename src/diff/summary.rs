//! Human-readable change summary
//!
//! `Added N countries: k1, k2 | Removed N countries: ... | Modified N countries: ...`
//! with empty categories omitted, or `No changes detected`.

use super::detector::ChangeSet;

pub const NO_CHANGES: &str = "No changes detected";

const NOUN: &str = "countries";

pub fn format_change_summary(changes: &ChangeSet) -> String {
    let categories = [
        ("Added", changes.added()),
        ("Removed", changes.removed()),
        ("Modified", changes.modified()),
    ];

    let parts: Vec<String> = categories
        .iter()
        .filter(|(_, keys)| !keys.is_empty())
        .map(|(verb, keys)| {
            let list: Vec<&str> = keys.iter().map(String::as_str).collect();
            format!("{} {} {}: {}", verb, keys.len(), NOUN, list.join(", "))
        })
        .collect();

    if parts.is_empty() {
        return NO_CHANGES.to_string();
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_changes() {
        assert_eq!(format_change_summary(&ChangeSet::default()), "No changes detected");
    }

    #[test]
    fn test_omits_empty_categories() {
        let changes = ChangeSet::from_keys(&["FR"], &[], &["US"]);
        assert_eq!(
            format_change_summary(&changes),
            "Added 1 countries: FR | Modified 1 countries: US"
        );
    }

    #[test]
    fn test_all_categories_sorted() {
        let changes = ChangeSet::from_keys(&["ZW", "AD"], &["YU"], &["DE"]);
        assert_eq!(
            format_change_summary(&changes),
            "Added 2 countries: AD, ZW | Removed 1 countries: YU | Modified 1 countries: DE"
        );
    }
}
