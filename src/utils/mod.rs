use std::sync::OnceLock;

use regex_lite::Regex;
use thiserror::Error;

/// Errors raised while expanding a bracketed interface name pattern
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("empty range in pattern: {0}")]
    EmptyRange(String),
    #[error("reversed range {lo}-{hi} in pattern: {pattern}")]
    ReversedRange { pattern: String, lo: String, hi: String },
    #[error("invalid range item '{item}' in pattern: {pattern}")]
    InvalidItem { pattern: String, item: String },
    #[error("unbalanced brackets in pattern: {0}")]
    Unbalanced(String),
}

/// Derive a URL-safe slug from a display name.
/// e.g., "End of row switch" -> "end-of-row-switch"
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug
}

fn bracket_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\[\]]*)\]").expect("bracket pattern is valid"))
}

/// Expand a name pattern with bracketed ranges into concrete names.
///
/// Each bracket holds comma-separated items, each a single value or an
/// inclusive `lo-hi` range of integers or letters. A bracket without a `,` or
/// `-` separator is rejected. Multiple brackets expand as a cartesian product
/// with the leftmost bracket outermost:
/// `Ethernet1/[1-2]/[1-2]` -> `Ethernet1/1/1`, `Ethernet1/1/2`, `Ethernet1/2/1`, `Ethernet1/2/2`.
pub fn expand_name_pattern(pattern: &str) -> Result<Vec<String>, ExpandError> {
    let m = match bracket_regex().find(pattern) {
        Some(m) => m,
        None => {
            if pattern.contains('[') || pattern.contains(']') {
                return Err(ExpandError::Unbalanced(pattern.to_string()));
            }
            return Ok(vec![pattern.to_string()]);
        }
    };

    let prefix = &pattern[..m.start()];
    if prefix.contains('[') || prefix.contains(']') {
        return Err(ExpandError::Unbalanced(pattern.to_string()));
    }
    let body = &pattern[m.start() + 1..m.end() - 1];
    let values = parse_range_list(pattern, body)?;
    let tails = expand_name_pattern(&pattern[m.end()..])?;

    let mut names = Vec::with_capacity(values.len() * tails.len());
    for value in &values {
        for tail in &tails {
            names.push(format!("{}{}{}", prefix, value, tail));
        }
    }
    Ok(names)
}

/// Parse the inside of one bracket ("1-3,5" or "a-c") into its values
fn parse_range_list(pattern: &str, body: &str) -> Result<Vec<String>, ExpandError> {
    if body.trim().is_empty() {
        return Err(ExpandError::EmptyRange(pattern.to_string()));
    }

    let invalid = |item: &str| ExpandError::InvalidItem {
        pattern: pattern.to_string(),
        item: item.to_string(),
    };

    // A range list needs at least one separator
    if !body.contains(',') && !body.contains('-') {
        return Err(invalid(body.trim()));
    }

    let mut values = Vec::new();
    for item in body.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(ExpandError::EmptyRange(pattern.to_string()));
        }

        let Some((lo, hi)) = item.split_once('-') else {
            if !item.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid(item));
            }
            values.push(item.to_string());
            continue;
        };

        let reversed = || ExpandError::ReversedRange {
            pattern: pattern.to_string(),
            lo: lo.to_string(),
            hi: hi.to_string(),
        };

        if let (Ok(start), Ok(end)) = (lo.parse::<u32>(), hi.parse::<u32>()) {
            if start > end {
                return Err(reversed());
            }
            // Keep zero padding when the lower bound is written with it ("[01-12]")
            let width = if lo.len() > 1 && lo.starts_with('0') { lo.len() } else { 0 };
            values.extend((start..=end).map(|n| format!("{:0width$}", n, width = width)));
            continue;
        }

        match (single_letter(lo), single_letter(hi)) {
            (Some(start), Some(end)) if start.is_ascii_lowercase() == end.is_ascii_lowercase() => {
                if start > end {
                    return Err(reversed());
                }
                values.extend((start..=end).map(|c| c.to_string()));
            }
            _ => return Err(invalid(item)),
        }
    }
    Ok(values)
}

fn single_letter(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("End of row switch"), "end-of-row-switch");
        assert_eq!(slugify("Nexus 9332C"), "nexus-9332c");
        assert_eq!(slugify("C9300L-48T-4X"), "c9300l-48t-4x");
        assert_eq!(slugify("PHX Datacenter Racks (ALL)"), "phx-datacenter-racks-all");
        assert_eq!(slugify("  St Louis  Datacenter "), "st-louis-datacenter");
    }

    #[test]
    fn test_expand_single_range() {
        let names = expand_name_pattern("Ethernet[1-32]").unwrap();
        assert_eq!(names.len(), 32);
        assert_eq!(names.first().map(String::as_str), Some("Ethernet1"));
        assert_eq!(names.last().map(String::as_str), Some("Ethernet32"));
    }

    #[test]
    fn test_expand_preserves_literal_text() {
        let names = expand_name_pattern("GigabitEthernet1/0/[1-48]").unwrap();
        assert_eq!(names.len(), 48);
        assert!(names.iter().all(|n| n.starts_with("GigabitEthernet1/0/")));
        assert_eq!(names[47], "GigabitEthernet1/0/48");

        let names = expand_name_pattern("GigabitEthernet[0-2]").unwrap();
        assert_eq!(names, vec!["GigabitEthernet0", "GigabitEthernet1", "GigabitEthernet2"]);
    }

    #[test]
    fn test_expand_count_matches_range_width() {
        for (lo, hi) in [(0u32, 0u32), (1, 4), (3, 17), (1, 48)] {
            let names = expand_name_pattern(&format!("Port[{}-{}]x", lo, hi)).unwrap();
            assert_eq!(names.len() as u32, hi - lo + 1);
            let unique: HashSet<_> = names.iter().collect();
            assert_eq!(unique.len(), names.len());
        }
    }

    #[test]
    fn test_expand_nested_ranges() {
        let names = expand_name_pattern("Ethernet1/[1-8]/[1-32]").unwrap();
        assert_eq!(names.len(), 256);
        assert_eq!(names[0], "Ethernet1/1/1");
        assert_eq!(names[1], "Ethernet1/1/2");
        assert_eq!(names[32], "Ethernet1/2/1");
        assert_eq!(names[255], "Ethernet1/8/32");
    }

    #[test]
    fn test_expand_lists_and_letters() {
        assert_eq!(
            expand_name_pattern("Gi0/[1-2,5]").unwrap(),
            vec!["Gi0/1", "Gi0/2", "Gi0/5"]
        );
        assert_eq!(expand_name_pattern("Port[a-c]").unwrap(), vec!["Porta", "Portb", "Portc"]);
        assert_eq!(expand_name_pattern("eth[01-03]").unwrap(), vec!["eth01", "eth02", "eth03"]);
    }

    #[test]
    fn test_expand_without_brackets() {
        assert_eq!(expand_name_pattern("mgmt0").unwrap(), vec!["mgmt0"]);
    }

    #[test]
    fn test_expand_rejects_malformed() {
        assert!(matches!(expand_name_pattern("Ethernet[]"), Err(ExpandError::EmptyRange(_))));
        assert!(matches!(expand_name_pattern("Ethernet[5-1]"), Err(ExpandError::ReversedRange { .. })));
        assert!(matches!(expand_name_pattern("Ethernet[1-c]"), Err(ExpandError::InvalidItem { .. })));
        assert!(matches!(expand_name_pattern("Ethernet[a-C]"), Err(ExpandError::InvalidItem { .. })));
        assert!(matches!(expand_name_pattern("Ethernet[1-4"), Err(ExpandError::Unbalanced(_))));
        assert!(matches!(expand_name_pattern("Ethernet]1-4["), Err(ExpandError::Unbalanced(_))));
        assert!(matches!(expand_name_pattern("foo[bar]"), Err(ExpandError::InvalidItem { .. })));
        assert_eq!(
            expand_name_pattern("Eth[5]"),
            Err(ExpandError::InvalidItem { pattern: "Eth[5]".to_string(), item: "5".to_string() })
        );
    }
}
