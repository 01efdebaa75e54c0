//! Placeholder discovery for `{name}` tokens in a template.

use std::collections::HashSet;

/// Scan the template line by line and return every `{name}` token in order of
/// appearance. Duplicates are kept; use [`unique_names`] before validation.
///
/// Only lines carrying both braces are considered. Within a line every `{`
/// opens a token that ends at the next `}` before any further `{`; an opening
/// brace with no such closing brace is ignored.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    template
        .lines()
        .filter(|line| line.contains('{') && line.contains('}'))
        .flat_map(|line| line.split('{').skip(1))
        .filter_map(|segment| segment.split_once('}').map(|(name, _)| name.to_string()))
        .collect()
}

/// Deduplicate placeholder names, preserving first-appearance order.
pub fn unique_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_first_appearance_order() {
        let template = "# Invoice {invoice_number}\n\nDated {date} for {client}\n";
        assert_eq!(
            extract_placeholders(template),
            vec!["invoice_number", "date", "client"]
        );
    }

    #[test]
    fn keeps_duplicates_and_dedupes_on_request() {
        let template = "{total} due\nPay {total} by {date}\n";
        let names = extract_placeholders(template);
        assert_eq!(names, vec!["total", "total", "date"]);
        assert_eq!(unique_names(&names), vec!["total", "date"]);
    }

    #[test]
    fn ignores_lines_without_both_braces() {
        let template = "open { only\nclose } only\n| {item} | {amount} |\n";
        assert_eq!(extract_placeholders(template), vec!["item", "amount"]);
    }

    #[test]
    fn later_opening_brace_restarts_the_token() {
        assert_eq!(extract_placeholders("{a {b}"), vec!["b"]);
    }

    #[test]
    fn unterminated_brace_after_token_is_ignored() {
        assert_eq!(extract_placeholders("{a} and {b"), vec!["a"]);
    }

    #[test]
    fn doubled_braces_yield_the_inner_name() {
        assert_eq!(extract_placeholders("{{total}}"), vec!["total"]);
    }

    #[test]
    fn empty_template_has_no_placeholders() {
        assert!(extract_placeholders("").is_empty());
    }
}
