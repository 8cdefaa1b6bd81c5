//! Pattern helpers shared by handler registration and adapter diagnostics

use regex_lite::Regex;

/// Build the regex source used by respond handlers.
///
/// The text must start with the robot's alias or name, optionally prefixed
/// with `@` and followed by `:` or `,`, then whitespace, then `pattern`.
pub fn respond_pattern(name: &str, alias: &str, pattern: &str) -> String {
    let names: Vec<String> = [alias, name]
        .iter()
        .filter(|n| !n.is_empty())
        .map(|n| regex_lite::escape(n))
        .collect();

    format!(r"^(?:@?(?:{})[:,]?)\s+(?:{})", names.join("|"), pattern)
}

/// Capture groups of `re` against `text`, group 0 first.
///
/// Groups that did not participate in the match are returned as empty strings.
pub fn captures(re: &Regex, text: &str) -> Option<Vec<String>> {
    re.captures(text).map(|caps| {
        caps.iter()
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    })
}
