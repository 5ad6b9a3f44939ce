// pipewright-core/src/domain/transform/columns.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

fn re_non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Hardcoded pattern, cannot fail.
    RE.get_or_init(|| Regex::new(r"\W+").unwrap_or_else(|_| unreachable!()))
}

fn re_underscores() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").unwrap_or_else(|_| unreachable!()))
}

/// Case style applied by `format_column_names`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    Camel,
    Upper,
    Lower,
}

impl FromStr for NameStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "camel" | "camel_case" | "camelcase" => Ok(Self::Camel),
            "upper" | "all_caps" | "uppercase" => Ok(Self::Upper),
            "lower" | "all_lower" | "lowercase" => Ok(Self::Lower),
            _ => Err(format!("Unknown column name format: {}", s)),
        }
    }
}

impl std::fmt::Display for NameStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Camel => "camel",
            Self::Upper => "upper",
            Self::Lower => "lower",
        };
        write!(f, "{}", s)
    }
}

/// `"First Name!!"` -> `"First_Name"`.
pub fn clean_name(name: &str) -> String {
    let replaced = re_non_word().replace_all(name, "_");
    let collapsed = re_underscores().replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

pub fn format_name(name: &str, style: NameStyle) -> String {
    match style {
        NameStyle::Camel => to_camel_case(name),
        NameStyle::Upper => name.to_uppercase(),
        NameStyle::Lower => name.to_lowercase(),
    }
}

fn to_camel_case(name: &str) -> String {
    let mut parts = name.split('_');
    let mut out = parts.next().unwrap_or_default().to_lowercase();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Keeps ASCII digits only, in order.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("First Name!!"), "First_Name");
        assert_eq!(clean_name("  B@R  "), "B_R");
        assert_eq!(clean_name("__a__b__"), "a_b");
        assert_eq!(clean_name("already_clean"), "already_clean");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(format_name("first_name_x", NameStyle::Camel), "firstNameX");
        assert_eq!(format_name("ORDER_TOTAL", NameStyle::Camel), "orderTotal");
        assert_eq!(format_name("id", NameStyle::Camel), "id");
        assert_eq!(format_name("a__b", NameStyle::Camel), "aB");
    }

    #[test]
    fn test_upper_lower() {
        assert_eq!(format_name("Mixed_Case", NameStyle::Upper), "MIXED_CASE");
        assert_eq!(format_name("Mixed_Case", NameStyle::Lower), "mixed_case");
    }

    #[test]
    fn test_style_aliases() {
        assert_eq!("camel_case".parse::<NameStyle>(), Ok(NameStyle::Camel));
        assert_eq!("all_caps".parse::<NameStyle>(), Ok(NameStyle::Upper));
        assert_eq!("all_lower".parse::<NameStyle>(), Ok(NameStyle::Lower));
        assert!("kebab".parse::<NameStyle>().is_err());
    }

    #[test]
    fn test_digits_only_is_idempotent() {
        let once = digits_only("(123) 456-7890");
        assert_eq!(once, "1234567890");
        assert_eq!(digits_only(&once), once);
        assert_eq!(digits_only("+44 20 7946 0958"), "442079460958");
    }
}
