//! Human-friendly display names
//!
//! Raw labels from the OS range from `DELL U2720Q` to `HDMI-1`. We try, in
//! order: a known manufacturer prefix, a generic "word + model" split, and a
//! bare model number. When none match, the name falls back to the
//! resolution class plus the display's role. Only the display's own fields
//! are consulted, so a name never depends on enumeration order.

use crate::descriptor::Bounds;

/// Canonical spellings, matched case-insensitively against the first token
const KNOWN_MANUFACTURERS: &[&str] = &[
    "Acer", "AOC", "Apple", "ASUS", "BenQ", "Dell", "Eizo", "Epson", "Gigabyte", "Hisense", "HP",
    "Huawei", "iiyama", "Lenovo", "LG", "MSI", "NEC", "Optoma", "Panasonic", "Philips", "Samsung",
    "Sharp", "Sony", "TCL", "Toshiba", "ViewSonic", "Vizio", "Xiaomi",
];

/// Connector names some platforms report instead of a monitor name
const CONNECTOR_PREFIXES: &[&str] = &["HDMI", "DP", "EDP", "DVI", "VGA", "LVDS", "VIRTUAL", "USB"];

/// Words that carry no manufacturer information
const GENERIC_WORDS: &[&str] = &[
    "display", "monitor", "screen", "generic", "unknown", "built-in", "builtin", "default",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayName {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

/// Best-effort manufacturer/model extraction from a raw label.
pub fn parse_label(label: &str) -> DisplayName {
    let label = label.trim();
    if label.is_empty() {
        return DisplayName::default();
    }

    manufacturer_prefixed(label)
        .or_else(|| word_and_rest(label))
        .or_else(|| numeric_suffix(label))
        .unwrap_or_default()
}

fn split_first(label: &str) -> (&str, &str) {
    let label = label.trim();
    match label.find(|c: char| c.is_whitespace() || c == '-' || c == '_') {
        Some(idx) => {
            let rest = label[idx..].trim_start_matches(|c: char| c.is_whitespace() || c == '-' || c == '_');
            (&label[..idx], rest.trim())
        }
        None => (label, ""),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn manufacturer_prefixed(label: &str) -> Option<DisplayName> {
    let (first, rest) = split_first(label);
    let canonical = KNOWN_MANUFACTURERS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(first))?;

    Some(DisplayName {
        manufacturer: Some(canonical.to_string()),
        model: non_empty(rest),
    })
}

fn word_and_rest(label: &str) -> Option<DisplayName> {
    let (first, rest) = label.split_once(char::is_whitespace)?;
    let rest = rest.trim();

    let looks_like_brand = first.len() >= 2 && first.chars().all(|c| c.is_ascii_alphabetic());
    let is_generic = GENERIC_WORDS.iter().any(|w| w.eq_ignore_ascii_case(first));
    let rest_is_model = rest.chars().any(|c| c.is_ascii_digit());

    if !looks_like_brand || is_generic || !rest_is_model || is_connector(first) {
        return None;
    }

    Some(DisplayName {
        manufacturer: Some(first.to_string()),
        model: non_empty(rest),
    })
}

fn numeric_suffix(label: &str) -> Option<DisplayName> {
    if label.contains(char::is_whitespace) || is_connector(label) {
        return None;
    }

    let has_letters = label.chars().any(|c| c.is_ascii_alphabetic());
    let ends_with_digit = label.chars().last().is_some_and(|c| c.is_ascii_digit());
    if !has_letters || !ends_with_digit {
        return None;
    }

    Some(DisplayName {
        manufacturer: None,
        model: Some(label.to_string()),
    })
}

fn is_connector(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    CONNECTOR_PREFIXES.iter().any(|prefix| {
        upper.strip_prefix(prefix).is_some_and(|tail| {
            tail.is_empty()
                || tail
                    .trim_start_matches(['-', '_'])
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '-')
        })
    })
}

/// Resolution class of a display, independent of rotation.
pub fn resolution_class(bounds: &Bounds) -> &'static str {
    let long = bounds.width.max(bounds.height);
    let short = bounds.width.min(bounds.height);

    if long >= 3840 && short >= 2160 {
        "4K Display"
    } else if long >= 1920 && short >= 1080 {
        "Full HD Display"
    } else {
        "Display"
    }
}

/// Name shown to the operator when choosing an output display.
pub fn friendly_name(name: &DisplayName, bounds: &Bounds, is_primary: bool) -> String {
    match (&name.manufacturer, &name.model) {
        (Some(manufacturer), Some(model)) => format!("{} {}", manufacturer, model),
        (None, Some(model)) => model.clone(),
        (Some(manufacturer), None) => format!("{} Display", manufacturer),
        (None, None) => {
            let role = if is_primary { "Primary" } else { "Secondary" };
            format!("{} ({})", resolution_class(bounds), role)
        }
    }
}
