//! Name sanitization shared by catalog names, publish keys and the
//! name-pattern correlation fallback.
//!
//! Catalog entity names and Kubernetes resource names accept the same shape:
//! runs of `[a-zA-Z0-9]` joined by single `-`, `_` or `.` separators, at most
//! 63 characters. Both sides of every name comparison go through [`sanitize`].

/// Maximum length of a sanitized name
pub const MAX_NAME_LEN: usize = 63;

fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '.')
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_separator(c)
}

/// Sanitize a free-form name into a catalog/Kubernetes-safe identifier.
///
/// Drops characters outside `[a-zA-Z0-9-_.]`, collapses separator runs to
/// their first character, trims separators from both ends and truncates to
/// [`MAX_NAME_LEN`]. The result is a fixed point: sanitizing it again is a
/// no-op.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len().min(MAX_NAME_LEN));
    let mut last_was_sep = true;
    for c in name.chars().filter(|c| is_allowed(*c)) {
        if is_separator(c) {
            if last_was_sep {
                continue;
            }
            last_was_sep = true;
        } else {
            last_was_sep = false;
        }
        out.push(c);
        if out.len() == MAX_NAME_LEN {
            break;
        }
    }
    while out.ends_with(is_separator) {
        out.pop();
    }
    out
}

/// Lowercase, then [`sanitize`]. Spaces are dropped like any other
/// disallowed character.
pub fn sanitize_lower(name: &str) -> String {
    sanitize(&name.to_lowercase())
}

/// Name a deployment would carry if it were created for `model`/`version`.
pub fn deployment_name_for(model: &str, version: &str) -> String {
    format!("{}-{}", sanitize_lower(model), sanitize_lower(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use rstest::rstest;

    static SHAPE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9\-_.]{0,61}[a-zA-Z0-9])?)?$").unwrap());

    #[rstest]
    #[case::plain("mnist", "mnist")]
    #[case::strips_spaces("my model", "mymodel")]
    #[case::keeps_dots("granite-3.1-8b", "granite-3.1-8b")]
    #[case::collapses_runs("a--_.b", "a-b")]
    #[case::trims_ends("--_abc_.", "abc")]
    #[case::drops_symbols("v1 (final)!", "v1final")]
    #[case::empty("", "")]
    #[case::only_separators("-_-", "")]
    #[case::unicode("modèle", "modle")]
    fn sanitizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize(input), expected);
    }

    #[test]
    fn truncates_to_limit_and_trims_after() {
        let long = format!("{}-tail", "a".repeat(62));
        let out = sanitize(&long);
        assert_eq!(out, "a".repeat(62));
        assert!(out.len() <= MAX_NAME_LEN);
    }

    #[test]
    fn idempotent_and_well_shaped() {
        let inputs = [
            "Mnist V1",
            "  leading and trailing  ",
            "__--..",
            "x",
            "UPPER_case.Mixed-123",
            "tarilabs/mnist:v20231206",
            &"ab-".repeat(40),
            "a-.-.-b",
            "日本語",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
            assert!(once.len() <= MAX_NAME_LEN);
            assert!(SHAPE.is_match(&once), "bad shape {once:?} from {input:?}");
        }
    }

    #[test]
    fn kserve_style_names() {
        assert_eq!(deployment_name_for("Mnist", "v1"), "mnist-v1");
        assert_eq!(deployment_name_for("My Model", "v1"), "mymodel-v1");
        assert_eq!(deployment_name_for("My Model", "Version 2"), "mymodel-version2");
        assert_eq!(sanitize_lower("Granite 3.1"), "granite3.1");
    }
}
