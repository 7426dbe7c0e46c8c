// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Helpers for inline `style` attributes.

/// Parses `a: b; c: d` into lower-cased property names and trimmed values,
/// keeping declaration order. Malformed declarations are skipped.
pub(crate) fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name, value.to_owned()))
            }
        })
        .collect()
}

pub(crate) fn format_style(props: &[(String, String)]) -> String {
    props
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn style_value<'a>(
    props: &'a [(String, String)],
    name: &str,
) -> Option<&'a str> {
    props
        .iter()
        .rev()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// Sets or replaces a property, keeping its original position.
pub(crate) fn set_style_value(
    props: &mut Vec<(String, String)>,
    name: &str,
    value: &str,
) {
    match props.iter_mut().find(|(n, _)| n == name) {
        Some(existing) => existing.1 = value.to_owned(),
        None => props.push((name.to_owned(), value.to_owned())),
    }
}

/// Reads a pixel length such as `320`, `320px` or `320.5px`.
pub(crate) fn parse_px(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n.round() as u32)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_format_round_trip() {
        let props = parse_style("Color: red;font-size:12px ; ;bogus");
        assert_eq!(
            props,
            vec![
                ("color".to_owned(), "red".to_owned()),
                ("font-size".to_owned(), "12px".to_owned())
            ]
        );
        assert_eq!(format_style(&props), "color: red; font-size: 12px;");
    }

    #[test]
    fn last_declaration_wins() {
        let props = parse_style("color: red; color: blue");
        assert_eq!(style_value(&props, "color"), Some("blue"));
    }

    #[test]
    fn pixel_lengths() {
        assert_eq!(parse_px("320px"), Some(320));
        assert_eq!(parse_px("240"), Some(240));
        assert_eq!(parse_px("auto"), None);
        assert_eq!(parse_px("0px"), None);
    }
}
