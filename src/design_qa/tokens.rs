//! Design token table and the spacing / colour / typography checks made
//! against it.

use std::collections::BTreeMap;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use super::{QaIssue, QaIssueType, Severity};
use crate::types::ComputedStyle;

/// Largest pixel distance at which a spacing token is suggested.
pub const SPACING_TOLERANCE_PX: i64 = 4;
/// RGB distance under which two colours count as the same token.
pub const COLOR_MATCH_DISTANCE: f32 = 10.0;
/// RGB distance under which a colour token is suggested.
pub const COLOR_SUGGEST_DISTANCE: f32 = 50.0;

const TRANSPARENT: &str = "rgba(0, 0, 0, 0)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyToken {
    pub font_size: String,
    pub line_height: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub spacing: BTreeMap<String, String>,
    pub colors: BTreeMap<String, String>,
    pub typography: BTreeMap<String, TypographyToken>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        let spacing = [4, 8, 12, 16, 20, 24, 32, 40, 48, 64]
            .iter()
            .map(|px| (px.to_string(), format!("{px}px")))
            .collect();

        let colors = [
            ("primary-50", "#eff6ff"),
            ("primary-500", "#3b82f6"),
            ("primary-900", "#1e3a8a"),
            ("gray-50", "#f9fafb"),
            ("gray-500", "#6b7280"),
            ("gray-900", "#111827"),
            ("red-500", "#ef4444"),
            ("green-500", "#10b981"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let typography = [
            ("text-xs", "12px", "16px"),
            ("text-sm", "14px", "20px"),
            ("text-base", "16px", "24px"),
            ("text-lg", "18px", "28px"),
        ]
        .iter()
        .map(|(k, size, line)| {
            (
                k.to_string(),
                TypographyToken {
                    font_size: size.to_string(),
                    line_height: line.to_string(),
                },
            )
        })
        .collect();

        Self {
            spacing,
            colors,
            typography,
        }
    }
}

/// Parses `rgb(r, g, b)`, opaque `rgba(r, g, b, 1)` and hex colours.
/// Translucent colours are not comparable against the token table and yield
/// `None`.
pub fn parse_color(value: &str) -> Option<Srgb<u8>> {
    let value = value.trim();
    if value.starts_with('#') {
        return value.parse::<Srgb<u8>>().ok();
    }

    let (inner, has_alpha) = if let Some(rest) = value.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = value.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    match (parts.as_slice(), has_alpha) {
        ([r, g, b], false) => Some(Srgb::new(r.parse().ok()?, g.parse().ok()?, b.parse().ok()?)),
        ([r, g, b, a], true) => {
            let alpha: f32 = a.parse().ok()?;
            if alpha < 1.0 {
                return None;
            }
            Some(Srgb::new(r.parse().ok()?, g.parse().ok()?, b.parse().ok()?))
        }
        _ => None,
    }
}

pub fn color_distance(a: Srgb<u8>, b: Srgb<u8>) -> f32 {
    let dr = a.red as f32 - b.red as f32;
    let dg = a.green as f32 - b.green as f32;
    let db = a.blue as f32 - b.blue as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Leading integer of a CSS length (`"10.5px"` → 10).
fn leading_px(value: &str) -> Option<i64> {
    let end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && *c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Expands a 1 to 4 value box shorthand into top, right, bottom, left.
pub fn expand_box(shorthand: &str) -> Option<[String; 4]> {
    let parts: Vec<&str> = shorthand.split_whitespace().collect();
    let [top, right, bottom, left] = match parts.as_slice() {
        [a] => [*a, *a, *a, *a],
        [a, b] => [*a, *b, *a, *b],
        [a, b, c] => [*a, *b, *c, *b],
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => return None,
    };
    Some([
        top.to_string(),
        right.to_string(),
        bottom.to_string(),
        left.to_string(),
    ])
}

pub struct TokenAnalyzer<'a> {
    config: &'a TokenConfig,
    spacing_by_px: Vec<(i64, &'a str)>,
}

impl<'a> TokenAnalyzer<'a> {
    pub fn new(config: &'a TokenConfig) -> Self {
        let mut spacing_by_px: Vec<(i64, &str)> = config
            .spacing
            .values()
            .filter_map(|v| leading_px(v).map(|px| (px, v.as_str())))
            .collect();
        spacing_by_px.sort_by_key(|(px, _)| *px);
        Self {
            config,
            spacing_by_px,
        }
    }

    pub fn analyze(&self, style: &ComputedStyle, selector: &str) -> Vec<QaIssue> {
        let mut issues = self.spacing_issues(style, selector);
        issues.extend(self.color_issues(style, selector));
        issues.extend(self.typography_issue(style, selector));
        issues
    }

    fn spacing_issues(&self, style: &ComputedStyle, selector: &str) -> Vec<QaIssue> {
        let mut issues = Vec::new();
        for (name, shorthand) in [("margin", &style.margin), ("padding", &style.padding)] {
            let Some(sides) = shorthand.as_deref().and_then(expand_box) else {
                continue;
            };
            for (side, value) in ["top", "right", "bottom", "left"].iter().zip(sides) {
                if value == "0px" || self.is_spacing_token(&value) {
                    continue;
                }
                if let Some(suggested) = self.closest_spacing(&value) {
                    issues.push(QaIssue {
                        property: Some(format!("{name}-{side}")),
                        actual: Some(value.clone()),
                        suggested: Some(suggested.to_string()),
                        message: format!("Non-standard spacing value: {value}"),
                        fix: format!("Use design token: {suggested}"),
                        ..QaIssue::new(QaIssueType::Token, "spacing", Severity::Medium, selector)
                    });
                }
            }
        }
        issues
    }

    fn color_issues(&self, style: &ComputedStyle, selector: &str) -> Vec<QaIssue> {
        let mut issues = Vec::new();
        for (property, value) in [
            ("color", &style.color),
            ("background-color", &style.background_color),
            ("border-color", &style.border_color),
        ] {
            let Some(value) = value.as_deref() else {
                continue;
            };
            if value == TRANSPARENT || self.is_color_token(value) {
                continue;
            }
            if let Some(suggested) = self.closest_color(value) {
                issues.push(QaIssue {
                    property: Some(property.to_string()),
                    actual: Some(value.to_string()),
                    suggested: Some(suggested.to_string()),
                    message: format!("Non-standard color value: {value}"),
                    fix: format!("Use design token: {suggested}"),
                    ..QaIssue::new(QaIssueType::Token, "color", Severity::Medium, selector)
                });
            }
        }
        issues
    }

    fn typography_issue(&self, style: &ComputedStyle, selector: &str) -> Option<QaIssue> {
        let font_size = style.font_size.as_deref()?;
        let line_height = style.line_height.as_deref().unwrap_or("normal");
        let on_scale = self
            .config
            .typography
            .values()
            .any(|t| t.font_size == font_size && t.line_height == line_height);
        if on_scale {
            return None;
        }

        let (name, token) = self
            .config
            .typography
            .iter()
            .find(|(_, t)| t.font_size == font_size)?;
        let suggested = format!("{} ({}/{})", name, token.font_size, token.line_height);
        Some(QaIssue {
            property: Some("font-size".to_string()),
            actual: Some(format!("{font_size} / {line_height}")),
            fix: format!("Use design token: {suggested}"),
            suggested: Some(suggested),
            message: "Non-standard typography values".to_string(),
            ..QaIssue::new(QaIssueType::Token, "typography", Severity::Low, selector)
        })
    }

    fn is_spacing_token(&self, value: &str) -> bool {
        self.config.spacing.values().any(|v| v == value)
    }

    /// Nearest spacing token within tolerance; ties go to the smaller token.
    fn closest_spacing(&self, value: &str) -> Option<&'a str> {
        let px = leading_px(value)?;
        let mut best: Option<(i64, &str)> = None;
        for &(token_px, token) in &self.spacing_by_px {
            let diff = (px - token_px).abs();
            if diff <= SPACING_TOLERANCE_PX && best.map_or(true, |(d, _)| diff < d) {
                best = Some((diff, token));
            }
        }
        best.map(|(_, token)| token)
    }

    fn is_color_token(&self, value: &str) -> bool {
        let Some(rgb) = parse_color(value) else {
            return false;
        };
        self.config
            .colors
            .values()
            .filter_map(|c| parse_color(c))
            .any(|token| color_distance(rgb, token) < COLOR_MATCH_DISTANCE)
    }

    fn closest_color(&self, value: &str) -> Option<&'a str> {
        let rgb = parse_color(value)?;
        let mut best: Option<(f32, &str)> = None;
        for token in self.config.colors.values() {
            let Some(token_rgb) = parse_color(token) else {
                continue;
            };
            let distance = color_distance(rgb, token_rgb);
            if distance < COLOR_SUGGEST_DISTANCE && best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, token.as_str()));
            }
        }
        best.map(|(_, token)| token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> ComputedStyle {
        ComputedStyle::default()
    }

    #[test]
    fn parses_rgb_rgba_and_hex() {
        assert_eq!(parse_color("rgb(59, 130, 246)"), Some(Srgb::new(59, 130, 246)));
        assert_eq!(parse_color("#3b82f6"), Some(Srgb::new(59, 130, 246)));
        assert_eq!(parse_color("rgba(1, 2, 3, 1)"), Some(Srgb::new(1, 2, 3)));
        assert_eq!(parse_color("rgba(1, 2, 3, 0.5)"), None);
        assert_eq!(parse_color("currentcolor"), None);
    }

    #[test]
    fn expands_box_shorthand() {
        assert_eq!(
            expand_box("8px 16px").unwrap(),
            ["8px", "16px", "8px", "16px"].map(String::from)
        );
        assert_eq!(
            expand_box("1px 2px 3px").unwrap(),
            ["1px", "2px", "3px", "2px"].map(String::from)
        );
        assert!(expand_box("").is_none());
    }

    #[test]
    fn off_scale_spacing_suggests_nearest_token() {
        let config = TokenConfig::default();
        let analyzer = TokenAnalyzer::new(&config);
        let s = ComputedStyle {
            padding: Some("10px 16px 15px 100px".into()),
            ..style()
        };
        let issues = analyzer.analyze(&s, "div");
        let spacing: Vec<_> = issues.iter().filter(|i| i.subtype == "spacing").collect();
        // 10px ties between 8px and 12px; 15px -> 16px; 100px has no token in range.
        assert_eq!(spacing.len(), 2);
        assert_eq!(spacing[0].property.as_deref(), Some("padding-top"));
        assert_eq!(spacing[0].suggested.as_deref(), Some("8px"));
        assert_eq!(spacing[1].property.as_deref(), Some("padding-bottom"));
        assert_eq!(spacing[1].suggested.as_deref(), Some("16px"));
        assert_eq!(spacing[1].fix, "Use design token: 16px");
    }

    #[test]
    fn near_token_colors_pass_and_nearby_ones_get_suggestions() {
        let config = TokenConfig::default();
        let analyzer = TokenAnalyzer::new(&config);
        let s = ComputedStyle {
            color: Some("rgb(17, 24, 40)".into()),
            background_color: Some("rgb(70, 140, 240)".into()),
            border_color: Some("rgb(200, 100, 0)".into()),
            ..style()
        };
        let issues = analyzer.analyze(&s, "p");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].property.as_deref(), Some("background-color"));
        assert_eq!(issues[0].suggested.as_deref(), Some("#3b82f6"));
        assert_eq!(issues[0].severity, Severity::Medium);
    }

    #[test]
    fn typography_mismatch_is_low_severity() {
        let config = TokenConfig::default();
        let analyzer = TokenAnalyzer::new(&config);
        let on_scale = ComputedStyle {
            font_size: Some("16px".into()),
            line_height: Some("24px".into()),
            ..style()
        };
        assert!(analyzer.analyze(&on_scale, "p").is_empty());

        let off = ComputedStyle {
            font_size: Some("16px".into()),
            line_height: Some("normal".into()),
            ..style()
        };
        let issues = analyzer.analyze(&off, "p");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Low);
        assert_eq!(issues[0].actual.as_deref(), Some("16px / normal"));
        assert_eq!(issues[0].suggested.as_deref(), Some("text-base (16px/24px)"));

        let unknown = ComputedStyle {
            font_size: Some("15px".into()),
            ..style()
        };
        assert!(analyzer.analyze(&unknown, "p").is_empty());
    }
}
