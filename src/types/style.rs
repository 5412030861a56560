use serde::{Deserialize, Serialize};

/// One surveyed element, as sent to the analysis gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRecord {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub class_name: String,
    pub rect: Rect,
    pub typography: Typography,
    pub spacing: Spacing,
    pub layout: Layout,
    pub visuals: Visuals,
}

/// Bounding box rounded to whole pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub top: i64,
    pub left: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Typography {
    pub font_size: String,
    pub font_weight: String,
    pub font_family: String,
    pub line_height: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub margin: String,
    pub padding: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub display: String,
    pub position: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visuals {
    pub background_color: String,
    pub border_radius: String,
}
