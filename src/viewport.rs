use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest edge Playwright is asked to render; bigger values are almost
/// always a typo and make screenshots blow through the payload budget.
pub const MAX_DIMENSION: u32 = 10_000;

/// Browser window size used when capturing a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
        }
    }
}

impl Viewport {
    /// Dimensions of a screenshot of this viewport after scaling by `factor`.
    pub fn scaled(self, factor: f32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * factor).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewportParseError {
    #[error("Invalid viewport '{0}': expected WIDTHxHEIGHT (e.g., 1440x900)")]
    InvalidFormat(String),
    #[error("Invalid viewport width: {0}")]
    InvalidWidth(String),
    #[error("Invalid viewport height: {0}")]
    InvalidHeight(String),
    #[error("Viewport dimensions must be between 1 and {MAX_DIMENSION}, got {0}x{1}")]
    OutOfRange(u32, u32),
}

impl FromStr for Viewport {
    type Err = ViewportParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let Some((w, h)) = lowered.split_once('x') else {
            return Err(ViewportParseError::InvalidFormat(s.to_string()));
        };
        if h.contains('x') {
            return Err(ViewportParseError::InvalidFormat(s.to_string()));
        }

        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidWidth(w.trim().to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ViewportParseError::InvalidHeight(h.trim().to_string()))?;

        Viewport::new(width, height)
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, ViewportParseError> {
        let valid = |v: u32| (1..=MAX_DIMENSION).contains(&v);
        if !valid(width) || !valid(height) {
            return Err(ViewportParseError::OutOfRange(width, height));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Config files may write `viewport = "1280x800"` or a `[viewport]` table.
impl<'de> Deserialize<'de> for Viewport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Table { width: u32, height: u32 },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Table { width, height } => {
                Viewport::new(width, height).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_by_height() {
        let vp: Viewport = "1440x900".parse().unwrap();
        assert_eq!(vp, Viewport::default());
        let vp: Viewport = " 1920 X 1080 ".parse().unwrap();
        assert_eq!((vp.width, vp.height), (1920, 1080));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            "1440".parse::<Viewport>(),
            Err(ViewportParseError::InvalidFormat(_))
        ));
        assert!("1440x900x600".parse::<Viewport>().is_err());
        assert!(matches!(
            "abcx900".parse::<Viewport>(),
            Err(ViewportParseError::InvalidWidth(_))
        ));
        assert!("1440x".parse::<Viewport>().is_err());
    }

    #[test]
    fn rejects_zero_and_huge_dimensions() {
        assert_eq!(
            "0x900".parse::<Viewport>(),
            Err(ViewportParseError::OutOfRange(0, 900))
        );
        assert!("1440x20000".parse::<Viewport>().is_err());
    }

    #[test]
    fn deserializes_from_string_or_table() {
        #[derive(Deserialize)]
        struct Holder {
            viewport: Viewport,
        }
        let text: Holder = toml::from_str("viewport = \"1280x800\"").unwrap();
        assert_eq!(text.viewport.width, 1280);
        let table: Holder = toml::from_str("[viewport]\nwidth = 375\nheight = 667\n").unwrap();
        assert_eq!(table.viewport.height, 667);
        assert!(toml::from_str::<Holder>("viewport = \"0x0\"").is_err());
    }

    #[test]
    fn scaled_screenshot_size() {
        assert_eq!(Viewport::default().scaled(0.5), (720, 450));
        assert_eq!(Viewport { width: 1, height: 1 }.scaled(0.1), (1, 1));
        assert_eq!(format!("{}", Viewport::default()), "1440x900");
    }
}
