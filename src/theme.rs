//! Color palettes read by the renderers at mount or on theme change.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Colors and tint consumed by the fluid field.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Palette {
    pub color1: [f32; 3],
    pub color2: [f32; 3],
    pub color3: [f32; 3],
    /// Blended in while typing is intense.
    pub intense_color: [f32; 3],
    /// Strength of the dark tint laid over the field.
    pub opacity: f32,
}

impl Palette {
    pub fn validate(&self) -> Result<(), &'static str> {
        let channels = self
            .color1
            .iter()
            .chain(&self.color2)
            .chain(&self.color3)
            .chain(&self.intense_color);
        for c in channels {
            if !(0.0..=1.0).contains(c) {
                return Err("color channels must be in [0, 1]");
            }
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err("opacity must be in [0, 1]");
        }
        Ok(())
    }

    /// Parse and validate a palette from JSON.
    #[cfg(feature = "serde")]
    pub fn from_json(source: &str) -> crate::RenderResult<Self> {
        let palette: Palette = serde_json::from_str(source)
            .map_err(|e| crate::RenderError::Config(e.to_string()))?;
        palette
            .validate()
            .map_err(crate::RenderError::InvalidConfig)?;
        Ok(palette)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Theme::PURE_NIGHT.palette
    }
}

/// A named built-in palette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub palette: Palette,
}

impl Theme {
    pub const PURE_NIGHT: Theme = Theme {
        id: "default",
        name: "Pure Night",
        palette: Palette {
            color1: [0.02, 0.02, 0.05],
            color2: [0.05, 0.08, 0.15],
            color3: [0.1, 0.1, 0.2],
            intense_color: [0.3, 0.05, 0.05],
            opacity: 0.3,
        },
    };

    pub const DEEP_SPACE: Theme = Theme {
        id: "deep-space",
        name: "Deep Space",
        palette: Palette {
            color1: [0.05, 0.05, 0.08],
            color2: [0.08, 0.08, 0.12],
            color3: [0.12, 0.12, 0.18],
            intense_color: [0.2, 0.05, 0.3],
            opacity: 0.5,
        },
    };

    pub const NEBULA: Theme = Theme {
        id: "nebula",
        name: "Nebula",
        palette: Palette {
            color1: [0.02, 0.05, 0.1],
            color2: [0.05, 0.1, 0.2],
            color3: [0.1, 0.2, 0.3],
            intense_color: [0.1, 0.3, 0.5],
            opacity: 0.4,
        },
    };

    pub const ALL: [Theme; 3] = [Theme::PURE_NIGHT, Theme::DEEP_SPACE, Theme::NEBULA];

    pub fn by_id(id: &str) -> Option<Theme> {
        Self::ALL.into_iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_themes_are_valid() {
        for theme in Theme::ALL {
            assert!(theme.palette.validate().is_ok(), "{}", theme.id);
        }
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(Theme::by_id("nebula").map(|t| t.name), Some("Nebula"));
        assert_eq!(Theme::by_id("default"), Some(Theme::PURE_NIGHT));
        assert!(Theme::by_id("solarized").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_palette_from_json() {
        let json = r#"{
            "color1": [0.0, 0.0, 0.1],
            "color2": [0.1, 0.1, 0.2],
            "color3": [0.2, 0.2, 0.3],
            "intenseColor": [0.9, 0.1, 0.1],
            "opacity": 0.25
        }"#;
        let palette = Palette::from_json(json).unwrap();
        assert_eq!(palette.intense_color, [0.9, 0.1, 0.1]);

        let out_of_range = json.replace("0.9, 0.1, 0.1", "1.5, 0.1, 0.1");
        assert!(matches!(
            Palette::from_json(&out_of_range),
            Err(crate::RenderError::InvalidConfig(_))
        ));
        assert!(matches!(
            Palette::from_json("{}"),
            Err(crate::RenderError::Config(_))
        ));
    }
}
