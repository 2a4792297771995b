use serde::Deserialize;

// ---------------------------------------------------------------------------
// StationConfig — tunables for geometry and drop behavior
// ---------------------------------------------------------------------------

/// Which point of the dragged preview rectangle is hit-tested against the
/// tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePoint {
    Center,
    TopLeft,
}

#[derive(Clone, Debug)]
pub struct StationConfig {
    /// Fixed width of the gap between the two children of a split, in
    /// pixels. Subtracted from the split dimension before the ratio
    /// applies.
    pub divider_width: u16,
    /// Fraction of a leaf's width/height forming the CENTER drop zone.
    pub center_fraction: f64,
    pub reference_point: ReferencePoint,
    /// Leave a placeholder behind when an item is removed, so a later
    /// re-insertion can find its way back.
    pub retain_placeholders: bool,
    /// Working-area tag of this station, matched against items' tags by
    /// `WorkingAreaAcceptance`.
    pub working_area: Option<String>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            divider_width: 2,
            center_fraction: 0.5,
            reference_point: ReferencePoint::Center,
            retain_placeholders: true,
            working_area: None,
        }
    }
}

impl StationConfig {
    /// Load from the user config file, falling back to defaults for
    /// anything absent or unparseable.
    pub fn load() -> Self {
        let path = dirs::config_dir()
            .map(|d| d.join("dockline").join("config.toml"))
            .unwrap_or_default();

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };

        match Self::from_toml_str(&content) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("invalid config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse a partial TOML document, overlaying present keys on defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(content)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let mut config = Self::default();
        if let Some(v) = raw.divider_width {
            config.divider_width = v;
        }
        if let Some(v) = raw.center_fraction {
            // Out-of-range values would erase the edge bands entirely.
            config.center_fraction = v.clamp(0.1, 0.9);
        }
        if let Some(v) = raw.reference_point {
            config.reference_point = v;
        }
        if let Some(v) = raw.retain_placeholders {
            config.retain_placeholders = v;
        }
        if let Some(v) = raw.working_area {
            config.working_area = Some(v);
        }
        config
    }
}

// ---------------------------------------------------------------------------
// RawConfig — everything optional, straight from TOML
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
struct RawConfig {
    divider_width: Option<u16>,
    center_fraction: Option<f64>,
    reference_point: Option<ReferencePoint>,
    retain_placeholders: Option<bool>,
    working_area: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_partial_toml() {
        let toml_str = r#"
            divider_width = 4
            reference_point = "top-left"
        "#;
        let config = StationConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.divider_width, 4);
        assert_eq!(config.reference_point, ReferencePoint::TopLeft);
        // Untouched keys keep defaults.
        assert!(config.retain_placeholders);
        assert!((config.center_fraction - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_center_fraction_clamped() {
        let config = StationConfig::from_toml_str("center_fraction = 1.5").unwrap();
        assert!((config.center_fraction - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(StationConfig::from_toml_str("divider_width = \"wide\"").is_err());
    }
}
