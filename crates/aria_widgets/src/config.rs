//! Configuration types shared by several widgets
//!
//! Widget configurations are plain structs with builder methods. They also
//! deserialize with serde (durations in milliseconds) and can be filled
//! from host attribute strings through the `parse_*` helpers here, which is
//! the only place attribute text is interpreted.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WidgetError};

/// Axis of a slider, list box or carousel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

impl FromStr for Orientation {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Orientation::Horizontal),
            "vertical" => Ok(Orientation::Vertical),
            _ => Err(()),
        }
    }
}

/// Combo box autocomplete mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Autocomplete {
    #[default]
    None,
    Inline,
    List,
    Both,
}

impl Autocomplete {
    pub fn as_str(&self) -> &'static str {
        match self {
            Autocomplete::None => "none",
            Autocomplete::Inline => "inline",
            Autocomplete::List => "list",
            Autocomplete::Both => "both",
        }
    }

    /// Options are filtered by the typed text
    pub fn filters(&self) -> bool {
        matches!(self, Autocomplete::List | Autocomplete::Both)
    }

    /// The first match is completed inline in the input
    pub fn completes_inline(&self) -> bool {
        matches!(self, Autocomplete::Inline | Autocomplete::Both)
    }
}

impl FromStr for Autocomplete {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(Autocomplete::None),
            "inline" => Ok(Autocomplete::Inline),
            "list" => Ok(Autocomplete::List),
            "both" => Ok(Autocomplete::Both),
            _ => Err(()),
        }
    }
}

/// Scroll animation behavior
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    /// Instant scroll (no animation)
    #[default]
    Auto,
    /// Smooth animated scroll
    Smooth,
}

/// Alignment along the scroll axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    Start,
    Center,
    End,
    /// Scroll the minimum distance to make the target visible
    #[default]
    Nearest,
}

/// Options forwarded with scroll-into-view requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollAlign,
    pub inline: ScrollAlign,
}

/// Serde adapter storing a `Duration` as integer milliseconds
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(value.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

fn invalid(name: &str, value: &str) -> WidgetError {
    WidgetError::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Boolean attribute: present means true unless the value is `"false"`
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

pub fn parse_number(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(name, value))
}

/// Milliseconds as an integer
pub fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| invalid(name, value))
}

/// Any `FromStr` enum with a unit error
pub fn parse_enum<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| invalid(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag(None));
        assert!(parse_flag(Some("")));
        assert!(parse_flag(Some("true")));
        assert!(!parse_flag(Some("FALSE")));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_number("min", " 2.5 ").unwrap(), 2.5);
        assert!(parse_number("min", "abc").is_err());
        assert!(parse_number("min", "NaN").is_err());
        assert_eq!(
            parse_duration("collapse-debounce-time", "150").unwrap(),
            Duration::from_millis(150)
        );
        assert_eq!(
            parse_enum::<Autocomplete>("autocomplete", "Both").unwrap(),
            Autocomplete::Both
        );
        assert!(matches!(
            parse_enum::<Orientation>("orientation", "diagonal"),
            Err(WidgetError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_serde_names() {
        let options: ScrollOptions =
            serde_json::from_str(r#"{"behavior":"smooth","block":"center"}"#).unwrap();
        assert_eq!(options.behavior, ScrollBehavior::Smooth);
        assert_eq!(options.block, ScrollAlign::Center);
        assert_eq!(options.inline, ScrollAlign::Nearest);
    }
}
