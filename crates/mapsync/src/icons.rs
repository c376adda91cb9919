//! Marker icon descriptors derived from place attributes.
//!
//! Everything here is pure: same inputs, same descriptor.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIcon {
    pub path: String,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_weight: f64,
    pub scale: f64,
    pub anchor_offset: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterIcon {
    pub uri: String,
    pub size_hint: Size,
    pub anchor_offset: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IconDescriptor {
    Vector(VectorIcon),
    Raster(RasterIcon),
}

impl IconDescriptor {
    /// Fill colour for vector icons; `None` for raster icons.
    pub fn fill_color(&self) -> Option<&str> {
        match self {
            IconDescriptor::Vector(v) => Some(&v.fill_color),
            IconDescriptor::Raster(_) => None,
        }
    }
}

pub const PIN_PATH: &str = "M12 2C8.13 2 5 5.13 5 9c0 5.25 7 13 7 13s7-7.75 7-13c0-3.87-3.13-7-7-7z";
pub const HOTEL_PATH: &str = "M4 21V8l8-5 8 5v13h-6v-6h-4v6H4z";

pub const HOTEL_COLOR: &str = "#1E3A8A";
pub const RECOMMENDED_COLOR: &str = "#FFD700";
pub const PENDING_COLOR: &str = "#9CA3AF";
pub const DEFAULT_APPROVED_COLOR: &str = "#0EA5E9";

/// Place categories with a dedicated marker colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceCategory {
    Restaurant,
    Bar,
    Cafe,
    Attraction,
    Shopping,
    Wellness,
    Transport,
    Other(String),
}

impl PlaceCategory {
    /// Case-insensitive; anything unrecognised lands in `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "restaurant" => PlaceCategory::Restaurant,
            "bar" => PlaceCategory::Bar,
            "cafe" => PlaceCategory::Cafe,
            "attraction" => PlaceCategory::Attraction,
            "shopping" => PlaceCategory::Shopping,
            "wellness" => PlaceCategory::Wellness,
            "transport" => PlaceCategory::Transport,
            other => PlaceCategory::Other(other.to_string()),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            PlaceCategory::Restaurant => "#EF4444",
            PlaceCategory::Bar => "#8B5CF6",
            PlaceCategory::Cafe => "#B45309",
            PlaceCategory::Attraction => "#3B82F6",
            PlaceCategory::Shopping => "#EC4899",
            PlaceCategory::Wellness => "#10B981",
            PlaceCategory::Transport => "#6366F1",
            PlaceCategory::Other(_) => DEFAULT_APPROVED_COLOR,
        }
    }
}

fn pin(fill_color: &str, scale: f64) -> IconDescriptor {
    IconDescriptor::Vector(VectorIcon {
        path: PIN_PATH.to_string(),
        fill_color: fill_color.to_string(),
        fill_opacity: 1.0,
        stroke_color: "#FFFFFF".to_string(),
        stroke_weight: 2.0,
        scale,
        anchor_offset: Point::new(12.0, 22.0),
    })
}

/// The hotel's own marker.
pub fn hotel_icon() -> IconDescriptor {
    IconDescriptor::Vector(VectorIcon {
        path: HOTEL_PATH.to_string(),
        fill_color: HOTEL_COLOR.to_string(),
        fill_opacity: 1.0,
        stroke_color: "#FFFFFF".to_string(),
        stroke_weight: 2.0,
        scale: 2.0,
        anchor_offset: Point::new(12.0, 21.0),
    })
}

/// Marker for a nearby place.
///
/// Colour priority: recommended, then the approved category colour, then
/// the muted pending colour. A recommended place is gold even when it has
/// not been approved yet.
pub fn place_icon(category: &str, is_approved: bool, is_recommended: bool) -> IconDescriptor {
    let color = if is_recommended {
        RECOMMENDED_COLOR
    } else if is_approved {
        PlaceCategory::parse(category).color()
    } else {
        PENDING_COLOR
    };
    pin(color, 1.5)
}

/// Round badge showing `number`, for ordered itineraries.
pub fn numbered_icon(number: u32, color: &str) -> IconDescriptor {
    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='32' height='32' viewBox='0 0 32 32'>\
         <circle cx='16' cy='16' r='14' fill='{color}' stroke='#FFFFFF' stroke-width='2'/>\
         <text x='16' y='21' font-family='Arial, sans-serif' font-size='14' font-weight='bold' \
         fill='#FFFFFF' text-anchor='middle'>{number}</text></svg>"
    );
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    IconDescriptor::Raster(RasterIcon {
        uri: format!("data:image/svg+xml;base64,{encoded}"),
        size_hint: Size {
            width: 32.0,
            height: 32.0,
        },
        anchor_offset: Point::new(16.0, 16.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recommended_beats_everything() {
        for category in ["wellness", "bar", "unknown-category"] {
            for approved in [false, true] {
                assert_eq!(
                    place_icon(category, approved, true).fill_color(),
                    Some(RECOMMENDED_COLOR)
                );
            }
        }
    }

    #[test]
    fn approved_uses_category_color() {
        assert_eq!(place_icon("wellness", true, false).fill_color(), Some("#10B981"));
        assert_eq!(place_icon("Restaurant ", true, false).fill_color(), Some("#EF4444"));
    }

    #[test]
    fn unknown_category_falls_back() {
        assert_eq!(
            place_icon("unknown-category", true, false).fill_color(),
            Some(DEFAULT_APPROVED_COLOR)
        );
    }

    #[test]
    fn pending_is_muted_regardless_of_category() {
        for category in ["wellness", "restaurant", "unknown-category"] {
            assert_eq!(
                place_icon(category, false, false).fill_color(),
                Some(PENDING_COLOR)
            );
        }
    }

    #[test]
    fn hotel_icon_is_distinct_from_place_pins() {
        let IconDescriptor::Vector(hotel) = hotel_icon() else {
            panic!("hotel icon should be a vector icon");
        };
        assert_ne!(hotel.path, PIN_PATH);
        assert_eq!(hotel.fill_color, HOTEL_COLOR);
        assert_eq!(hotel_icon(), hotel_icon());
    }

    #[test]
    fn numbered_icon_embeds_number_and_color() {
        let IconDescriptor::Raster(icon) = numbered_icon(7, "#123456") else {
            panic!("numbered icon should be raster");
        };
        let payload = icon
            .uri
            .strip_prefix("data:image/svg+xml;base64,")
            .unwrap();
        let svg = String::from_utf8(
            base64::engine::general_purpose::STANDARD
                .decode(payload)
                .unwrap(),
        )
        .unwrap();
        assert!(svg.contains(">7</text>"));
        assert!(svg.contains("fill='#123456'"));
        assert_eq!(icon.size_hint.width, 32.0);
    }

    #[test]
    fn category_parse_keeps_unknown_text() {
        assert_eq!(PlaceCategory::parse("SPA"), PlaceCategory::Other("spa".into()));
        assert_eq!(PlaceCategory::parse("Cafe"), PlaceCategory::Cafe);
    }
}
