use serde::{Deserialize, Serialize};

use crate::naming;

/// Rectangle in virtual-desktop coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && (x as i64) < self.x as i64 + self.width as i64
            && (y as i64) < self.y as i64 + self.height as i64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchSupport {
    Available,
    Unavailable,
    #[default]
    Unknown,
}

/// What a backend reports for one display, before naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDisplay {
    pub id: u32,
    pub label: String,
    pub bounds: Bounds,
    /// Bounds minus panels and docks; defaults to `bounds`
    #[serde(default)]
    pub work_area: Option<Bounds>,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Clockwise degrees: 0, 90, 180 or 270
    #[serde(default)]
    pub rotation: u16,
    #[serde(default)]
    pub touch_support: TouchSupport,
    #[serde(default)]
    pub is_primary: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl RawDisplay {
    pub fn new(id: u32, label: impl Into<String>, bounds: Bounds, is_primary: bool) -> Self {
        Self {
            id,
            label: label.into(),
            bounds,
            work_area: None,
            scale_factor: 1.0,
            rotation: 0,
            touch_support: TouchSupport::Unknown,
            is_primary,
        }
    }
}

/// Metadata describing one physical display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDescriptor {
    pub id: u32,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub friendly_name: String,
    pub bounds: Bounds,
    pub work_area: Bounds,
    pub scale_factor: f64,
    pub rotation: u16,
    pub touch_support: TouchSupport,
    pub is_primary: bool,
}

impl DisplayDescriptor {
    pub fn from_raw(raw: RawDisplay) -> Self {
        let name = naming::parse_label(&raw.label);
        let friendly_name = naming::friendly_name(&name, &raw.bounds, raw.is_primary);

        Self {
            id: raw.id,
            manufacturer: name.manufacturer,
            model: name.model,
            friendly_name,
            work_area: raw.work_area.unwrap_or(raw.bounds),
            label: raw.label,
            bounds: raw.bounds,
            scale_factor: raw.scale_factor,
            rotation: raw.rotation,
            touch_support: raw.touch_support,
            is_primary: raw.is_primary,
        }
    }

    /// Whether anything the output window depends on differs.
    pub fn metrics_differ(&self, other: &DisplayDescriptor) -> bool {
        self.bounds != other.bounds
            || self.work_area != other.work_area
            || self.rotation != other.rotation
            || (self.scale_factor - other.scale_factor).abs() > f64::EPSILON
            || self.is_primary != other.is_primary
    }
}
