use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    #[default]
    Fade,
    Slide,
    Zoom,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Direction the incoming content travels in a slide transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideDirection {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

impl SlideDirection {
    /// Unit vector the incoming layer enters from, in screen space (y down).
    pub fn entry_vector(&self) -> (f32, f32) {
        match self {
            SlideDirection::Left => (1.0, 0.0),
            SlideDirection::Right => (-1.0, 0.0),
            SlideDirection::Up => (0.0, 1.0),
            SlideDirection::Down => (0.0, -1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSpec {
    #[serde(rename = "type")]
    pub kind: TransitionKind,
    pub duration_ms: u64,
    #[serde(default)]
    pub easing: Easing,
    /// Only meaningful for slide transitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SlideDirection>,
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self::fade(500)
    }
}

impl TransitionSpec {
    pub fn none() -> Self {
        Self {
            kind: TransitionKind::None,
            duration_ms: 0,
            easing: Easing::Linear,
            direction: None,
        }
    }

    pub fn fade(duration_ms: u64) -> Self {
        Self {
            kind: TransitionKind::Fade,
            duration_ms,
            easing: Easing::EaseInOut,
            direction: None,
        }
    }

    pub fn slide(direction: SlideDirection, duration_ms: u64) -> Self {
        Self {
            kind: TransitionKind::Slide,
            duration_ms,
            easing: Easing::EaseOut,
            direction: Some(direction),
        }
    }

    pub fn zoom(duration_ms: u64) -> Self {
        Self {
            kind: TransitionKind::Zoom,
            duration_ms,
            easing: Easing::EaseInOut,
            direction: None,
        }
    }

    /// Whether the swap happens without intermediate frames.
    pub fn is_instant(&self) -> bool {
        self.kind == TransitionKind::None || self.duration_ms == 0
    }

    pub fn direction(&self) -> SlideDirection {
        self.direction.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6);
            assert_eq!(easing.apply(-3.0), 0.0);
        }
    }

    #[test]
    fn test_ease_in_out_is_monotonic() {
        let mut last = 0.0;
        for step in 0..=100 {
            let value = Easing::EaseInOut.apply(step as f32 / 100.0);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn test_wire_shape() {
        let spec = TransitionSpec::slide(SlideDirection::Up, 400);
        let value = serde_json::to_value(spec).unwrap();
        assert_eq!(value["type"], "slide");
        assert_eq!(value["durationMs"], 400);
        assert_eq!(value["easing"], "ease-out");
        assert_eq!(value["direction"], "up");

        let parsed: TransitionSpec =
            serde_json::from_str(r#"{"type":"zoom","durationMs":250}"#).unwrap();
        assert_eq!(parsed.easing, Easing::EaseInOut);
        assert_eq!(parsed.direction, None);
    }

    #[test]
    fn test_instant() {
        assert!(TransitionSpec::none().is_instant());
        assert!(TransitionSpec::fade(0).is_instant());
        assert!(!TransitionSpec::default().is_instant());
    }
}
