//! X11 display enumeration via `xrandr --query`

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::process::Command;

use tracing::debug;

use crate::backend::DisplayBackend;
use crate::descriptor::{Bounds, RawDisplay};
use crate::error::{Result, TopologyError};

pub struct XrandrBackend {
    command: String,
}

impl XrandrBackend {
    pub fn new() -> Self {
        Self {
            command: "xrandr".to_string(),
        }
    }
}

impl Default for XrandrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for XrandrBackend {
    fn enumerate(&self) -> Result<Vec<RawDisplay>> {
        let output = Command::new(&self.command).arg("--query").output()?;
        if !output.status.success() {
            return Err(TopologyError::Enumeration(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let displays = parse_query(&String::from_utf8_lossy(&output.stdout));
        debug!("xrandr reported {} active outputs", displays.len());
        Ok(displays)
    }

    fn name(&self) -> &'static str {
        "xrandr"
    }
}

/// Output names are unique per X screen, so the id survives mode changes.
pub fn display_id(output_name: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    output_name.hash(&mut hasher);
    hasher.finish() as u32
}

/// Active (connected and mapped) outputs from `xrandr --query` text.
pub fn parse_query(text: &str) -> Vec<RawDisplay> {
    text.lines().filter_map(parse_output_line).collect()
}

fn parse_output_line(line: &str) -> Option<RawDisplay> {
    // Mode lines are indented
    if line.starts_with(char::is_whitespace) {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let name = tokens.next()?;
    if tokens.next()? != "connected" {
        return None;
    }

    let mut is_primary = false;
    let mut bounds = None;
    let mut rotation = 0;

    for token in tokens {
        if token.starts_with('(') {
            break;
        }
        match token {
            "primary" => is_primary = true,
            "left" => rotation = 270,
            "right" => rotation = 90,
            "inverted" => rotation = 180,
            "normal" => rotation = 0,
            other => {
                if bounds.is_none() {
                    bounds = parse_geometry(other);
                }
            }
        }
    }

    // Connected but not mapped to a CRTC
    let bounds = bounds?;

    let mut display = RawDisplay::new(display_id(name), name, bounds, is_primary);
    display.rotation = rotation;
    Some(display)
}

/// `WIDTHxHEIGHT+X+Y`, where offsets may be negative (`+-1080`)
fn parse_geometry(token: &str) -> Option<Bounds> {
    let (size, offsets) = token.split_once('+')?;
    let (width, height) = size.split_once('x')?;
    let (x, y) = offsets.split_once('+')?;

    Some(Bounds::new(
        x.parse().ok()?,
        y.parse().ok()?,
        width.parse().ok()?,
        height.parse().ok()?,
    ))
}
