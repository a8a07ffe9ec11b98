use serde::{Deserialize, Serialize};

/// Lifecycle commands the operator writes to an output process's stdin
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum WindowCommand {
    Show,
    Hide,
    /// Re-target the surface to another display's bounds
    Move {
        display_id: u32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Close,
}

impl WindowCommand {
    pub fn to_json_line(&self) -> std::result::Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let json = WindowCommand::Hide.to_json_line().unwrap();
        assert_eq!(json, "{\"cmd\":\"hide\"}\n");

        let json = WindowCommand::Move {
            display_id: 2,
            x: 1920,
            y: 0,
            width: 1920,
            height: 1080,
        }
        .to_json_line()
        .unwrap();
        assert!(json.contains("\"cmd\":\"move\""));
        assert!(json.contains("\"x\":1920"));

        let parsed: WindowCommand = serde_json::from_str(json.trim()).unwrap();
        assert!(matches!(parsed, WindowCommand::Move { display_id: 2, .. }));
    }
}
