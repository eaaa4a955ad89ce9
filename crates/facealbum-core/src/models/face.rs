use serde::{Deserialize, Serialize};

/// Name shown for faces the user has not named yet
pub const UNTITLED_FACE: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Face {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub face_url: Option<String>,
    #[serde(default)]
    pub face_count: i64,
}

impl Face {
    pub fn display_name(&self) -> &str {
        display_name(self.name.as_deref())
    }
}

/// A face listed for a specific photo, flagged when already linked to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LinkedFace {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub face_url: Option<String>,
    #[serde(default)]
    pub face_count: i64,
    #[serde(default)]
    pub linked: bool,
}

impl LinkedFace {
    pub fn display_name(&self) -> &str {
        display_name(self.name.as_deref())
    }
}

fn display_name(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => UNTITLED_FACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_face() {
        let json = r#"{"id": 4, "name": null, "face_url": "https://cdn/f4.jpg", "face_count": 12}"#;
        let face: Face = serde_json::from_str(json).expect("Failed to parse face JSON");
        assert_eq!(face.id, 4);
        assert_eq!(face.face_count, 12);
        assert_eq!(face.display_name(), "Untitled");
    }

    #[test]
    fn test_linked_face_display_name() {
        let json = r#"{"id": 1, "name": "  Grandma ", "face_url": null, "face_count": 3, "linked": true}"#;
        let face: LinkedFace = serde_json::from_str(json).expect("Failed to parse linked face JSON");
        assert!(face.linked);
        assert_eq!(face.display_name(), "Grandma");
    }
}
