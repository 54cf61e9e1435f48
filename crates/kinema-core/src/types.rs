use serde::{Deserialize, Serialize};

/// Which keyframe track of an entity a value or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Position,
    Rotation,
    Visibility,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Position => write!(f, "position"),
            TrackKind::Rotation => write!(f, "rotation"),
            TrackKind::Visibility => write!(f, "visibility"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_kind_display() {
        assert_eq!(TrackKind::Position.to_string(), "position");
        assert_eq!(TrackKind::Rotation.to_string(), "rotation");
        assert_eq!(TrackKind::Visibility.to_string(), "visibility");
    }
}
