//! Icon name mapping
//!
//! Content rows (specialties, statistics) and status badges refer to icons
//! by name. Names resolve against a closed set; anything unrecognized maps
//! to [`Icon::Fallback`].

use serde::{Deserialize, Serialize};

/// Known icon identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Mail,
    Phone,
    Calendar,
    Clock,
    CheckCircle,
    Archive,
    Trash,
    Image,
    Inbox,
    MessageSquare,
    Music,
    Drum,
    Mic,
    Star,
    Award,
    Users,
    Fallback,
}

impl Icon {
    /// Resolve a name written either in kebab-case ("check-circle") or
    /// PascalCase ("CheckCircle"). Unknown names yield `Fallback`.
    pub fn from_name(name: &str) -> Icon {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "mail" => Icon::Mail,
            "phone" => Icon::Phone,
            "calendar" => Icon::Calendar,
            "clock" => Icon::Clock,
            "checkcircle" => Icon::CheckCircle,
            "archive" => Icon::Archive,
            "trash" | "trash2" => Icon::Trash,
            "image" | "imageicon" => Icon::Image,
            "inbox" => Icon::Inbox,
            "messagesquare" => Icon::MessageSquare,
            "music" => Icon::Music,
            "drum" => Icon::Drum,
            "mic" => Icon::Mic,
            "star" => Icon::Star,
            "award" => Icon::Award,
            "users" => Icon::Users,
            _ => Icon::Fallback,
        }
    }

    /// Canonical kebab-case name
    pub fn name(&self) -> &'static str {
        match self {
            Icon::Mail => "mail",
            Icon::Phone => "phone",
            Icon::Calendar => "calendar",
            Icon::Clock => "clock",
            Icon::CheckCircle => "check-circle",
            Icon::Archive => "archive",
            Icon::Trash => "trash",
            Icon::Image => "image",
            Icon::Inbox => "inbox",
            Icon::MessageSquare => "message-square",
            Icon::Music => "music",
            Icon::Drum => "drum",
            Icon::Mic => "mic",
            Icon::Star => "star",
            Icon::Award => "award",
            Icon::Users => "users",
            Icon::Fallback => "fallback",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_accepts_both_casings() {
        assert_eq!(Icon::from_name("CheckCircle"), Icon::CheckCircle);
        assert_eq!(Icon::from_name("check-circle"), Icon::CheckCircle);
        assert_eq!(Icon::from_name("Trash2"), Icon::Trash);
    }

    #[test]
    fn test_unknown_name_falls_back() {
        assert_eq!(Icon::from_name("Saxophone"), Icon::Fallback);
        assert_eq!(Icon::from_name(""), Icon::Fallback);
    }

    #[test]
    fn test_name_resolves_back_to_icon() {
        for icon in [Icon::Mail, Icon::CheckCircle, Icon::MessageSquare, Icon::Archive] {
            assert_eq!(Icon::from_name(icon.name()), icon);
        }
    }
}
