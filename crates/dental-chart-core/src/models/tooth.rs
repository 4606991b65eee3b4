//! Tooth identity and anatomy models.

use serde::{Deserialize, Serialize};

/// Dentition a tooth belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DentitionType {
    /// Adult teeth, numbered 1-32
    Permanent,
    /// Child teeth, lettered A-T
    Primary,
}

impl DentitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DentitionType::Permanent => "permanent",
            DentitionType::Primary => "primary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "permanent" => Some(DentitionType::Permanent),
            "primary" => Some(DentitionType::Primary),
            _ => None,
        }
    }

    /// Dentition implied by the format of a tooth identity.
    ///
    /// Digits mean permanent, a single letter means primary. Anything else
    /// implies no dentition at all and can never name a real tooth.
    pub fn implied_by(identity: &str) -> Option<Self> {
        if !identity.is_empty() && identity.chars().all(|c| c.is_ascii_digit()) {
            Some(DentitionType::Permanent)
        } else if identity.len() == 1 && identity.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(DentitionType::Primary)
        } else {
            None
        }
    }
}

/// Anatomical quadrant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    UpperRight,
    UpperLeft,
    LowerLeft,
    LowerRight,
}

impl Quadrant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::UpperRight => "upper_right",
            Quadrant::UpperLeft => "upper_left",
            Quadrant::LowerLeft => "lower_left",
            Quadrant::LowerRight => "lower_right",
        }
    }

    /// Human-readable prefix used in tooth names.
    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::UpperRight => "Upper Right",
            Quadrant::UpperLeft => "Upper Left",
            Quadrant::LowerLeft => "Lower Left",
            Quadrant::LowerRight => "Lower Right",
        }
    }
}

/// Anatomical tooth type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToothType {
    Molar,
    Premolar,
    Canine,
    Incisor,
}

impl ToothType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToothType::Molar => "molar",
            ToothType::Premolar => "premolar",
            ToothType::Canine => "canine",
            ToothType::Incisor => "incisor",
        }
    }
}

/// A canonical tooth as defined by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tooth {
    /// Identity within its dentition ("1".."32" or "A".."T")
    pub number: String,
    /// Universal/FDI-style numeric code (1-32 permanent, 51-85 primary)
    pub universal_number: u32,
    /// Dentition, always derived from `number`
    pub dentition_type: DentitionType,
    /// Anatomical quadrant
    pub quadrant: Quadrant,
    /// Anatomical type
    pub tooth_type: ToothType,
    /// Display name (e.g., "Upper Right First Molar")
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implied_dentition() {
        assert_eq!(DentitionType::implied_by("14"), Some(DentitionType::Permanent));
        assert_eq!(DentitionType::implied_by("A"), Some(DentitionType::Primary));
        assert_eq!(DentitionType::implied_by("X"), Some(DentitionType::Primary));
        assert_eq!(DentitionType::implied_by(""), None);
        assert_eq!(DentitionType::implied_by("1A"), None);
        assert_eq!(DentitionType::implied_by("AB"), None);
    }

    #[test]
    fn test_dentition_parse() {
        assert_eq!(DentitionType::parse("Primary"), Some(DentitionType::Primary));
        assert_eq!(DentitionType::parse(" permanent "), Some(DentitionType::Permanent));
        assert_eq!(DentitionType::parse("mixed"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Quadrant::LowerLeft).unwrap();
        assert_eq!(json, "\"lower_left\"");
        let json = serde_json::to_string(&DentitionType::Primary).unwrap();
        assert_eq!(json, "\"primary\"");
    }
}
