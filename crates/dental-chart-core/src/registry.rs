//! Canonical tooth sets.
//!
//! Permanent teeth use Universal numbering 1-32, starting at the upper right
//! third molar and running clockwise as seen by the clinician. Primary teeth
//! are lettered A-T along the same path, from the upper right second molar.

use crate::models::{DentitionType, Quadrant, Tooth, ToothType};

/// Anatomy of one side of an arch, from the midline back.
const PERMANENT_ARCH: [(ToothType, &str); 8] = [
    (ToothType::Incisor, "Central Incisor"),
    (ToothType::Incisor, "Lateral Incisor"),
    (ToothType::Canine, "Canine"),
    (ToothType::Premolar, "First Premolar"),
    (ToothType::Premolar, "Second Premolar"),
    (ToothType::Molar, "First Molar"),
    (ToothType::Molar, "Second Molar"),
    (ToothType::Molar, "Third Molar"),
];

const PRIMARY_ARCH: [(ToothType, &str); 5] = [
    (ToothType::Incisor, "Central Incisor"),
    (ToothType::Incisor, "Lateral Incisor"),
    (ToothType::Canine, "Canine"),
    (ToothType::Molar, "First Molar"),
    (ToothType::Molar, "Second Molar"),
];

const QUADRANTS: [Quadrant; 4] = [
    Quadrant::UpperRight,
    Quadrant::UpperLeft,
    Quadrant::LowerLeft,
    Quadrant::LowerRight,
];

/// Stateless registry of the canonical tooth sets.
pub struct ToothRegistry;

impl ToothRegistry {
    /// All teeth of a dentition in chart order.
    pub fn teeth_for(dentition: DentitionType) -> Vec<Tooth> {
        match dentition {
            DentitionType::Permanent => (1..=32).filter_map(permanent_tooth).collect(),
            DentitionType::Primary => ('A'..='T').filter_map(primary_tooth).collect(),
        }
    }

    /// Look up a tooth by (already normalized) identity.
    pub fn lookup(identity: &str) -> Option<Tooth> {
        match DentitionType::implied_by(identity)? {
            DentitionType::Permanent => identity.parse::<u32>().ok().and_then(permanent_tooth),
            DentitionType::Primary => identity.chars().next().and_then(primary_tooth),
        }
    }

    pub fn exists(identity: &str) -> bool {
        Self::lookup(identity).is_some()
    }
}

/// Trim a caller-supplied tooth identity, upper-case its letters and drop
/// leading zeros from numbers ("07" names tooth 7).
pub fn normalize_tooth_identity(raw: &str) -> String {
    let identity = raw.trim().to_ascii_uppercase();
    if !identity.is_empty() && identity.chars().all(|c| c.is_ascii_digit()) {
        let digits = identity.trim_start_matches('0');
        return if digits.is_empty() { "0".to_string() } else { digits.to_string() };
    }
    identity
}

fn permanent_tooth(number: u32) -> Option<Tooth> {
    if !(1..=32).contains(&number) {
        return None;
    }
    let index = (number - 1) as usize;
    let quadrant = QUADRANTS[index / 8];
    let offset = index % 8;
    // Upper right and lower left run from the back toward the midline.
    let from_midline = match quadrant {
        Quadrant::UpperRight | Quadrant::LowerLeft => 7 - offset,
        Quadrant::UpperLeft | Quadrant::LowerRight => offset,
    };
    let (tooth_type, anatomy) = PERMANENT_ARCH[from_midline];
    Some(Tooth {
        number: number.to_string(),
        universal_number: number,
        dentition_type: DentitionType::Permanent,
        quadrant,
        tooth_type,
        name: format!("{} {}", quadrant.label(), anatomy),
    })
}

fn primary_tooth(letter: char) -> Option<Tooth> {
    if !('A'..='T').contains(&letter) {
        return None;
    }
    let index = (letter as u32 - 'A' as u32) as usize;
    let quadrant = QUADRANTS[index / 5];
    let offset = index % 5;
    let from_midline = match quadrant {
        Quadrant::UpperRight | Quadrant::LowerLeft => 4 - offset,
        Quadrant::UpperLeft | Quadrant::LowerRight => offset,
    };
    let (tooth_type, anatomy) = PRIMARY_ARCH[from_midline];
    Some(Tooth {
        number: letter.to_string(),
        universal_number: (index as u32 / 5 + 5) * 10 + from_midline as u32 + 1,
        dentition_type: DentitionType::Primary,
        quadrant,
        tooth_type,
        name: format!("Primary {} {}", quadrant.label(), anatomy),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_set() {
        let teeth = ToothRegistry::teeth_for(DentitionType::Permanent);
        assert_eq!(teeth.len(), 32);
        assert_eq!(teeth[0].name, "Upper Right Third Molar");
        assert_eq!(teeth[7].name, "Upper Right Central Incisor");
        assert_eq!(teeth[8].name, "Upper Left Central Incisor");
        assert_eq!(teeth[15].name, "Upper Left Third Molar");
        assert_eq!(teeth[16].name, "Lower Left Third Molar");
        assert_eq!(teeth[31].name, "Lower Right Third Molar");
        assert!(teeth.iter().all(|t| t.dentition_type == DentitionType::Permanent));
    }

    #[test]
    fn test_tooth_14() {
        let tooth = ToothRegistry::lookup("14").unwrap();
        assert_eq!(tooth.quadrant, Quadrant::UpperLeft);
        assert_eq!(tooth.name, "Upper Left First Molar");
        assert_eq!(tooth.tooth_type, ToothType::Molar);
    }

    #[test]
    fn test_primary_set() {
        let teeth = ToothRegistry::teeth_for(DentitionType::Primary);
        assert_eq!(teeth.len(), 20);
        assert_eq!(teeth[0].number, "A");
        assert_eq!(teeth[0].universal_number, 55);
        assert_eq!(teeth[0].name, "Primary Upper Right Second Molar");
        assert_eq!(teeth[4].universal_number, 51);
        assert_eq!(teeth[4].name, "Primary Upper Right Central Incisor");
        assert_eq!(teeth[5].universal_number, 61);
        assert_eq!(teeth[10].universal_number, 75);
        assert_eq!(teeth[15].universal_number, 81);
        assert_eq!(teeth[9].universal_number, 65);
        assert_eq!(teeth[10].quadrant, Quadrant::LowerLeft);
        assert_eq!(teeth[19].universal_number, 85);
        assert_eq!(teeth[19].name, "Primary Lower Right Second Molar");
    }

    #[test]
    fn test_unknown_identities() {
        assert!(ToothRegistry::lookup("0").is_none());
        assert!(ToothRegistry::lookup("33").is_none());
        assert!(ToothRegistry::lookup("U").is_none());
        assert!(ToothRegistry::lookup("a").is_none());
        assert!(ToothRegistry::lookup("").is_none());
    }

    #[test]
    fn test_normalize_identity() {
        assert_eq!(normalize_tooth_identity(" b "), "B");
        assert_eq!(normalize_tooth_identity("14"), "14");
        assert_eq!(normalize_tooth_identity(" 07"), "7");
        assert_eq!(normalize_tooth_identity("00"), "0");
    }
}
