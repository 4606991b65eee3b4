//! Tooth surface models.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the five tooth faces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Mesial,
    Distal,
    Occlusal,
    Buccal,
    Lingual,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Mesial => "mesial",
            Surface::Distal => "distal",
            Surface::Occlusal => "occlusal",
            Surface::Buccal => "buccal",
            Surface::Lingual => "lingual",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "mesial" => Some(Surface::Mesial),
            "distal" => Some(Surface::Distal),
            "occlusal" => Some(Surface::Occlusal),
            "buccal" => Some(Surface::Buccal),
            "lingual" => Some(Surface::Lingual),
            _ => None,
        }
    }
}

/// Rejected surface input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidSurface(pub String);

/// Non-empty set of surfaces, or the `all` sentinel.
///
/// Wire form is a comma-separated list in canonical order
/// (`mesial,distal,occlusal,buccal,lingual`) or the literal `all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SurfaceSet {
    All,
    Faces(BTreeSet<Surface>),
}

impl SurfaceSet {
    /// Parse the wire form. Tokens are trimmed and case-insensitive.
    pub fn parse(raw: &str) -> Result<Self, InvalidSurface> {
        let tokens: Vec<String> = raw
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(InvalidSurface("at least one surface is required".into()));
        }

        if tokens.iter().any(|t| t == "all") {
            if tokens.len() > 1 {
                return Err(InvalidSurface(
                    "'all' cannot be combined with named surfaces".into(),
                ));
            }
            return Ok(SurfaceSet::All);
        }

        let mut faces = BTreeSet::new();
        for token in &tokens {
            let surface = Surface::from_token(token)
                .ok_or_else(|| InvalidSurface(format!("unrecognized surface '{}'", token)))?;
            faces.insert(surface);
        }
        Ok(SurfaceSet::Faces(faces))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SurfaceSet::All)
    }

    /// Whether the set covers the given face.
    pub fn covers(&self, surface: Surface) -> bool {
        match self {
            SurfaceSet::All => true,
            SurfaceSet::Faces(faces) => faces.contains(&surface),
        }
    }

    /// Canonical wire form.
    pub fn to_wire(&self) -> String {
        match self {
            SurfaceSet::All => "all".to_string(),
            SurfaceSet::Faces(faces) => faces
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for SurfaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl TryFrom<String> for SurfaceSet {
    type Error = InvalidSurface;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SurfaceSet::parse(&value)
    }
}

impl From<SurfaceSet> for String {
    fn from(set: SurfaceSet) -> Self {
        set.to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        let set = SurfaceSet::parse("occlusal").unwrap();
        assert!(set.covers(Surface::Occlusal));
        assert!(!set.covers(Surface::Mesial));
        assert_eq!(set.to_wire(), "occlusal");
    }

    #[test]
    fn test_parse_canonical_order() {
        let set = SurfaceSet::parse("Buccal, occlusal,mesial").unwrap();
        assert_eq!(set.to_wire(), "mesial,occlusal,buccal");
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = SurfaceSet::parse("distal,distal").unwrap();
        assert_eq!(set.to_wire(), "distal");
    }

    #[test]
    fn test_all_sentinel() {
        let set = SurfaceSet::parse("all").unwrap();
        assert!(set.is_all());
        assert!(set.covers(Surface::Lingual));
    }

    #[test]
    fn test_rejects_empty_and_unknown() {
        assert!(SurfaceSet::parse("").is_err());
        assert!(SurfaceSet::parse(" , ").is_err());
        assert!(SurfaceSet::parse("labial").is_err());
        assert!(SurfaceSet::parse("occlusal,palatal").is_err());
    }

    #[test]
    fn test_rejects_all_with_faces() {
        assert!(SurfaceSet::parse("all,mesial").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let set = SurfaceSet::parse("occlusal,buccal").unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "\"occlusal,buccal\"");
        let back: SurfaceSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert!(serde_json::from_str::<SurfaceSet>("\"gum\"").is_err());
    }
}
