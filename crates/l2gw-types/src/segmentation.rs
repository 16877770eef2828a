//! Segmentation id (VLAN tag) for gateway interfaces and connections.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN tag identifying a network segment on a physical link.
///
/// Valid range is 1-4094; 0 and 4095 are reserved.
///
/// # Examples
///
/// ```
/// use l2gw_types::SegmentationId;
///
/// let seg = SegmentationId::new(100).unwrap();
/// assert_eq!(seg.as_u16(), 100);
/// assert!(SegmentationId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct SegmentationId(u16);

impl SegmentationId {
    /// Minimum valid VLAN tag.
    pub const MIN: u16 = 1;

    /// Maximum valid VLAN tag.
    pub const MAX: u16 = 4094;

    /// Creates a segmentation id, rejecting reserved tags.
    pub fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(SegmentationId(id))
        } else {
            Err(ParseError::InvalidSegmentationId(id.to_string()))
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SegmentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SegmentationId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidSegmentationId(s.to_string());
        let id: u16 = s.trim().parse().map_err(|_| invalid())?;
        SegmentationId::new(id).map_err(|_| invalid())
    }
}

impl TryFrom<u16> for SegmentationId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        SegmentationId::new(id)
    }
}

impl From<SegmentationId> for u16 {
    fn from(seg: SegmentationId) -> u16 {
        seg.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_range() {
        assert!(SegmentationId::new(1).is_ok());
        assert!(SegmentationId::new(4094).is_ok());
        assert!(SegmentationId::new(0).is_err());
        assert!(SegmentationId::new(4095).is_err());
    }

    #[test]
    fn test_parse() {
        let seg: SegmentationId = "100".parse().unwrap();
        assert_eq!(seg.as_u16(), 100);
        assert_eq!(seg.to_string(), "100");

        let err = "abc".parse::<SegmentationId>().unwrap_err();
        assert_eq!(err, ParseError::InvalidSegmentationId("abc".to_string()));
        assert!("5000".parse::<SegmentationId>().is_err());
    }

    #[test]
    fn test_serde_rejects_reserved_tag() {
        let seg: SegmentationId = serde_json::from_str("200").unwrap();
        assert_eq!(seg.as_u16(), 200);
        assert!(serde_json::from_str::<SegmentationId>("0").is_err());
    }
}
