use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrimitiveError;

/// Byte order used for every multi-byte primitive of a schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Most significant byte first (network order).
    #[default]
    #[serde(alias = "network")]
    Big,
    /// Least significant byte first.
    Little,
}

impl ByteOrder {
    /// The byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ByteOrder::Big => "big",
            ByteOrder::Little => "little",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ByteOrder {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "network" | ">" | "!" => Ok(ByteOrder::Big),
            "little" | "<" => Ok(ByteOrder::Little),
            _ => Err(PrimitiveError::UnknownByteOrder(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_network_order() {
        assert_eq!(ByteOrder::default(), ByteOrder::Big);
    }

    #[test]
    fn parses_names_and_symbols() {
        assert_eq!("network".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert_eq!("<".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert!(matches!(
            "middle".parse::<ByteOrder>(),
            Err(PrimitiveError::UnknownByteOrder(_))
        ));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ByteOrder::Little).unwrap();
        assert_eq!(json, "\"little\"");
        let parsed: ByteOrder = serde_json::from_str("\"network\"").unwrap();
        assert_eq!(parsed, ByteOrder::Big);
    }
}
