// Genre codec: TV-Anytime classification-scheme references.
//
// The URN form is `urn:tva:metadata:cs:<Scheme>CS:<year>:<l1.l2...>`.
// On the wire: 4 RFU bits, a 4-bit scheme code, then one byte per level.

use std::fmt;

use thiserror::Error;

use super::bitbuf::{BitBuf, BitError, BitReader};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenreError {
    #[error("genre is incorrectly formatted: {0:?}")]
    BadHref(String),
    #[error("unknown classification scheme: {0:?}")]
    UnknownScheme(String),
    #[error("unknown classification scheme code: {0}")]
    UnknownSchemeCode(u8),
    #[error("genre level {0:?} is not an 8-bit integer")]
    BadLevel(String),
    #[error("genre field out of range: {0}")]
    Bits(#[from] BitError),
}

// ---------------------------------------------------------------------------
// Classification schemes
// ---------------------------------------------------------------------------

/// The eight named schemes addressable by the 4-bit wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationScheme {
    Intention,
    Format,
    Content,
    IntendedAudience,
    Origination,
    ContentAlert,
    MediaType,
    Atmosphere,
}

impl ClassificationScheme {
    pub fn code(self) -> u8 {
        match self {
            Self::Intention => 1,
            Self::Format => 2,
            Self::Content => 3,
            Self::IntendedAudience => 4,
            Self::Origination => 5,
            Self::ContentAlert => 6,
            Self::MediaType => 7,
            Self::Atmosphere => 8,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, GenreError> {
        Ok(match code {
            1 => Self::Intention,
            2 => Self::Format,
            3 => Self::Content,
            4 => Self::IntendedAudience,
            5 => Self::Origination,
            6 => Self::ContentAlert,
            7 => Self::MediaType,
            8 => Self::Atmosphere,
            other => return Err(GenreError::UnknownSchemeCode(other)),
        })
    }

    pub fn from_name(name: &str) -> Result<Self, GenreError> {
        Ok(match name {
            "IntentionCS" => Self::Intention,
            "FormatCS" => Self::Format,
            "ContentCS" => Self::Content,
            "IntendedAudienceCS" => Self::IntendedAudience,
            "OriginationCS" => Self::Origination,
            "ContentAlertCS" => Self::ContentAlert,
            "MediaTypeCS" => Self::MediaType,
            "AtmosphereCS" => Self::Atmosphere,
            other => return Err(GenreError::UnknownScheme(other.to_string())),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Intention => "IntentionCS",
            Self::Format => "FormatCS",
            Self::Content => "ContentCS",
            Self::IntendedAudience => "IntendedAudienceCS",
            Self::Origination => "OriginationCS",
            Self::ContentAlert => "ContentAlertCS",
            Self::MediaType => "MediaTypeCS",
            Self::Atmosphere => "AtmosphereCS",
        }
    }
}

impl fmt::Display for ClassificationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a genre href. The scheme name is the 5th colon segment; the
/// optional 7th segment is the dotted level path.
pub fn encode_genre(href: &str) -> Result<BitBuf, GenreError> {
    let segments: Vec<&str> = href.split(':').collect();
    if segments.len() < 6 {
        return Err(GenreError::BadHref(href.to_string()));
    }
    let scheme = ClassificationScheme::from_name(segments[4])?;

    let mut bits = BitBuf::new();
    bits.append_uint(0, 4)?; // RFU
    bits.append_uint(u64::from(scheme.code()), 4)?;

    if let Some(&levels) = segments.get(6) {
        for level in levels.split('.') {
            let value: u8 = level
                .parse()
                .map_err(|_| GenreError::BadLevel(level.to_string()))?;
            bits.append_uint(u64::from(value), 8)?;
        }
    }
    Ok(bits)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a genre payload back to its canonical URN.
pub fn decode_genre(payload: &[u8]) -> Result<String, GenreError> {
    let mut r = BitReader::new(payload);
    r.read_uint(4)?; // RFU
    let scheme = ClassificationScheme::from_code(r.read_uint(4)? as u8)?;

    let mut href = format!("urn:tva:metadata:cs:{scheme}:2002");
    let levels: Vec<String> = payload[1..].iter().map(u8::to_string).collect();
    if !levels.is_empty() {
        href.push(':');
        href.push_str(&levels.join("."));
    }
    Ok(href)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_genre_roundtrip() {
        let href = "urn:tva:metadata:cs:ContentCS:2002:3.6.9";
        let bits = encode_genre(href).unwrap();
        assert_eq!(bits.as_bytes(), &[0x03, 3, 6, 9]);
        assert_eq!(decode_genre(bits.as_bytes()).unwrap(), href);
    }

    #[test]
    fn scheme_without_levels() {
        let bits = encode_genre("urn:tva:metadata:cs:MediaTypeCS:2002").unwrap();
        assert_eq!(bits.as_bytes(), &[0x07]);
        assert_eq!(
            decode_genre(bits.as_bytes()).unwrap(),
            "urn:tva:metadata:cs:MediaTypeCS:2002"
        );
    }

    #[test]
    fn all_scheme_codes_roundtrip() {
        for code in 1..=8u8 {
            let scheme = ClassificationScheme::from_code(code).unwrap();
            assert_eq!(ClassificationScheme::from_name(scheme.name()).unwrap(), scheme);
            assert_eq!(scheme.code(), code);
        }
    }

    #[test]
    fn unknown_scheme_name_fails() {
        assert!(matches!(
            encode_genre("urn:tva:metadata:cs:NopeCS:2002:1"),
            Err(GenreError::UnknownScheme(_))
        ));
    }

    #[test]
    fn unknown_scheme_code_fails() {
        assert_eq!(decode_genre(&[0x09]), Err(GenreError::UnknownSchemeCode(9)));
        assert_eq!(decode_genre(&[0x00]), Err(GenreError::UnknownSchemeCode(0)));
    }

    #[test]
    fn malformed_href_fails() {
        assert!(matches!(
            encode_genre("not a urn"),
            Err(GenreError::BadHref(_))
        ));
        assert!(matches!(
            encode_genre("urn:tva:metadata:cs:ContentCS:2002:3.x.9"),
            Err(GenreError::BadLevel(_))
        ));
    }
}
