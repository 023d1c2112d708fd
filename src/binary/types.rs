// Attribute typing tables.
//
// Attribute tags are local to their enclosing element: the same tag byte
// means a different field, with a different wire type, under each parent.
// The (parent, attribute) pair resolves to a value kind; enumerated
// attributes resolve their raw wire value through a second table. Both
// tables are part of the wire contract (ETSI TS 102 371).

use super::frame::*;

// ---------------------------------------------------------------------------
// Value kinds
// ---------------------------------------------------------------------------

/// Wire type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Unsigned integer with the given encode-side bit width.
    Uint(u32),
    /// Whole seconds, 16 bits.
    Duration,
    /// A bare textual reference (crid or id string).
    IdRef,
    /// Classification-scheme reference.
    Genre,
    /// MJD-based timestamp.
    Timepoint,
    Text,
    ContentId,
    /// Enumerated value; raw bytes resolve through `enum_value`.
    Enum,
}

/// Resolve the value kind for `attr` under the element `parent`.
/// `None` means the pair is not part of the format.
pub fn attribute_kind(parent: u8, attr: u8) -> Option<AttributeKind> {
    use AttributeKind::*;
    Some(match (parent, attr) {
        (TAG_EPG, 0x80) => Enum, // document profile

        (TAG_SERVICE_INFORMATION, 0x80) => Uint(16), // version
        (TAG_SERVICE_INFORMATION, 0x81) => Timepoint, // created
        (TAG_SERVICE_INFORMATION, 0x82) => Text,     // originator
        (TAG_SERVICE_INFORMATION, 0x83) => Text,     // serviceProvider

        (TAG_SCHEDULE, 0x80) => Uint(16),  // version
        (TAG_SCHEDULE, 0x81) => Timepoint, // created
        (TAG_SCHEDULE, 0x82) => Text,      // originator

        (TAG_SCOPE, 0x80) => Timepoint, // startTime
        (TAG_SCOPE, 0x81) => Timepoint, // stopTime
        (TAG_SERVICE_SCOPE, 0x80) => ContentId,

        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x80) => IdRef, // crid
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x81) => Uint(24), // shortId
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x82) => Uint(16), // version
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x83) => Enum,  // recommendation
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x84) => Enum,  // broadcast
        (TAG_PROGRAMME, 0x87) => Uint(16),                    // bitrate

        (TAG_TIME, 0x80) => Timepoint, // billed time
        (TAG_TIME, 0x81) => Duration,  // billed duration
        (TAG_TIME, 0x82) => Timepoint, // actual time
        (TAG_TIME, 0x83) => Duration,  // actual duration

        (TAG_RELATIVE_TIME, 0x80) => Duration, // billed offset
        (TAG_RELATIVE_TIME, 0x81) => Duration, // billed duration
        (TAG_RELATIVE_TIME, 0x82) => Duration, // actual offset
        (TAG_RELATIVE_TIME, 0x83) => Duration, // actual duration

        (TAG_BEARER, 0x80) => ContentId,

        (TAG_MULTIMEDIA, 0x80) => Text, // mimeValue
        (TAG_MULTIMEDIA, 0x82) => Text, // url
        (TAG_MULTIMEDIA, 0x83) => Enum, // type
        (TAG_MULTIMEDIA, 0x84) => Uint(16), // width
        (TAG_MULTIMEDIA, 0x85) => Uint(16), // height

        (TAG_GENRE, 0x80) => Genre, // href

        (TAG_MEMBER_OF, 0x80) => IdRef,    // crid
        (TAG_MEMBER_OF, 0x81) => Uint(24), // shortId
        (TAG_MEMBER_OF, 0x82) => Uint(16), // index

        (TAG_LINK, 0x80) => Text,      // url
        (TAG_LINK, 0x81) => Text,      // mimeValue
        (TAG_LINK, 0x83) => Text,      // description
        (TAG_LINK, 0x84) => Timepoint, // expiryTime

        (TAG_SERVICE, 0x80) => Uint(16), // version
        (TAG_SERVICE, 0x83) => Uint(16), // bitrate (kbps x 10)
        (TAG_SERVICE_ID, 0x80) => ContentId,

        (TAG_ENSEMBLE, 0x80) => ContentId, // id
        (TAG_ENSEMBLE, 0x81) => Uint(16),  // version

        (TAG_FREQUENCY, 0x81) => Uint(24), // kHz

        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Enumerated values
// ---------------------------------------------------------------------------

/// Symbolic value of an enumerated attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumValue {
    ProfileDab,
    ProfileDrm,
    RecommendationNo,
    RecommendationYes,
    OnAir,
    OffAir,
    LogoUnrestricted,
    LogoMonoSquare,
    LogoColourSquare,
    LogoMonoRectangle,
    LogoColourRectangle,
}

/// Outcome of resolving an enumerated attribute's raw wire value.
pub enum EnumLookup {
    Value(EnumValue),
    /// The (parent, attr) pair is enumerated, but this raw value has no
    /// mapping yet: the input is valid, the decoder's coverage is not.
    NotImplemented,
}

/// Resolve the raw wire value of an enumerated attribute.
/// Must only be called for pairs that `attribute_kind` maps to `Enum`.
pub fn enum_value(parent: u8, attr: u8, raw: u64) -> EnumLookup {
    use EnumValue::*;
    let value = match (parent, attr, raw) {
        (TAG_EPG, 0x80, 0x01) => ProfileDab,
        (TAG_EPG, 0x80, 0x02) => ProfileDrm,

        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x83, 0x01) => RecommendationNo,
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x83, 0x02) => RecommendationYes,
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x84, 0x01) => OnAir,
        (TAG_PROGRAMME | TAG_PROGRAMME_EVENT, 0x84, 0x02) => OffAir,

        (TAG_MULTIMEDIA, 0x83, 0x02) => LogoUnrestricted,
        (TAG_MULTIMEDIA, 0x83, 0x03) => LogoMonoSquare,
        (TAG_MULTIMEDIA, 0x83, 0x04) => LogoColourSquare,
        (TAG_MULTIMEDIA, 0x83, 0x05) => LogoMonoRectangle,
        (TAG_MULTIMEDIA, 0x83, 0x06) => LogoColourRectangle,

        _ => return EnumLookup::NotImplemented,
    };
    EnumLookup::Value(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_covers_every_encoded_pair() {
        // Every attribute the encoder can emit must resolve.
        let pairs = [
            (TAG_SERVICE_INFORMATION, 0x80),
            (TAG_SERVICE_INFORMATION, 0x81),
            (TAG_SERVICE_INFORMATION, 0x82),
            (TAG_SERVICE_INFORMATION, 0x83),
            (TAG_SCHEDULE, 0x80),
            (TAG_SCHEDULE, 0x81),
            (TAG_SCHEDULE, 0x82),
            (TAG_SCOPE, 0x80),
            (TAG_SCOPE, 0x81),
            (TAG_SERVICE_SCOPE, 0x80),
            (TAG_PROGRAMME, 0x80),
            (TAG_PROGRAMME, 0x81),
            (TAG_PROGRAMME, 0x82),
            (TAG_PROGRAMME, 0x83),
            (TAG_PROGRAMME, 0x84),
            (TAG_PROGRAMME, 0x87),
            (TAG_TIME, 0x80),
            (TAG_TIME, 0x81),
            (TAG_TIME, 0x82),
            (TAG_TIME, 0x83),
            (TAG_RELATIVE_TIME, 0x80),
            (TAG_RELATIVE_TIME, 0x81),
            (TAG_BEARER, 0x80),
            (TAG_MULTIMEDIA, 0x80),
            (TAG_MULTIMEDIA, 0x82),
            (TAG_MULTIMEDIA, 0x83),
            (TAG_MULTIMEDIA, 0x84),
            (TAG_MULTIMEDIA, 0x85),
            (TAG_GENRE, 0x80),
            (TAG_MEMBER_OF, 0x80),
            (TAG_MEMBER_OF, 0x81),
            (TAG_MEMBER_OF, 0x82),
            (TAG_LINK, 0x80),
            (TAG_LINK, 0x81),
            (TAG_LINK, 0x83),
            (TAG_LINK, 0x84),
            (TAG_SERVICE, 0x80),
            (TAG_SERVICE, 0x83),
            (TAG_SERVICE_ID, 0x80),
            (TAG_ENSEMBLE, 0x80),
            (TAG_ENSEMBLE, 0x81),
            (TAG_FREQUENCY, 0x81),
            (TAG_PROGRAMME_EVENT, 0x80),
            (TAG_PROGRAMME_EVENT, 0x81),
            (TAG_PROGRAMME_EVENT, 0x82),
            (TAG_PROGRAMME_EVENT, 0x83),
            (TAG_PROGRAMME_EVENT, 0x84),
        ];
        for (parent, attr) in pairs {
            assert!(
                attribute_kind(parent, attr).is_some(),
                "unresolved pair ({parent:#04x}, {attr:#04x})"
            );
        }
    }

    #[test]
    fn unknown_pairs_resolve_to_none() {
        assert_eq!(attribute_kind(TAG_FREQUENCY, 0x85), None);
        assert_eq!(attribute_kind(TAG_BEARER, 0x81), None);
        assert_eq!(attribute_kind(0x30, 0x80), None);
    }

    #[test]
    fn enum_values_resolve() {
        assert!(matches!(
            enum_value(TAG_PROGRAMME, 0x83, 0x02),
            EnumLookup::Value(EnumValue::RecommendationYes)
        ));
        assert!(matches!(
            enum_value(TAG_PROGRAMME, 0x84, 0x02),
            EnumLookup::Value(EnumValue::OffAir)
        ));
        assert!(matches!(
            enum_value(TAG_MULTIMEDIA, 0x83, 0x06),
            EnumLookup::Value(EnumValue::LogoColourRectangle)
        ));
    }

    #[test]
    fn unmapped_enum_raw_value_is_not_implemented() {
        assert!(matches!(
            enum_value(TAG_PROGRAMME, 0x83, 0x7F),
            EnumLookup::NotImplemented
        ));
    }
}
