// Content id codec: compound broadcast identifiers.
//
// Two wire forms, disambiguated on decode by payload byte length:
//   short (exactly 3 bytes): ECC (8) + EId (16), used whenever the id
//   carries no service/component pair;
//   long (anything else): flag nibble + SCIdS, optional ECC/EId, SId,
//   optional X-PAD application type.
//
// The 32-bit "data service" SId form is defined by the transport standard
// but unsupported here on both sides.

use thiserror::Error;

use super::bitbuf::{BitBuf, BitError, BitReader};
use crate::model::{ContentId, MAX_XPAD};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentIdError {
    #[error("X-PAD application type {0:#x} exceeds 5 bits")]
    XpadOutOfRange(u8),
    #[error("SCIdS {0:#x} exceeds 4 bits")]
    ScidsOutOfRange(u8),
    #[error("32-bit data-service SIds are not implemented")]
    DataServiceSid,
    #[error("content id payload too short: {0} bits")]
    TooShort(usize),
    #[error("content id field out of range: {0}")]
    Bits(#[from] BitError),
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a content id. The short ensemble-only form is chosen exactly
/// when no service/component pair is present.
pub fn encode_contentid(id: &ContentId) -> Result<BitBuf, ContentIdError> {
    let mut bits = BitBuf::new();

    let (Some(sid), Some(scids)) = (id.sid, id.scids) else {
        bits.append_uint(u64::from(id.ecc), 8)?;
        bits.append_uint(u64::from(id.eid), 16)?;
        return Ok(bits);
    };

    if scids > 0x0F {
        return Err(ContentIdError::ScidsOutOfRange(scids));
    }
    if let Some(xpad) = id.xpad
        && xpad > MAX_XPAD
    {
        return Err(ContentIdError::XpadOutOfRange(xpad));
    }

    bits.append_uint(0, 1)?; // RFA
    bits.append_uint(1, 1)?; // ensemble flag: ECC and EId follow
    bits.append_uint(u64::from(id.xpad.is_some()), 1)?;
    bits.append_uint(0, 1)?; // SId encoding flag: 16-bit audio service
    bits.append_uint(u64::from(scids), 4)?;
    bits.append_uint(u64::from(id.ecc), 8)?;
    bits.append_uint(u64::from(id.eid), 16)?;
    bits.append_uint(u64::from(sid), 16)?;
    if let Some(xpad) = id.xpad {
        bits.append_uint(0, 3)?; // RFA
        bits.append_uint(u64::from(xpad), 5)?;
    }
    Ok(bits)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a content id from an attribute payload.
pub fn decode_contentid(payload: &[u8]) -> Result<ContentId, ContentIdError> {
    // An exact 24-bit payload is always the ensemble-only form.
    if payload.len() == 3 {
        return Ok(ContentId::ensemble(
            payload[0],
            u16::from_be_bytes([payload[1], payload[2]]),
        ));
    }
    if payload.len() < 3 {
        return Err(ContentIdError::TooShort(payload.len() * 8));
    }

    let mut r = BitReader::new(payload);
    r.read_uint(1)?; // RFA
    let has_ensemble = r.read_flag()?;
    let has_xpad = r.read_flag()?;
    let wide_sid = r.read_flag()?;
    if wide_sid {
        return Err(ContentIdError::DataServiceSid);
    }
    let scids = r.read_uint(4)? as u8;

    let (ecc, eid) = if has_ensemble {
        (r.read_uint(8)? as u8, r.read_uint(16)? as u16)
    } else {
        (0, 0)
    };
    let sid = r.read_uint(16)? as u16;
    let xpad = if has_xpad {
        r.read_uint(3)?; // RFA
        Some(r.read_uint(5)? as u8)
    } else {
        None
    };

    Ok(ContentId {
        ecc,
        eid,
        sid: Some(sid),
        scids: Some(scids),
        xpad,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(bits: BitBuf) -> Vec<u8> {
        let mut bits = bits;
        bits.pad_to_byte();
        bits.into_bytes()
    }

    #[test]
    fn ensemble_only_form_is_three_bytes() {
        let id = ContentId::ensemble(0xE1, 0xCFFF);
        let bits = encode_contentid(&id).unwrap();
        assert_eq!(bits.byte_len(), 3);
        assert_eq!(bits.as_bytes(), &[0xE1, 0xCF, 0xFF]);
        assert_eq!(decode_contentid(&padded(bits)).unwrap(), id);
    }

    #[test]
    fn three_byte_payload_always_short_form() {
        // Flag-like bit patterns inside a 3-byte payload must not matter.
        let id = decode_contentid(&[0xFF, 0xAB, 0xCD]).unwrap();
        assert_eq!(id, ContentId::ensemble(0xFF, 0xABCD));
    }

    #[test]
    fn long_form_roundtrip() {
        let id: ContentId = "e1.ce00.c000.0".parse().unwrap();
        let bits = encode_contentid(&id).unwrap();
        assert_eq!(bits.byte_len(), 6);
        let bytes = padded(bits);
        // Ensemble flag set; ECC/EId at the documented offsets.
        assert_eq!(bytes[0], 0b0100_0000);
        assert_eq!(bytes[1], 0xE1);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 0xCE00);
        assert_eq!(decode_contentid(&bytes).unwrap(), id);
    }

    #[test]
    fn xpad_roundtrip() {
        let mut id = ContentId::service(0xE1, 0xC181, 0xC2A1, 0x0);
        id.xpad = Some(0x1F);
        let bits = encode_contentid(&id).unwrap();
        assert_eq!(bits.byte_len(), 7);
        assert_eq!(decode_contentid(&padded(bits)).unwrap(), id);
    }

    #[test]
    fn xpad_beyond_five_bits_fails() {
        let mut id = ContentId::service(0xE1, 0xC181, 0xC2A1, 0x0);
        id.xpad = Some(0x20);
        assert_eq!(
            encode_contentid(&id),
            Err(ContentIdError::XpadOutOfRange(0x20))
        );
    }

    #[test]
    fn wide_sid_flag_not_implemented() {
        // Long form with the SId-encoding flag set.
        let payload = [0b0101_0000, 0, 0, 0, 0, 0];
        assert_eq!(
            decode_contentid(&payload),
            Err(ContentIdError::DataServiceSid)
        );
    }

    #[test]
    fn short_payload_rejected() {
        assert!(matches!(
            decode_contentid(&[0xE1, 0xCF]),
            Err(ContentIdError::TooShort(_))
        ));
    }
}
