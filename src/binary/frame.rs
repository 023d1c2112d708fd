// TLV frame codec: tag byte + length prefix + payload.
//
// One framing rule is shared by elements, attributes, cdata, and the
// token/default declarations; only payload interpretation differs.
// The length prefix is chosen solely by payload byte length:
//   1 byte          for 0..=253
//   0xFE + u16 (BE) for 254..=65536
//   0xFF + u24 (BE) for 65537..=16777216
// Larger payloads cannot be framed.

use thiserror::Error;

use super::bitbuf::BitBuf;

// ---------------------------------------------------------------------------
// Tag space
// ---------------------------------------------------------------------------

/// Character data payload.
pub const TAG_CDATA: u8 = 0x01;
/// Root tag of a programme-schedule document.
pub const TAG_EPG: u8 = 0x02;
/// Root tag of a service-information document.
pub const TAG_SERVICE_INFORMATION: u8 = 0x03;
/// Token table declaration (not a visible child).
pub const TAG_TOKEN_TABLE: u8 = 0x04;
/// Default content id declaration (not a visible child).
pub const TAG_DEFAULT_CONTENT_ID: u8 = 0x05;
/// Default language declaration (attached but inert).
pub const TAG_DEFAULT_LANGUAGE: u8 = 0x06;

pub const TAG_SHORT_NAME: u8 = 0x10;
pub const TAG_MEDIUM_NAME: u8 = 0x11;
pub const TAG_LONG_NAME: u8 = 0x12;
pub const TAG_MEDIA_DESCRIPTION: u8 = 0x13;
pub const TAG_GENRE: u8 = 0x14;
pub const TAG_KEYWORDS: u8 = 0x16;
pub const TAG_MEMBER_OF: u8 = 0x17;
pub const TAG_LINK: u8 = 0x18;
pub const TAG_LOCATION: u8 = 0x19;
pub const TAG_SHORT_DESCRIPTION: u8 = 0x1A;
pub const TAG_LONG_DESCRIPTION: u8 = 0x1B;
pub const TAG_PROGRAMME: u8 = 0x1C;
pub const TAG_SCHEDULE: u8 = 0x21;
pub const TAG_SCOPE: u8 = 0x24;
pub const TAG_SERVICE_SCOPE: u8 = 0x25;
pub const TAG_ENSEMBLE: u8 = 0x26;
pub const TAG_FREQUENCY: u8 = 0x27;
pub const TAG_SERVICE: u8 = 0x28;
pub const TAG_SERVICE_ID: u8 = 0x29;
pub const TAG_MULTIMEDIA: u8 = 0x2B;
pub const TAG_TIME: u8 = 0x2C;
pub const TAG_BEARER: u8 = 0x2D;
pub const TAG_PROGRAMME_EVENT: u8 = 0x2E;
pub const TAG_RELATIVE_TIME: u8 = 0x2F;

/// Structural element tags occupy this range; 0x01 is reserved for cdata.
pub const MIN_ELEMENT_TAG: u8 = 0x02;
pub const MAX_ELEMENT_TAG: u8 = 0x30;

/// Attribute tags are local to their parent and occupy this range.
pub const MIN_ATTRIBUTE_TAG: u8 = 0x80;
pub const MAX_ATTRIBUTE_TAG: u8 = 0x87;

/// Escape byte introducing a 16-bit extended length.
pub const LEN_ESCAPE_U16: u8 = 0xFE;
/// Escape byte introducing a 24-bit extended length.
pub const LEN_ESCAPE_U24: u8 = 0xFF;

/// Largest payload a single-byte length can carry.
pub const MAX_DIRECT_LEN: usize = 253;
/// Hard ceiling of the 24-bit extended length form.
pub const MAX_PAYLOAD_LEN: usize = 1 << 24;

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("payload length {0} exceeds the 24-bit extended length ceiling")]
    PayloadTooLarge(usize),
    #[error("truncated frame: need {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Write `tag` + length prefix + `payload` into `out`.
/// The payload must already be padded to a byte boundary.
pub fn write_frame(out: &mut BitBuf, tag: u8, payload: &BitBuf) -> Result<(), FrameError> {
    debug_assert_eq!(payload.len() % 8, 0, "frame payload must be byte-aligned");
    let len = payload.byte_len();
    out.append_bytes(&[tag]);
    write_length(out, len)?;
    out.append(payload);
    Ok(())
}

/// Write only the length prefix for a payload of `len` bytes.
pub fn write_length(out: &mut BitBuf, len: usize) -> Result<(), FrameError> {
    if len <= MAX_DIRECT_LEN {
        out.append_bytes(&[len as u8]);
    } else if len <= 1 << 16 {
        out.append_bytes(&[LEN_ESCAPE_U16]);
        out.append_bytes(&(len as u16).to_be_bytes());
    } else if len <= MAX_PAYLOAD_LEN {
        out.append_bytes(&[LEN_ESCAPE_U24]);
        let be = (len as u32).to_be_bytes();
        out.append_bytes(&be[1..]);
    } else {
        return Err(FrameError::PayloadTooLarge(len));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// One parsed frame: tag, borrowed payload, and the offset just past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub tag: u8,
    pub payload: &'a [u8],
    pub end: usize,
}

/// Parse the frame starting at byte `offset` of `data`.
pub fn read_frame(data: &[u8], offset: usize) -> Result<Frame<'_>, FrameError> {
    let need = |at: usize, n: usize| -> Result<(), FrameError> {
        if at + n > data.len() {
            Err(FrameError::Truncated {
                offset: at,
                needed: at + n - data.len(),
            })
        } else {
            Ok(())
        }
    };

    need(offset, 2)?;
    let tag = data[offset];
    let mut pos = offset + 1;

    let len = match data[pos] {
        LEN_ESCAPE_U16 => {
            need(pos + 1, 2)?;
            let len = u16::from_be_bytes([data[pos + 1], data[pos + 2]]) as usize;
            pos += 3;
            // The u16 form covers 254..=65536; 65536 is carried as 0.
            if len == 0 { 1 << 16 } else { len }
        }
        LEN_ESCAPE_U24 => {
            need(pos + 1, 3)?;
            let len =
                u32::from_be_bytes([0, data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
            pos += 4;
            if len == 0 { 1 << 24 } else { len }
        }
        direct => {
            pos += 1;
            direct as usize
        }
    };

    need(pos, len)?;
    Ok(Frame {
        tag,
        payload: &data[pos..pos + len],
        end: pos + len,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
