// Binary EPG codec (ETSI TS 102 371).
//
// The wire format is a recursive tag/length/value framing carrying
// bit-packed attribute values. Submodules, bottom up:
//
//   bitbuf    - MSB-first bit packing and unpacking
//   frame     - tag + length-prefix framing
//   timepoint - MJD-based timestamps
//   contentid - DAB content identifiers
//   genre     - classification-scheme references
//   types     - (parent, attribute) typing tables
//   element   - encode-side element tree
//   encoder   - object graph -> bytes
//   decoder   - bytes -> object graph

pub mod bitbuf;
pub mod contentid;
pub mod decoder;
pub mod element;
pub mod encoder;
pub mod frame;
pub mod genre;
pub mod timepoint;
pub mod types;

pub use decoder::{Decoded, DecodeError, DecodeWarning, unmarshall};
pub use encoder::{EncodeError, marshall};
