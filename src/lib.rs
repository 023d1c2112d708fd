//! Dabepg: DAB EPG binary encoding/decoding (ETSI TS 102 371) in Rust.
//!
//! The crate provides:
//! - The EPG object graph (`model`): schedules, programmes, services, ensembles
//! - The binary TLV codec (`binary`): bit-packed wire format encode/decode
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use dabepg::binary;
//! use dabepg::model::{Document, Epg, Programme, Schedule};
//!
//! let mut schedule = Schedule::default();
//! schedule.programmes.push(Programme::new(21480).unwrap());
//!
//! let bytes = binary::marshall(&Document::Epg(Epg::new(schedule))).unwrap();
//! let decoded = binary::unmarshall(&bytes).unwrap();
//! assert!(matches!(decoded.document, Document::Epg(_)));
//! ```

pub mod binary;
pub mod model;

#[cfg(feature = "cli")]
pub mod cli;
