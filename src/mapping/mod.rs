//! Value mapping engine
//!
//! Everything needed to read and edit one value region:
//! - Decoder: spans to decoded text plus offset mapping
//! - OffsetIndex: gap table and bidirectional offset translation
//! - EditPlanner: decoded-coordinate edits to physical span edits
//! - ValueCache: revision-stamped decoded value
//! - Encoders: whole-value re-encoding policies
//! - XmlValue: the owning value with the consumer API

pub mod cache;
pub mod decoder;
pub mod encoder;
pub mod offsets;
pub mod planner;
pub mod value;

pub use cache::ValueCache;
pub use decoder::{DecodedValue, Decoder, Segment};
pub use encoder::{AttributeEncoder, CdataPolicy, Encoder, FnEncoder, TextEncoder};
pub use offsets::{Gap, OffsetIndex};
pub use planner::{EditOutcome, EditPlanner, Plan, SplitPlan};
pub use value::{ValueKind, XmlValue};
