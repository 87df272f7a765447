// Entity Models - the normalized input handed over by the parsing layer
//
// Each entity is a value object:
// - Never mutated by the audit engine
// - Identity across snapshots comes from a computed fingerprint, not a key

pub mod account;
pub mod report;

pub use account::{normalize_name, Account, FurnisherType, BALANCE_EPSILON};
pub use report::{
    Bureau, ConsumerIdentity, Inquiry, InquiryKind, NormalizedReport, PublicRecord,
    PublicRecordKind,
};
