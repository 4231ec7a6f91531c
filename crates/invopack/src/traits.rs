//! Typed bridge between Rust structs and registry records

use crate::value::Record;
use crate::types::Result;

/// A Rust type that mirrors one declared schema.
///
/// The registry still owns the wire layout; implementors only move field values in and
/// out of a `Record`. Unmarked fields may be left out of `to_record`, they are filled
/// with defaults on decode.
pub trait Schema: Sized {
    /// Name of the declared schema.
    const NAME: &'static str;

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> Result<Self>;
}
