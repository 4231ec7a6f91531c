//! # Field Codec
//!
//! Dispatch on a field's declared type:
//! - primitives and enums go straight to the primitive codec,
//! - closed records are written as their fields with no tag,
//! - open records are written as a 4-byte class id, then their fields; id 0 is absent,
//! - sequences and maps are a 4-byte count followed by their elements.
//!
//! Nesting deeper than `MAX_RECURSION_DEPTH` aborts the call.

use std::collections::HashSet;

use tracing::debug;
use tracing::trace;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::registry::Registry;
use crate::schema::WireType;
use crate::types::ClassId;
use crate::types::Error;
use crate::types::Prim;
use crate::types::Result;
use crate::value::Record;
use crate::value::Value;

pub const MAX_RECURSION_DEPTH: usize = 64;

/// Appends `value` as a field of declared type `wire`. Nothing is appended on failure.
pub fn marshal_field(registry: &Registry, enc: &mut Encoder, value: &Value, wire: &WireType) -> Result<()> {
    let mark = enc.len();
    marshal_value(registry, enc, value, wire, 0).inspect_err(|_| enc.truncate(mark))
}

/// Appends the marshalled fields of `record`. Nothing is appended on failure.
pub fn marshal_record(registry: &Registry, enc: &mut Encoder, record: &Record) -> Result<()> {
    let mark = enc.len();
    marshal_record_at(registry, enc, record, 0).inspect_err(|_| enc.truncate(mark))
}

/// Reads one field of declared type `wire`.
pub fn unmarshal_field(registry: &Registry, dec: &mut Decoder<'_>, wire: &WireType) -> Result<Value> {
    unmarshal_value(registry, dec, wire, 0)
}

/// Reads a `schema` value into a blank instance, leaving its unmarked fields defaulted.
pub fn unmarshal_record(registry: &Registry, dec: &mut Decoder<'_>, schema: &str) -> Result<Record> {
    let mut record = registry.blank(schema)?;
    unmarshal_into(registry, dec, &mut record, 0)?;
    Ok(record)
}

fn marshal_record_at(registry: &Registry, enc: &mut Encoder, record: &Record, depth: usize) -> Result<()> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(Error::RecursionLimitExceeded);
    }
    for desc in registry.descriptors_for(record.schema())? {
        let value = record.get(&desc.name).unwrap_or(&Value::Null);
        if value.is_null() && !matches!(desc.wire, WireType::Open(_)) {
            return Err(Error::NotInitialized(format!("{}.{}", record.schema(), desc.name)));
        }
        marshal_value(registry, enc, value, &desc.wire, depth)?;
    }
    Ok(())
}

fn marshal_value(registry: &Registry, enc: &mut Encoder, value: &Value, wire: &WireType, depth: usize) -> Result<()> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(Error::RecursionLimitExceeded);
    }
    match wire {
        WireType::Primitive(p) => marshal_prim(enc, *p, value),
        WireType::Enum(name) => {
            let decl = registry
                .enumeration(name)
                .ok_or_else(|| Error::UnsupportedType(wire.to_string()))?;
            let discriminant = match value {
                Value::Enum(d) => *d,
                Value::Null => return Err(Error::NotInitialized(wire.to_string())),
                other => return Err(Error::mismatch(wire.to_string(), other.kind())),
            };
            write_integer(enc, decl.backing, discriminant, name)
        }
        WireType::Closed(schema) => match value {
            Value::Record(r) if r.schema() == schema => marshal_record_at(registry, enc, r, depth + 1),
            Value::Record(r) => Err(Error::mismatch(schema.as_str(), r.schema())),
            Value::Null => Err(Error::NotInitialized(schema.clone())),
            other => Err(Error::mismatch(schema.as_str(), other.kind())),
        },
        WireType::Open(root) => {
            let family = registry
                .family(root)
                .ok_or_else(|| Error::UnsupportedType(wire.to_string()))?;
            let record = match value {
                Value::Null | Value::Object(None) => {
                    enc.class_id(ClassId::ABSENT);
                    return Ok(());
                }
                Value::Object(Some(r)) => &**r,
                Value::Record(r) => r,
                other => return Err(Error::mismatch(wire.to_string(), other.kind())),
            };
            let id = family.class_of(record.schema()).ok_or_else(|| {
                Error::mismatch(format!("a registered member of family '{}'", root), record.schema())
            })?;
            trace!(family = %root, id = id.0, schema = record.schema(), "marshal open field");
            enc.class_id(id);
            marshal_record_at(registry, enc, record, depth + 1)
        }
        WireType::Seq(element) => match value {
            Value::Seq(items) => {
                enc.count(items.len())?;
                for item in items {
                    marshal_value(registry, enc, item, element, depth + 1)?;
                }
                Ok(())
            }
            Value::Null => Err(Error::NotInitialized(wire.to_string())),
            other => Err(Error::mismatch(wire.to_string(), other.kind())),
        },
        WireType::Map(key, val) => match value {
            Value::Map(pairs) => {
                enc.count(pairs.len())?;
                for (k, v) in pairs {
                    marshal_value(registry, enc, k, key, depth + 1)?;
                    marshal_value(registry, enc, v, val, depth + 1)?;
                }
                Ok(())
            }
            Value::Null => Err(Error::NotInitialized(wire.to_string())),
            other => Err(Error::mismatch(wire.to_string(), other.kind())),
        },
    }
}

fn marshal_prim(enc: &mut Encoder, prim: Prim, value: &Value) -> Result<()> {
    match (prim, value) {
        (Prim::I32, Value::I32(v)) => {
            enc.i32(*v);
        }
        (Prim::U32, Value::U32(v)) => {
            enc.u32(*v);
        }
        (Prim::I16, Value::I16(v)) => {
            enc.i16(*v);
        }
        (Prim::U16, Value::U16(v)) => {
            enc.u16(*v);
        }
        (Prim::Char, Value::Char(v)) => {
            enc.char(*v)?;
        }
        (Prim::Byte, Value::Byte(v)) => {
            enc.u8(*v);
        }
        (Prim::Bool, Value::Bool(v)) => {
            enc.bool(*v);
        }
        (Prim::F32, Value::F32(v)) => {
            enc.f32(*v);
        }
        (Prim::F64, Value::F64(v)) => {
            enc.f64(*v);
        }
        (Prim::Str, Value::Str(v)) => {
            enc.str(v)?;
        }
        (_, Value::Null) => return Err(Error::NotInitialized(prim.name().to_owned())),
        (_, other) => return Err(Error::mismatch(prim.name(), other.kind())),
    }
    Ok(())
}

fn write_integer(enc: &mut Encoder, backing: Prim, discriminant: i64, enum_name: &str) -> Result<()> {
    let fits = backing
        .integer_range()
        .is_some_and(|(min, max)| (min..=max).contains(&discriminant));
    if !fits {
        return Err(Error::mismatch(
            format!("{} discriminant within {}", enum_name, backing),
            discriminant.to_string(),
        ));
    }
    match backing {
        Prim::I32 => enc.i32(discriminant as i32),
        Prim::U32 => enc.u32(discriminant as u32),
        Prim::I16 => enc.i16(discriminant as i16),
        Prim::U16 => enc.u16(discriminant as u16),
        Prim::Byte => enc.u8(discriminant as u8),
        other => return Err(Error::UnsupportedType(format!("enum backed by {}", other))),
    };
    Ok(())
}

fn unmarshal_into(registry: &Registry, dec: &mut Decoder<'_>, record: &mut Record, depth: usize) -> Result<()> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(Error::RecursionLimitExceeded);
    }
    for desc in registry.descriptors_for(record.schema())? {
        let value = unmarshal_value(registry, dec, &desc.wire, depth)?;
        record.set(desc.name.as_str(), value);
    }
    Ok(())
}

fn unmarshal_value(registry: &Registry, dec: &mut Decoder<'_>, wire: &WireType, depth: usize) -> Result<Value> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(Error::RecursionLimitExceeded);
    }
    match wire {
        WireType::Primitive(p) => unmarshal_prim(dec, *p),
        WireType::Enum(name) => {
            let decl = registry
                .enumeration(name)
                .ok_or_else(|| Error::UnsupportedType(wire.to_string()))?;
            let discriminant = read_integer(dec, decl.backing)?;
            if decl.variant_name(discriminant).is_none() {
                return Err(Error::Malformed(format!(
                    "{} is not a declared discriminant of {}",
                    discriminant, name
                )));
            }
            Ok(Value::Enum(discriminant))
        }
        WireType::Closed(schema) => {
            let mut record = registry.blank(schema)?;
            unmarshal_into(registry, dec, &mut record, depth + 1)?;
            Ok(Value::Record(record))
        }
        WireType::Open(root) => {
            let family = registry
                .family(root)
                .ok_or_else(|| Error::UnsupportedType(wire.to_string()))?;
            let id = dec.class_id()?;
            if id.is_absent() {
                return Ok(Value::Object(None));
            }
            let Some(schema) = family.resolve(id) else {
                debug!(family = %root, id = id.0, "unknown class id");
                return Err(Error::UnknownClassId {
                    family: root.clone(),
                    id,
                });
            };
            trace!(family = %root, id = id.0, schema, "resolved open field");
            let mut record = registry.blank(schema)?;
            unmarshal_into(registry, dec, &mut record, depth + 1)?;
            Ok(Value::object(record))
        }
        WireType::Seq(element) => {
            let n = dec.count()?;
            check_count(dec, n, registry.min_width(element)?)?;
            let mut items = Vec::with_capacity(n);
            for _ in 0..n {
                items.push(unmarshal_value(registry, dec, element, depth + 1)?);
            }
            Ok(Value::Seq(items))
        }
        WireType::Map(key, val) => {
            let n = dec.count()?;
            check_count(dec, n, registry.min_width(key)? + registry.min_width(val)?)?;
            let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(n);
            // Keys compare by their encoded bytes.
            let mut seen: HashSet<&[u8]> = HashSet::with_capacity(n);
            for _ in 0..n {
                let start = dec.pos();
                let k = unmarshal_value(registry, dec, key, depth + 1)?;
                if !seen.insert(dec.cursor().span_from(start)) {
                    return Err(Error::Malformed(format!("duplicate {} key in {}", k.kind(), wire)));
                }
                let v = unmarshal_value(registry, dec, val, depth + 1)?;
                pairs.push((k, v));
            }
            Ok(Value::Map(pairs))
        }
    }
}

/// Fails with `Pending` when `n` elements of at least `width` bytes cannot fit in the
/// remaining input.
fn check_count(dec: &Decoder<'_>, n: usize, width: usize) -> Result<()> {
    let needed = n.saturating_mul(width.max(1));
    let remaining = dec.remaining();
    if needed > remaining {
        return Err(Error::Pending(needed - remaining));
    }
    Ok(())
}

fn unmarshal_prim(dec: &mut Decoder<'_>, prim: Prim) -> Result<Value> {
    Ok(match prim {
        Prim::I32 => Value::I32(dec.i32()?),
        Prim::U32 => Value::U32(dec.u32()?),
        Prim::I16 => Value::I16(dec.i16()?),
        Prim::U16 => Value::U16(dec.u16()?),
        Prim::Char => Value::Char(dec.char()?),
        Prim::Byte => Value::Byte(dec.u8()?),
        Prim::Bool => Value::Bool(dec.bool()?),
        Prim::F32 => Value::F32(dec.f32()?),
        Prim::F64 => Value::F64(dec.f64()?),
        Prim::Str => Value::Str(dec.str()?.to_owned()),
    })
}

fn read_integer(dec: &mut Decoder<'_>, backing: Prim) -> Result<i64> {
    Ok(match backing {
        Prim::I32 => dec.i32()? as i64,
        Prim::U32 => dec.u32()? as i64,
        Prim::I16 => dec.i16()? as i64,
        Prim::U16 => dec.u16()? as i64,
        Prim::Byte => dec.u8()? as i64,
        other => return Err(Error::UnsupportedType(format!("enum backed by {}", other))),
    })
}
