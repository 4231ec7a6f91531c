//! # Schema Registry
//!
//! The registry is built once from every schema and enum declaration, validated as a
//! whole, and then shared read-only (`Arc<Registry>`) by all encoders and decoders.
//!
//! Building it:
//! 1. rejects duplicate names, unknown parents and ancestor cycles,
//! 2. derives each schema's wire layout (ancestor fields first, each level sorted by
//!    order index, unmarked fields left out),
//! 3. checks every field type refers to something declared,
//! 4. builds the class registry of every polymorphic family up front.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;

use tracing::debug;

use crate::class::Candidate;
use crate::class::ClassRegistry;
use crate::codec;
use crate::cursor::Cursor;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::schema::EnumDecl;
use crate::schema::FieldDescriptor;
use crate::schema::SchemaDecl;
use crate::schema::WireType;
use crate::traits::Schema;
use crate::types::DeclarationError;
use crate::types::Error;
use crate::types::Prim;
use crate::types::Result;
use crate::value::Record;
use crate::value::Value;

#[derive(Debug)]
struct SchemaEntry {
    decl: SchemaDecl,
    /// Strict ancestors, nearest first.
    ancestors: Vec<String>,
    /// Marshalled fields in wire order.
    descriptors: Vec<FieldDescriptor>,
    /// Every field of the chain, marked or not, root schema first.
    layout: Vec<(String, WireType)>,
    /// Fewest bytes any encoded value of the schema occupies.
    min_width: usize,
}

/// Collects declarations for `Registry::build`.
#[derive(Debug, Default, Clone)]
pub struct RegistryBuilder {
    schemas: Vec<SchemaDecl>,
    enums: Vec<EnumDecl>,
    families: Vec<String>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, decl: SchemaDecl) -> Self {
        self.schemas.push(decl);
        self
    }

    pub fn enumeration(mut self, decl: EnumDecl) -> Self {
        self.enums.push(decl);
        self
    }

    /// Declares a family root even if no field refers to it as an open type.
    pub fn family(mut self, root: impl Into<String>) -> Self {
        self.families.push(root.into());
        self
    }

    /// Appends everything declared in `other`.
    pub fn merge(mut self, other: RegistryBuilder) -> Self {
        self.schemas.extend(other.schemas);
        self.enums.extend(other.enums);
        self.families.extend(other.families);
        self
    }

    pub fn build(self) -> std::result::Result<Registry, DeclarationError> {
        Registry::build(self.schemas, self.enums, self.families)
    }
}

/// Validated, immutable schema metadata.
#[derive(Debug)]
pub struct Registry {
    schemas: HashMap<String, SchemaEntry>,
    enums: HashMap<String, EnumDecl>,
    families: HashMap<String, ClassRegistry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn build(
        schemas: Vec<SchemaDecl>,
        enums: Vec<EnumDecl>,
        families: Vec<String>,
    ) -> std::result::Result<Self, DeclarationError> {
        let mut order: Vec<String> = Vec::with_capacity(schemas.len());
        let mut decls: HashMap<String, SchemaDecl> = HashMap::with_capacity(schemas.len());
        for decl in schemas {
            if decls.contains_key(&decl.name) {
                return Err(DeclarationError::DuplicateSchema(decl.name));
            }
            if decl.class_id.is_some_and(|id| id.is_absent()) {
                return Err(DeclarationError::ReservedClassId { schema: decl.name });
            }
            order.push(decl.name.clone());
            decls.insert(decl.name.clone(), decl);
        }

        let mut enum_map: HashMap<String, EnumDecl> = HashMap::with_capacity(enums.len());
        for decl in enums {
            if enum_map.contains_key(&decl.name) {
                return Err(DeclarationError::DuplicateEnum(decl.name));
            }
            validate_enum(&decl)?;
            enum_map.insert(decl.name.clone(), decl);
        }

        let mut chains: HashMap<String, Vec<String>> = HashMap::with_capacity(order.len());
        for name in &order {
            chains.insert(name.clone(), ancestor_chain(&decls, name)?);
        }

        let mut layouts: HashMap<String, (Vec<FieldDescriptor>, Vec<(String, WireType)>)> =
            HashMap::with_capacity(order.len());
        for name in &order {
            let mut descriptors = Vec::new();
            let mut layout = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            let levels = chains[name]
                .iter()
                .rev()
                .map(String::as_str)
                .chain(std::iter::once(name.as_str()));
            for level in levels {
                let decl = &decls[level];
                for field in &decl.fields {
                    if !seen.insert(field.name.as_str()) {
                        return Err(DeclarationError::DuplicateField {
                            schema: name.clone(),
                            field: field.name.clone(),
                        });
                    }
                    check_references(&decls, &enum_map, &decl.name, &field.name, &field.wire)?;
                    layout.push((field.name.clone(), field.wire.clone()));
                }
                descriptors.extend(level_descriptors(decl)?);
            }
            layouts.insert(name.clone(), (descriptors, layout));
        }

        check_closed_cycles(&order, &layouts)?;
        let mut widths = min_widths(&order, &layouts, &enum_map);
        check_container_elements(&order, &layouts, &widths, &enum_map)?;

        let mut roots: BTreeSet<String> = BTreeSet::new();
        for root in families {
            if !decls.contains_key(&root) {
                return Err(DeclarationError::UnknownFamily(root));
            }
            roots.insert(root);
        }
        for (_, layout) in layouts.values() {
            for (_, wire) in layout {
                collect_open_roots(wire, &mut roots);
            }
        }

        let mut family_map = HashMap::with_capacity(roots.len());
        for root in roots {
            let candidates = order.iter().map(|name| Candidate {
                name: name.as_str(),
                ancestors: chains[name].as_slice(),
                class_id: decls[name].class_id,
                is_abstract: decls[name].is_abstract,
            });
            let registry = ClassRegistry::build(&root, candidates)?;
            debug!(family = %root, members = registry.len(), "class registry built");
            family_map.insert(root, registry);
        }

        let mut entries = HashMap::with_capacity(order.len());
        for name in order {
            let (Some(decl), Some(ancestors), Some((descriptors, layout))) =
                (decls.remove(&name), chains.remove(&name), layouts.remove(&name))
            else {
                continue;
            };
            let min_width = widths.remove(&name).unwrap_or(0);
            entries.insert(
                name,
                SchemaEntry {
                    decl,
                    ancestors,
                    descriptors,
                    layout,
                    min_width,
                },
            );
        }

        debug!(
            schemas = entries.len(),
            enums = enum_map.len(),
            families = family_map.len(),
            "schema registry built"
        );

        Ok(Self {
            schemas: entries,
            enums: enum_map,
            families: family_map,
        })
    }

    fn entry(&self, name: &str) -> Result<&SchemaEntry> {
        self.schemas
            .get(name)
            .ok_or_else(|| Error::UnsupportedType(format!("undeclared schema '{}'", name)))
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaDecl> {
        self.schemas.get(name).map(|e| &e.decl)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDecl> {
        self.enums.get(name)
    }

    /// The marshalled fields of `name` in wire order, inherited fields first.
    pub fn descriptors_for(&self, name: &str) -> Result<&[FieldDescriptor]> {
        Ok(&self.entry(name)?.descriptors)
    }

    /// Fewest bytes a value of `wire` can occupy. Containers decode no more elements
    /// than the remaining input could hold at this width.
    pub fn min_width(&self, wire: &WireType) -> Result<usize> {
        Ok(match wire {
            WireType::Closed(schema) => self.entry(schema)?.min_width,
            WireType::Enum(name) => self
                .enumeration(name)
                .and_then(|decl| decl.backing.width())
                .ok_or_else(|| Error::UnsupportedType(wire.to_string()))?,
            other => fixed_min_width(other).unwrap_or(0),
        })
    }

    /// Strict ancestors of `name`, nearest first.
    pub fn ancestors(&self, name: &str) -> Option<&[String]> {
        self.schemas.get(name).map(|e| e.ancestors.as_slice())
    }

    /// Whether `name` is `ancestor` or descends from it.
    pub fn is_subtype(&self, name: &str, ancestor: &str) -> bool {
        name == ancestor
            || self
                .ancestors(name)
                .is_some_and(|chain| chain.iter().any(|a| a == ancestor))
    }

    pub fn family(&self, root: &str) -> Option<&ClassRegistry> {
        self.families.get(root)
    }

    pub fn families(&self) -> impl Iterator<Item = &ClassRegistry> {
        self.families.values()
    }

    /// A fresh instance of `name` with every field, marked or not, defaulted.
    pub fn blank(&self, name: &str) -> Result<Record> {
        let entry = self.entry(name)?;
        let mut record = Record::new(name);
        for (field, wire) in &entry.layout {
            record.set(field.clone(), self.blank_value(wire)?);
        }
        Ok(record)
    }

    /// The default of a declared type: zero, empty string, blank record, absent object,
    /// or empty container.
    pub fn blank_value(&self, wire: &WireType) -> Result<Value> {
        Ok(match wire {
            WireType::Primitive(p) => match p {
                Prim::I32 => Value::I32(0),
                Prim::U32 => Value::U32(0),
                Prim::I16 => Value::I16(0),
                Prim::U16 => Value::U16(0),
                Prim::Char => Value::Char('\0'),
                Prim::Byte => Value::Byte(0),
                Prim::Bool => Value::Bool(false),
                Prim::F32 => Value::F32(0.0),
                Prim::F64 => Value::F64(0.0),
                Prim::Str => Value::Str(String::new()),
            },
            WireType::Enum(name) => {
                let decl = self
                    .enumeration(name)
                    .ok_or_else(|| Error::UnsupportedType(wire.to_string()))?;
                Value::Enum(decl.default_value())
            }
            WireType::Closed(schema) => Value::Record(self.blank(schema)?),
            WireType::Open(_) => Value::Object(None),
            WireType::Seq(_) => Value::Seq(Vec::new()),
            WireType::Map(_, _) => Value::Map(Vec::new()),
        })
    }

    /// Marshals a record into a fresh buffer.
    pub fn marshal(&self, record: &Record) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        codec::marshal_record(self, &mut enc, record)?;
        Ok(enc.into_bytes())
    }

    pub fn unmarshal(&self, schema: &str, dec: &mut Decoder<'_>) -> Result<Record> {
        codec::unmarshal_record(self, dec, schema)
    }

    /// Unmarshals one `schema` value starting at `*offset` and advances the offset past
    /// it. On failure the offset is left alone.
    pub fn unmarshal_at(&self, schema: &str, bytes: &[u8], offset: &mut usize) -> Result<Record> {
        let mut cursor = Cursor::new(bytes);
        cursor.set_pos(*offset)?;
        let mut dec = Decoder::with_cursor(cursor);
        let record = codec::unmarshal_record(self, &mut dec, schema)?;
        *offset = dec.pos();
        Ok(record)
    }

    pub fn encode<T: Schema>(&self, value: &T) -> Result<Vec<u8>> {
        self.marshal(&value.to_record())
    }

    pub fn encode_into<T: Schema>(&self, enc: &mut Encoder, value: &T) -> Result<()> {
        codec::marshal_record(self, enc, &value.to_record())
    }

    pub fn decode<T: Schema>(&self, dec: &mut Decoder<'_>) -> Result<T> {
        T::from_record(codec::unmarshal_record(self, dec, T::NAME)?)
    }
}

fn validate_enum(decl: &EnumDecl) -> std::result::Result<(), DeclarationError> {
    let Some((min, max)) = decl.backing.integer_range() else {
        return Err(DeclarationError::InvalidEnumBacking {
            name: decl.name.clone(),
            backing: decl.backing,
        });
    };
    let mut seen = HashSet::new();
    for (variant, value) in &decl.variants {
        if *value < min || *value > max {
            return Err(DeclarationError::EnumValueOutOfRange {
                name: decl.name.clone(),
                variant: variant.clone(),
                value: *value,
            });
        }
        if !seen.insert(*value) {
            return Err(DeclarationError::DuplicateEnumValue {
                name: decl.name.clone(),
                value: *value,
            });
        }
    }
    Ok(())
}

fn ancestor_chain(
    decls: &HashMap<String, SchemaDecl>,
    name: &str,
) -> std::result::Result<Vec<String>, DeclarationError> {
    let mut chain = Vec::new();
    let mut current = &decls[name];
    while let Some(parent) = &current.parent {
        if parent == name || chain.contains(parent) {
            return Err(DeclarationError::AncestorCycle(name.to_owned()));
        }
        current = decls.get(parent).ok_or_else(|| DeclarationError::UnknownParent {
            schema: current.name.clone(),
            parent: parent.clone(),
        })?;
        chain.push(parent.clone());
    }
    Ok(chain)
}

/// Marked fields declared directly on `decl`, sorted by order index.
fn level_descriptors(decl: &SchemaDecl) -> std::result::Result<Vec<FieldDescriptor>, DeclarationError> {
    let mut marked = Vec::new();
    for field in &decl.fields {
        match field.orders.as_slice() {
            [] => {}
            [order] => marked.push(FieldDescriptor {
                name: field.name.clone(),
                wire: field.wire.clone(),
                order: *order,
                owner: decl.name.clone(),
            }),
            many => {
                return Err(DeclarationError::MultipleOrders {
                    schema: decl.name.clone(),
                    field: field.name.clone(),
                    count: many.len(),
                })
            }
        }
    }
    marked.sort_by_key(|d| d.order);
    for pair in marked.windows(2) {
        if pair[0].order == pair[1].order {
            return Err(DeclarationError::DuplicateOrder {
                schema: decl.name.clone(),
                field: pair[1].name.clone(),
                order: pair[1].order,
            });
        }
    }
    Ok(marked)
}

fn check_references(
    decls: &HashMap<String, SchemaDecl>,
    enums: &HashMap<String, EnumDecl>,
    schema: &str,
    field: &str,
    wire: &WireType,
) -> std::result::Result<(), DeclarationError> {
    match wire {
        WireType::Primitive(_) => Ok(()),
        WireType::Enum(target) if enums.contains_key(target) => Ok(()),
        WireType::Enum(target) => Err(DeclarationError::UnknownEnum {
            schema: schema.to_owned(),
            field: field.to_owned(),
            target: target.clone(),
        }),
        WireType::Closed(target) | WireType::Open(target) if decls.contains_key(target) => Ok(()),
        WireType::Closed(target) | WireType::Open(target) => Err(DeclarationError::UnknownSchema {
            schema: schema.to_owned(),
            field: field.to_owned(),
            target: target.clone(),
        }),
        WireType::Seq(inner) => check_references(decls, enums, schema, field, inner),
        WireType::Map(k, v) => {
            check_references(decls, enums, schema, field, k)?;
            check_references(decls, enums, schema, field, v)
        }
    }
}

/// Rejects schemas that contain themselves through a chain of closed fields. Closed
/// fields inside containers do not count: an empty container ends the chain.
fn check_closed_cycles(
    order: &[String],
    layouts: &HashMap<String, (Vec<FieldDescriptor>, Vec<(String, WireType)>)>,
) -> std::result::Result<(), DeclarationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        name: &'a str,
        layouts: &'a HashMap<String, (Vec<FieldDescriptor>, Vec<(String, WireType)>)>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> std::result::Result<(), DeclarationError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(DeclarationError::ClosedCycle(name.to_owned())),
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        if let Some((_, layout)) = layouts.get(name) {
            for (_, wire) in layout {
                if let WireType::Closed(target) = wire {
                    visit(target, layouts, marks)?;
                }
            }
        }
        marks.insert(name, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for name in order {
        visit(name, layouts, &mut marks)?;
    }
    Ok(())
}

/// Width of types that do not depend on other declarations: every length, count and
/// class id prefix is 4 bytes.
fn fixed_min_width(wire: &WireType) -> Option<usize> {
    match wire {
        WireType::Primitive(p) => Some(p.width().unwrap_or(4)),
        WireType::Open(_) | WireType::Seq(_) | WireType::Map(_, _) => Some(4),
        WireType::Enum(_) | WireType::Closed(_) => None,
    }
}

fn wire_min_width(wire: &WireType, widths: &HashMap<String, usize>, enums: &HashMap<String, EnumDecl>) -> usize {
    match wire {
        WireType::Closed(schema) => widths.get(schema).copied().unwrap_or(0),
        WireType::Enum(name) => enums.get(name).and_then(|d| d.backing.width()).unwrap_or(0),
        other => fixed_min_width(other).unwrap_or(0),
    }
}

/// Minimum encoded width of every schema. Closed nesting is acyclic at this point.
fn min_widths(
    order: &[String],
    layouts: &HashMap<String, (Vec<FieldDescriptor>, Vec<(String, WireType)>)>,
    enums: &HashMap<String, EnumDecl>,
) -> HashMap<String, usize> {
    fn visit(
        name: &str,
        layouts: &HashMap<String, (Vec<FieldDescriptor>, Vec<(String, WireType)>)>,
        enums: &HashMap<String, EnumDecl>,
        widths: &mut HashMap<String, usize>,
    ) -> usize {
        if let Some(width) = widths.get(name) {
            return *width;
        }
        let mut width = 0;
        if let Some((descriptors, _)) = layouts.get(name) {
            for desc in descriptors {
                if let WireType::Closed(target) = &desc.wire {
                    visit(target, layouts, enums, widths);
                }
                width += wire_min_width(&desc.wire, widths, enums);
            }
        }
        widths.insert(name.to_owned(), width);
        width
    }

    let mut widths = HashMap::with_capacity(order.len());
    for name in order {
        visit(name, layouts, enums, &mut widths);
    }
    widths
}

/// Rejects marshalled containers whose elements can be zero bytes wide.
fn check_container_elements(
    order: &[String],
    layouts: &HashMap<String, (Vec<FieldDescriptor>, Vec<(String, WireType)>)>,
    widths: &HashMap<String, usize>,
    enums: &HashMap<String, EnumDecl>,
) -> std::result::Result<(), DeclarationError> {
    fn check(
        wire: &WireType,
        widths: &HashMap<String, usize>,
        enums: &HashMap<String, EnumDecl>,
    ) -> bool {
        match wire {
            WireType::Seq(element) => {
                wire_min_width(element, widths, enums) > 0 && check(element, widths, enums)
            }
            WireType::Map(k, v) => {
                wire_min_width(k, widths, enums) + wire_min_width(v, widths, enums) > 0
                    && check(k, widths, enums)
                    && check(v, widths, enums)
            }
            _ => true,
        }
    }

    for name in order {
        let Some((descriptors, _)) = layouts.get(name) else {
            continue;
        };
        for desc in descriptors.iter().filter(|d| &d.owner == name) {
            if !check(&desc.wire, widths, enums) {
                return Err(DeclarationError::ZeroWidthElement {
                    schema: name.clone(),
                    field: desc.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn collect_open_roots(wire: &WireType, roots: &mut BTreeSet<String>) {
    match wire {
        WireType::Open(root) => {
            roots.insert(root.clone());
        }
        WireType::Seq(inner) => collect_open_roots(inner, roots),
        WireType::Map(k, v) => {
            collect_open_roots(k, roots);
            collect_open_roots(v, roots);
        }
        WireType::Primitive(_) | WireType::Enum(_) | WireType::Closed(_) => {}
    }
}
