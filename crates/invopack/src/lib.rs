mod macros;

pub mod types;
pub mod encoder;
pub mod decoder;
pub mod cursor;
pub mod schema;
pub mod value;
pub mod class;
pub mod registry;
pub mod codec;
pub mod traits;

pub use types::Result;
pub use types::Error;
pub use types::DeclarationError;
pub use types::ClassId;
pub use types::Prim;
pub use types::ByteOrder;
pub use types::WIRE_ORDER;

pub use encoder::Encoder;
pub use decoder::Decoder;

pub use cursor::Cursor;
pub use cursor::StreamBuffer;

pub use schema::WireType;
pub use schema::SchemaDecl;
pub use schema::FieldDecl;
pub use schema::EnumDecl;
pub use schema::FieldDescriptor;

pub use value::Value;
pub use value::Record;

pub use class::ClassRegistry;

pub use registry::Registry;
pub use registry::RegistryBuilder;

pub use codec::marshal_field;
pub use codec::unmarshal_field;
pub use codec::marshal_record;
pub use codec::unmarshal_record;
pub use codec::MAX_RECURSION_DEPTH;

pub use traits::Schema;
