//! Scalar families shared by the encoder and decoder.

/// Fixed-width scalars written whole in wire order.
/// Arguments passed to callback:
/// 1. Method Name
/// 2. Rust Type
/// 3. Width in bytes
macro_rules! for_each_fixed_scalar {
    ($m:ident) => {
        $m!(i32, i32, 4);
        $m!(u32, u32, 4);
        $m!(i16, i16, 2);
        $m!(u16, u16, 2);
        $m!(f32, f32, 4);
    };
}

/// Generates an infallible write for the Encoder.
macro_rules! encode_fixed {
    ($name:ident, $ty:ty, $size:expr) => {
        #[inline]
        pub fn $name(&mut self, v: $ty) -> &mut Self {
            match crate::types::WIRE_ORDER {
                crate::types::ByteOrder::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
                crate::types::ByteOrder::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            }
            self
        }
    };
}

/// Generates a bounds-checked read for the Decoder.
macro_rules! decode_fixed {
    ($name:ident, $ty:ty, $size:expr) => {
        #[inline]
        pub fn $name(&mut self) -> crate::types::Result<$ty> {
            let bytes = self.cursor.read_array::<$size>()?;
            Ok(match crate::types::WIRE_ORDER {
                crate::types::ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                crate::types::ByteOrder::Little => <$ty>::from_le_bytes(bytes),
            })
        }
    };
}

/// Copyable value variants and their payload types.
/// Arguments passed to callback:
/// 1. Accessor Name
/// 2. Value Variant
/// 3. Rust Type
macro_rules! for_each_copy_value {
    ($m:ident) => {
        $m!(as_i32, I32, i32);
        $m!(as_u32, U32, u32);
        $m!(as_i16, I16, i16);
        $m!(as_u16, U16, u16);
        $m!(as_char, Char, char);
        $m!(as_byte, Byte, u8);
        $m!(as_bool, Bool, bool);
        $m!(as_f32, F32, f32);
        $m!(as_f64, F64, f64);
    };
}

/// Generates a checked accessor and a `From` conversion for a copyable variant.
macro_rules! value_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        impl Value {
            pub fn $name(&self) -> crate::types::Result<$ty> {
                match self {
                    Value::$variant(v) => Ok(*v),
                    other => Err(crate::types::Error::mismatch(stringify!($ty), other.kind())),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

pub(crate) use for_each_fixed_scalar;
pub(crate) use for_each_copy_value;
pub(crate) use value_accessor;
pub(crate) use encode_fixed;
pub(crate) use decode_fixed;
