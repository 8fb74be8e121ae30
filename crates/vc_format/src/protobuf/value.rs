use alloc::format;
use alloc::string::String;

use bytes::Bytes;
use prost::encoding::WireType;
use vc_schema::define::Scalar;
use vc_schema::error::DataError;

// -----------------------------------------------------------------------------
// WireValue

/// One field payload, as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(Bytes),
}

impl WireValue {
    #[inline]
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::Varint(_) => WireType::Varint,
            WireValue::Fixed64(_) => WireType::SixtyFourBit,
            WireValue::Fixed32(_) => WireType::ThirtyTwoBit,
            WireValue::Bytes(_) => WireType::LengthDelimited,
        }
    }

    fn expected(&self, what: &str) -> DataError {
        DataError::unexpected(format!(
            "expected {what}, found wire type {:?}",
            self.wire_type()
        ))
    }

    fn varint(self) -> Result<u64, DataError> {
        match self {
            WireValue::Varint(value) => Ok(value),
            other => Err(other.expected("a varint")),
        }
    }
}

#[inline]
fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

// -----------------------------------------------------------------------------
// Scalars

macro_rules! signed_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar<WireValue> for $ty {
            #[inline]
            fn to_native(&self) -> WireValue {
                WireValue::Varint(zigzag_encode(i64::from(*self)))
            }

            fn from_native(native: WireValue) -> Result<Self, DataError> {
                let wide = zigzag_decode(native.varint()?);
                <$ty>::try_from(wide).map_err(|_| {
                    DataError::conversion(format!(
                        "{wide} does not fit in {}",
                        core::any::type_name::<$ty>()
                    ))
                })
            }
        }
    )*};
}

signed_scalar!(i8, i16, i32, i64);

macro_rules! unsigned_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar<WireValue> for $ty {
            #[inline]
            fn to_native(&self) -> WireValue {
                WireValue::Varint(u64::from(*self))
            }

            fn from_native(native: WireValue) -> Result<Self, DataError> {
                let wide = native.varint()?;
                <$ty>::try_from(wide).map_err(|_| {
                    DataError::conversion(format!(
                        "{wide} does not fit in {}",
                        core::any::type_name::<$ty>()
                    ))
                })
            }
        }
    )*};
}

unsigned_scalar!(u8, u16, u32, u64);

impl Scalar<WireValue> for bool {
    #[inline]
    fn to_native(&self) -> WireValue {
        WireValue::Varint(u64::from(*self))
    }

    fn from_native(native: WireValue) -> Result<Self, DataError> {
        native.varint().map(|value| value != 0)
    }
}

impl Scalar<WireValue> for char {
    #[inline]
    fn to_native(&self) -> WireValue {
        WireValue::Varint(u64::from(u32::from(*self)))
    }

    fn from_native(native: WireValue) -> Result<Self, DataError> {
        let code = native.varint()?;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| DataError::conversion(format!("{code:#x} is not a unicode scalar")))
    }
}

impl Scalar<WireValue> for f32 {
    #[inline]
    fn to_native(&self) -> WireValue {
        WireValue::Fixed32(self.to_bits())
    }

    fn from_native(native: WireValue) -> Result<Self, DataError> {
        match native {
            WireValue::Fixed32(bits) => Ok(f32::from_bits(bits)),
            other => Err(other.expected("a 32-bit float")),
        }
    }
}

impl Scalar<WireValue> for f64 {
    #[inline]
    fn to_native(&self) -> WireValue {
        WireValue::Fixed64(self.to_bits())
    }

    fn from_native(native: WireValue) -> Result<Self, DataError> {
        match native {
            WireValue::Fixed64(bits) => Ok(f64::from_bits(bits)),
            other => Err(other.expected("a 64-bit float")),
        }
    }
}

impl Scalar<WireValue> for String {
    fn to_native(&self) -> WireValue {
        WireValue::Bytes(Bytes::copy_from_slice(self.as_bytes()))
    }

    fn from_native(native: WireValue) -> Result<Self, DataError> {
        match native {
            WireValue::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|err| DataError::conversion(format!("invalid UTF-8: {err}"))),
            other => Err(other.expected("a string")),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
