use alloc::format;
use alloc::string::{String, ToString};

use serde_json::{Number, Value};
use vc_schema::define::Scalar;
use vc_schema::error::DataError;

// -----------------------------------------------------------------------------
// JsonScalar

/// A JSON value that is neither an array nor an object.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonScalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl JsonScalar {
    fn describe(&self) -> &'static str {
        match self {
            JsonScalar::Null => "null",
            JsonScalar::Bool(_) => "a boolean",
            JsonScalar::Number(_) => "a number",
            JsonScalar::String(_) => "a string",
        }
    }

    fn expected(&self, what: &str) -> DataError {
        DataError::unexpected(format!("expected {what}, found {}", self.describe()))
    }
}

impl From<JsonScalar> for Value {
    fn from(scalar: JsonScalar) -> Self {
        match scalar {
            JsonScalar::Null => Value::Null,
            JsonScalar::Bool(value) => Value::Bool(value),
            JsonScalar::Number(value) => Value::Number(value),
            JsonScalar::String(value) => Value::String(value),
        }
    }
}

impl TryFrom<Value> for JsonScalar {
    type Error = DataError;

    fn try_from(value: Value) -> Result<Self, DataError> {
        match value {
            Value::Null => Ok(JsonScalar::Null),
            Value::Bool(value) => Ok(JsonScalar::Bool(value)),
            Value::Number(value) => Ok(JsonScalar::Number(value)),
            Value::String(value) => Ok(JsonScalar::String(value)),
            Value::Array(_) => Err(DataError::unexpected("expected a scalar, found an array")),
            Value::Object(_) => Err(DataError::unexpected("expected a scalar, found an object")),
        }
    }
}

// -----------------------------------------------------------------------------
// Scalars

macro_rules! integer_scalar {
    ($wide:ty, $as_wide:ident: $($ty:ty),*) => {$(
        impl Scalar<JsonScalar> for $ty {
            #[inline]
            fn to_native(&self) -> JsonScalar {
                JsonScalar::Number(Number::from(*self))
            }

            fn from_native(native: JsonScalar) -> Result<Self, DataError> {
                let JsonScalar::Number(number) = &native else {
                    return Err(native.expected("an integer"));
                };
                let wide: $wide = number.$as_wide().ok_or_else(|| {
                    DataError::conversion(format!("{number} is not an integer in range"))
                })?;
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

integer_scalar!(i64, as_i64: i8, i16, i32, i64);
integer_scalar!(u64, as_u64: u8, u16, u32, u64);

// NaN and the infinities have no JSON spelling; they are written as `null`,
// which reads back as NaN.
macro_rules! float_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar<JsonScalar> for $ty {
            fn to_native(&self) -> JsonScalar {
                Number::from_f64(f64::from(*self)).map_or(JsonScalar::Null, JsonScalar::Number)
            }

            fn from_native(native: JsonScalar) -> Result<Self, DataError> {
                match &native {
                    JsonScalar::Number(number) => number
                        .as_f64()
                        .map(|value| value as $ty)
                        .ok_or_else(|| DataError::conversion(format!("{number} is not a float"))),
                    JsonScalar::Null => Ok(<$ty>::NAN),
                    _ => Err(native.expected("a number")),
                }
            }
        }
    )*};
}

float_scalar!(f32, f64);

impl Scalar<JsonScalar> for bool {
    #[inline]
    fn to_native(&self) -> JsonScalar {
        JsonScalar::Bool(*self)
    }

    fn from_native(native: JsonScalar) -> Result<Self, DataError> {
        match native {
            JsonScalar::Bool(value) => Ok(value),
            other => Err(other.expected("a boolean")),
        }
    }
}

impl Scalar<JsonScalar> for char {
    fn to_native(&self) -> JsonScalar {
        JsonScalar::String(self.to_string())
    }

    fn from_native(native: JsonScalar) -> Result<Self, DataError> {
        let JsonScalar::String(text) = &native else {
            return Err(native.expected("a string"));
        };
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(value), None) => Ok(value),
            _ => Err(DataError::conversion(format!("{text:?} is not a single character"))),
        }
    }
}

impl Scalar<JsonScalar> for String {
    #[inline]
    fn to_native(&self) -> JsonScalar {
        JsonScalar::String(self.clone())
    }

    fn from_native(native: JsonScalar) -> Result<Self, DataError> {
        match native {
            JsonScalar::String(value) => Ok(value),
            other => Err(other.expected("a string")),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
