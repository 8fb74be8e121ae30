use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use vc_schema::define::Scalar;
use vc_schema::error::DataError;

/// The decoded text of one query string value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryValue(pub String);

impl QueryValue {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parse<T>(&self) -> Result<T, DataError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.0.parse().map_err(|err| {
            DataError::conversion(format!(
                "{:?} is not a valid {}: {err}",
                self.0,
                core::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Display for QueryValue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! parsed_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar<QueryValue> for $ty {
            #[inline]
            fn to_native(&self) -> QueryValue {
                QueryValue(self.to_string())
            }

            #[inline]
            fn from_native(native: QueryValue) -> Result<Self, DataError> {
                native.parse()
            }
        }
    )*};
}

parsed_scalar!(bool, char, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl Scalar<QueryValue> for String {
    #[inline]
    fn to_native(&self) -> QueryValue {
        QueryValue(self.clone())
    }

    #[inline]
    fn from_native(native: QueryValue) -> Result<Self, DataError> {
        Ok(native.0)
    }
}
