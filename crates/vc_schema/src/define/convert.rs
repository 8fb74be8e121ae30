use alloc::sync::Arc;
use core::any::Any;
use core::fmt;

use super::access::mismatch;
use crate::error::DataError;

// -----------------------------------------------------------------------------
// Scalar

/// A leaf type with a direct mapping onto the native value `N` of a format.
///
/// Formats implement this for the primitive types they support. Types with a
/// `Scalar` implementation get [`Describe`](super::Describe) for free.
pub trait Scalar<N>: Sized {
    fn to_native(&self) -> N;

    fn from_native(native: N) -> Result<Self, DataError>;
}

// -----------------------------------------------------------------------------
// Converter

/// Converts a leaf value of type `T` to and from the native value `N`.
///
/// # Examples
///
/// ```
/// use vc_schema::define::Converter;
/// use vc_schema::error::DataError;
///
/// let celsius: Converter<f64, i64> = Converter::new(
///     |value: &f64| (*value * 10.0) as i64,
///     |native: i64| Ok(native as f64 / 10.0),
/// );
///
/// assert_eq!(celsius.to_native(&21.5), 215);
/// assert_eq!(celsius.from_native(-5).unwrap(), -0.5);
/// ```
pub struct Converter<T, N> {
    to: Arc<dyn Fn(&T) -> N + Send + Sync>,
    from: Arc<dyn Fn(N) -> Result<T, DataError> + Send + Sync>,
}

impl<T: 'static, N: 'static> Converter<T, N> {
    pub fn new(
        to: impl Fn(&T) -> N + Send + Sync + 'static,
        from: impl Fn(N) -> Result<T, DataError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }

    /// The converter of a [`Scalar`] type.
    pub fn scalar() -> Self
    where
        T: Scalar<N>,
    {
        Self::new(<T as Scalar<N>>::to_native, <T as Scalar<N>>::from_native)
    }

    /// Converts through the scalar type `U`, e.g. for newtypes.
    ///
    /// ```
    /// use vc_schema::define::{Converter, Scalar};
    /// use vc_schema::error::DataError;
    ///
    /// struct Text(String);
    ///
    /// impl Scalar<Text> for String {
    ///     fn to_native(&self) -> Text { Text(self.clone()) }
    ///     fn from_native(native: Text) -> Result<Self, DataError> { Ok(native.0) }
    /// }
    ///
    /// struct UserId(u64);
    ///
    /// let id: Converter<UserId, Text> = Converter::via(
    ///     |id: &UserId| id.0.to_string(),
    ///     |text: String| {
    ///         text.parse()
    ///             .map(UserId)
    ///             .map_err(|_| DataError::conversion("not a user id"))
    ///     },
    /// );
    ///
    /// assert_eq!(id.to_native(&UserId(7)).0, "7");
    /// assert_eq!(id.from_native(Text("12".into())).unwrap().0, 12);
    /// ```
    pub fn via<U: Scalar<N> + 'static>(
        to: impl Fn(&T) -> U + Send + Sync + 'static,
        from: impl Fn(U) -> Result<T, DataError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            move |value| to(value).to_native(),
            move |native| from(<U as Scalar<N>>::from_native(native)?),
        )
    }
}

impl<T, N> Converter<T, N> {
    #[inline]
    pub fn to_native(&self, value: &T) -> N {
        (self.to)(value)
    }

    #[inline]
    pub fn from_native(&self, native: N) -> Result<T, DataError> {
        (self.from)(native)
    }
}

impl<T, N> Clone for Converter<T, N> {
    fn clone(&self) -> Self {
        Self {
            to: Arc::clone(&self.to),
            from: Arc::clone(&self.from),
        }
    }
}

impl<T, N> fmt::Debug for Converter<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("value", &core::any::type_name::<T>())
            .field("native", &core::any::type_name::<N>())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Erased

/// A [`Converter`] behind `dyn Any`.
pub(crate) trait ErasedValue<N>: Send + Sync {
    fn to_native(&self, entity: &dyn Any) -> Result<N, DataError>;

    fn from_native(&self, native: N, slot: &mut dyn Any) -> Result<(), DataError>;
}

pub(crate) struct ValueBinding<T, N>(pub Converter<T, N>);

impl<T: 'static, N: 'static> ErasedValue<N> for ValueBinding<T, N> {
    fn to_native(&self, entity: &dyn Any) -> Result<N, DataError> {
        let value = entity.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
        Ok(self.0.to_native(value))
    }

    fn from_native(&self, native: N, slot: &mut dyn Any) -> Result<(), DataError> {
        let slot = slot.downcast_mut::<T>().ok_or_else(mismatch::<T>)?;
        *slot = self.0.from_native(native)?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Converter, ErasedValue, Scalar, ValueBinding};
    use crate::error::{DataError, DataErrorKind};

    struct Wide(i64);

    impl Scalar<Wide> for i32 {
        fn to_native(&self) -> Wide {
            Wide(i64::from(*self))
        }

        fn from_native(native: Wide) -> Result<Self, DataError> {
            i32::try_from(native.0).map_err(|_| DataError::conversion("out of range for i32"))
        }
    }

    #[test]
    fn scalar_converter() {
        let converter = Converter::<i32, Wide>::scalar();
        assert_eq!(converter.to_native(&-4).0, -4);
        assert_eq!(converter.from_native(Wide(9)).unwrap(), 9);

        let err = converter.from_native(Wide(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), DataErrorKind::Conversion);
    }

    #[test]
    fn binding_rejects_foreign_entities() {
        let binding = ValueBinding(Converter::<i32, Wide>::scalar());

        assert_eq!(binding.to_native(&3_i32).unwrap().0, 3);
        let err = binding.to_native(&3_u8).err().unwrap();
        assert_eq!(err.kind(), DataErrorKind::Internal);

        let mut slot = 0_i32;
        binding.from_native(Wide(11), &mut slot).unwrap();
        assert_eq!(slot, 11);
    }
}
