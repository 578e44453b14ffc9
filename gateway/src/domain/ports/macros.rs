//! `define_port_error!`: port error enums that know their domain error code.
//!
//! Each variant names the [`ErrorCode`](crate::domain::ErrorCode) it surfaces
//! as, so every port error converts into a [`crate::domain::Error`] and
//! answers `is_retryable` the same way the domain error does.
//!
//! ```ignore
//! define_port_error! {
//!     pub enum PaymentError {
//!         Declined { reason: String } as Forbidden => "payment declined: {reason}",
//!         Unavailable { message: String } as ServiceUnavailable => "unavailable: {message}",
//!     }
//! }
//! ```

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )?
                    as $code:ident => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Domain error code this failure surfaces as.
            pub fn code(&self) -> $crate::domain::ErrorCode {
                match self {
                    $( Self::$variant { .. } => $crate::domain::ErrorCode::$code, )*
                }
            }

            /// Whether repeating the same call may succeed.
            pub fn is_retryable(&self) -> bool {
                $crate::domain::Error::from(self).is_retryable()
            }
        }

        impl From<&$name> for $crate::domain::Error {
            fn from(value: &$name) -> Self {
                Self::new(value.code(), value.to_string())
            }
        }
    };
}

pub(crate) use define_port_error;
