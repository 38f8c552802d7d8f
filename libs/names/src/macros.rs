//! Macros for defining typed name types.

/// Macro to define a validated name type.
///
/// This generates a newtype wrapper around `String` with:
/// - `KIND`, `MIN_LEN` and `MAX_LEN` constants
/// - `parse()` which trims and validates
/// - `Display`, `FromStr`, `AsRef<str>` and `Borrow<str>` implementations
/// - `Serialize` and `Deserialize` implementations (deserialization validates)
/// - `Ord`, `Hash`, and other standard traits
///
/// # Example
///
/// ```ignore
/// define_name!(PodName, "Pod", 5, 20);
///
/// let pod: PodName = "cloud1".parse()?;
/// ```
#[macro_export]
macro_rules! define_name {
    ($name:ident, $kind:literal, $min:literal, $max:literal) => {
        /// A validated name for this entity kind.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// The entity kind, used in error messages.
            pub const KIND: &'static str = $kind;

            /// Minimum length in characters.
            pub const MIN_LEN: usize = $min;

            /// Maximum length in characters.
            pub const MAX_LEN: usize = $max;

            /// Parses and validates a name.
            ///
            /// Surrounding whitespace is trimmed before validation.
            pub fn parse(s: &str) -> Result<Self, $crate::NameError> {
                $crate::validate_name(Self::KIND, Self::MIN_LEN, Self::MAX_LEN, s).map(Self)
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the name and returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
