//! Macros for defining closed string enumerations.

/// Macro to define a closed enumeration backed by fixed string tokens.
///
/// This generates a `Copy` enum with:
/// - An `ALL` constant listing every variant in declaration order
/// - `as_str()` returning the wire token
/// - `parse()` returning `None` for tokens outside the enumeration
/// - `Display` and `FromStr` implementations
///
/// # Example
///
/// ```ignore
/// define_tokens!(Enhancement {
///     Mcir => "mcir",
///     Therm => "therm",
/// });
///
/// assert_eq!(Enhancement::parse("mcir"), Some(Enhancement::Mcir));
/// ```
#[macro_export]
macro_rules! define_tokens {
    ($name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $(
                #[doc = concat!("`", $token, "`")]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in canonical order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the wire token for this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }

            /// Looks up a variant by its exact wire token.
            #[must_use]
            pub fn parse(token: &str) -> Option<Self> {
                match token {
                    $($token => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ImageKeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or_else(|| $crate::ImageKeyError::Enhancement(s.to_string()))
            }
        }
    };
}
