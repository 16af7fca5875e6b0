//! # Internal Macros
//!
//! ## bit_mask!
//!
//! Generates a `Copy` newtype over an unsigned integer with named flag
//! constants, set-style helpers and the bitwise operators. Used for the trace
//! and notify masks.
//!
//! ### Usage
//!
//! ```ignore
//! bit_mask! {
//!     /// Events a trace listens for.
//!     pub struct TraceMask(u8) {
//!         READ = 0x01,
//!         WRITE = 0x02,
//!     }
//! }
//!
//! let m = TraceMask::READ | TraceMask::WRITE;
//! assert!(m.contains(TraceMask::READ));
//! ```

macro_rules! bit_mask {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($repr:ty) {
            $($(#[$flag_meta:meta])* $flag:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($value);
            )*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn bits(&self) -> $repr {
                self.0
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            pub const fn contains(&self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn intersects(&self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub const fn intersection(&self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            pub const fn without(&self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}
