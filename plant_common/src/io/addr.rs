//! Typed I/O addresses.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! io_address {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u16);

        impl $name {
            /// Raw address value.
            #[inline]
            pub const fn raw(self) -> u16 {
                self.0
            }

            /// Address as a slice index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

io_address!(
    /// Address of a boolean sensor (read-only coil).
    SensorAddr,
    "S"
);

io_address!(
    /// Address of a boolean actuator.
    ActuatorAddr,
    "A"
);

io_address!(
    /// Address of a 16-bit holding register.
    RegisterAddr,
    "R"
);

impl SensorAddr {
    /// Read this sensor out of a scan snapshot.
    ///
    /// Addresses beyond the snapshot read as `false`.
    #[inline]
    pub fn read(self, snapshot: &[bool]) -> bool {
        snapshot.get(self.index()).copied().unwrap_or(false)
    }
}
