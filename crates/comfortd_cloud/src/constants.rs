//! Device enumerations and the raw codes the cloud uses for them.

use strum::EnumIter;
use strum::FromRepr;

/// Power state of the unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum Power {
    #[default]
    Off = 0,
    On = 1,
}

/// Operating mode of the unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum OperationMode {
    #[default]
    Auto = 0,
    Dry = 1,
    Cool = 2,
    Heat = 3,
    Fan = 4,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum FanSpeed {
    #[default]
    Auto = 0,
    Low = 1,
    LowMid = 2,
    Mid = 3,
    HighMid = 4,
    High = 5,
}

/// Vertical air swing position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum AirSwingUD {
    #[default]
    Auto = -1,
    Up = 0,
    Down = 1,
    Mid = 2,
    UpMid = 3,
    DownMid = 4,
}

/// Horizontal air swing position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum AirSwingLR {
    #[default]
    Auto = -1,
    Right = 0,
    Left = 1,
    Mid = 2,
    RightMid = 4,
    LeftMid = 5,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum EcoMode {
    #[default]
    Auto = 0,
    Powerful = 1,
    Quiet = 2,
}

/// nanoe air purifier mode. `Unavailable` is reported by units without one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, EnumIter, FromRepr)]
#[repr(i8)]
pub enum NanoeMode {
    Unavailable = 0,
    Off = 1,
    #[default]
    On = 2,
    ModeG = 3,
    All = 4,
}

/// Wire-level flag telling which swing axes run in automatic mode.
///
/// Only used when encoding and decoding requests; the rest of the system
/// sees `Auto` directly on [`AirSwingUD`] / [`AirSwingLR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i8)]
pub enum AirSwingAutoMode {
    Both = 0,
    Disabled = 1,
    AirSwingUD = 2,
    AirSwingLR = 3,
}

/// Conversion between an enumeration and its raw cloud code.
pub trait RawCode: Sized + Copy {
    fn from_code(code: i64) -> Option<Self>;
    fn code(self) -> i64;
}

macro_rules! raw_code {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RawCode for $ty {
                fn from_code(code: i64) -> Option<Self> {
                    i8::try_from(code).ok().and_then(Self::from_repr)
                }

                fn code(self) -> i64 {
                    i64::from(self as i8)
                }
            }
        )*
    };
}

raw_code!(
    Power,
    OperationMode,
    FanSpeed,
    AirSwingUD,
    AirSwingLR,
    EcoMode,
    NanoeMode,
    AirSwingAutoMode,
);
