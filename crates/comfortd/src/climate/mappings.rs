//! Vocabulary shared with Home Assistant.
//!
//! Every enumeration the bridge exposes has a fixed set of string literals used
//! in command payloads, state payloads and discovery option lists.

use comfortd_cloud::constants::AirSwingLR;
use comfortd_cloud::constants::AirSwingUD;
use comfortd_cloud::constants::EcoMode;
use comfortd_cloud::constants::FanSpeed;
use comfortd_cloud::constants::NanoeMode;
use comfortd_cloud::constants::OperationMode;
use comfortd_cloud::constants::Power;

/// Bidirectional mapping between an enumeration and its external literals.
pub trait Vocabulary: Copy + PartialEq + 'static {
    /// `(literal, value)` pairs, in the order they are offered to Home Assistant.
    const TABLE: &'static [(&'static str, Self)];

    /// Literal reported for a value without a table entry.
    const FALLBACK: &'static str = "none";

    /// External literal for `self`. Never fails.
    fn to_literal(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, value)| *value == self)
            .map(|(literal, _)| *literal)
            .unwrap_or(Self::FALLBACK)
    }

    /// Parse an external literal. Returns `None` for anything not in the table.
    fn from_literal(literal: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(l, _)| *l == literal)
            .map(|(_, value)| *value)
    }

    /// All literals, for discovery option lists.
    fn literals() -> Vec<&'static str> {
        Self::TABLE.iter().map(|(literal, _)| *literal).collect()
    }
}

impl Vocabulary for OperationMode {
    const TABLE: &'static [(&'static str, Self)] = &[
        ("fan_only", OperationMode::Fan),
        ("heat", OperationMode::Heat),
        ("cool", OperationMode::Cool),
        ("dry", OperationMode::Dry),
        ("auto", OperationMode::Auto),
    ];
}

// Some literals are capitalised because Home Assistant has no translation for
// them and shows the raw literal in the UI.
impl Vocabulary for FanSpeed {
    const TABLE: &'static [(&'static str, Self)] = &[
        ("auto", FanSpeed::Auto),
        ("high", FanSpeed::High),
        ("Medium high", FanSpeed::HighMid),
        ("medium", FanSpeed::Mid),
        ("Medium low", FanSpeed::LowMid),
        ("low", FanSpeed::Low),
    ];
    const FALLBACK: &'static str = "";
}

impl Vocabulary for AirSwingUD {
    const TABLE: &'static [(&'static str, Self)] = &[
        ("on", AirSwingUD::Auto),
        ("Up", AirSwingUD::Up),
        ("Mid-up", AirSwingUD::UpMid),
        ("Middle", AirSwingUD::Mid),
        ("Mid-down", AirSwingUD::DownMid),
        ("All down", AirSwingUD::Down),
    ];
    const FALLBACK: &'static str = "";
}

impl Vocabulary for AirSwingLR {
    const TABLE: &'static [(&'static str, Self)] = &[
        ("on", AirSwingLR::Auto),
        ("Left", AirSwingLR::Left),
        ("Mid-left", AirSwingLR::LeftMid),
        ("Middle", AirSwingLR::Mid),
        ("Mid-right", AirSwingLR::RightMid),
        ("Right", AirSwingLR::Right),
    ];
    const FALLBACK: &'static str = "";
}

impl Vocabulary for EcoMode {
    const TABLE: &'static [(&'static str, Self)] = &[
        ("Auto", EcoMode::Auto),
        ("Powerful", EcoMode::Powerful),
        ("Quiet", EcoMode::Quiet),
    ];
}

impl Vocabulary for NanoeMode {
    const TABLE: &'static [(&'static str, Self)] = &[
        ("On", NanoeMode::On),
        ("Off", NanoeMode::Off),
        ("All", NanoeMode::All),
        ("ModeG", NanoeMode::ModeG),
        ("offline", NanoeMode::Unavailable),
    ];
}

impl Vocabulary for Power {
    const TABLE: &'static [(&'static str, Self)] =
        &[("on", Power::On), ("off", Power::Off)];
}
