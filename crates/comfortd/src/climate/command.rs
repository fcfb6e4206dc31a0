use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

/// Last segment of an inbound climate topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum Command {
    #[strum(serialize = "power_cmd")]
    Power,
    #[strum(serialize = "mode_cmd")]
    Mode,
    #[strum(serialize = "temp_cmd")]
    Temperature,
    #[strum(serialize = "fan_cmd")]
    Fan,
    #[strum(serialize = "swing_cmd")]
    Swing,
    #[strum(serialize = "swing_h_cmd")]
    SwingHorizontal,
    #[strum(serialize = "s_eco_cmd")]
    Eco,
    #[strum(serialize = "s_nanoe_cmd")]
    Nanoe,
    /// Our own discovery topic, echoed back by the broker.
    #[strum(serialize = "config")]
    Config,
    /// Our own state topic, echoed back by the broker.
    #[strum(serialize = "state")]
    State,
}

impl Command {
    /// Commands that change a device attribute and get a subscription.
    pub const CONTROLS: [Command; 8] = [
        Command::Power,
        Command::Mode,
        Command::Temperature,
        Command::Fan,
        Command::Swing,
        Command::SwingHorizontal,
        Command::Eco,
        Command::Nanoe,
    ];

    /// Topic suffix for this command.
    pub fn suffix(self) -> &'static str {
        self.into()
    }
}
