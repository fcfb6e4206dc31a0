use crate::climate::Command;

/// Birth/last-will topic of Home Assistant; not relative to the prefix.
pub const STATUS_TOPIC: &str = "homeassistant/status";

/// Topic layout under one discovery prefix
#[derive(Debug, Clone)]
pub struct Topics {
    prefix: String,
}

/// An inbound topic addressed to one of our devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTopic<'a> {
    pub component: &'a str,
    pub device: &'a str,
    pub command: &'a str,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix>/<component>/<device>`
    pub fn base(&self, component: &str, device: &str) -> String {
        format!("{}/{}/{}", self.prefix, component, device)
    }

    pub fn config(&self, component: &str, device: &str) -> String {
        format!("{}/config", self.base(component, device))
    }

    /// Discovery topic of an auxiliary entity (sensor, select) of a device
    pub fn entity_config(&self, component: &str, device: &str, suffix: &str) -> String {
        format!("{}/{}/{}_{}/config", self.prefix, component, device, suffix)
    }

    pub fn state(&self, component: &str, device: &str) -> String {
        format!("{}/state", self.base(component, device))
    }

    pub fn command(&self, component: &str, device: &str, command: Command) -> String {
        format!("{}/{}", self.base(component, device), command.suffix())
    }

    /// Split `<prefix>/<component>/<device>/<command>`.
    ///
    /// Returns `None` for topics outside the prefix or with fewer than four
    /// segments.
    pub fn parse<'a>(&self, topic: &'a str) -> Option<CommandTopic<'a>> {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.len() < 4 || parts[0] != self.prefix {
            return None;
        }

        Some(CommandTopic {
            component: parts[1],
            device: parts[2],
            command: parts[3],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        let topics = Topics::new("homeassistant");
        let device = "pcc_living_room_ac";

        let rendered = vec![
            topics.config("climate", device),
            topics.entity_config("sensor", device, "temperature_inside"),
            topics.entity_config("select", device, "nanoe"),
            topics.state("climate", device),
            topics.command("climate", device, Command::SwingHorizontal),
        ];

        insta::assert_debug_snapshot!(rendered, @r#"
        [
            "homeassistant/climate/pcc_living_room_ac/config",
            "homeassistant/sensor/pcc_living_room_ac_temperature_inside/config",
            "homeassistant/select/pcc_living_room_ac_nanoe/config",
            "homeassistant/climate/pcc_living_room_ac/state",
            "homeassistant/climate/pcc_living_room_ac/swing_h_cmd",
        ]
        "#);
    }

    #[test]
    fn test_parse() {
        let topics = Topics::new("ha");

        assert_eq!(
            topics.parse("ha/climate/pcc_den_ac/temp_cmd"),
            Some(CommandTopic {
                component: "climate",
                device: "pcc_den_ac",
                command: "temp_cmd",
            })
        );
        assert_eq!(topics.parse("ha/climate/pcc_den_ac"), None);
        assert_eq!(topics.parse("other/climate/pcc_den_ac/temp_cmd"), None);
        assert_eq!(topics.parse("hass/climate/pcc_den_ac/temp_cmd"), None);
        assert_eq!(topics.parse(STATUS_TOPIC), None);
    }
}
