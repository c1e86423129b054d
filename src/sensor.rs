// Per-child views of the last poll, mirroring the two entities a home
// automation host would show: a text status sensor and a presence binary sensor.

use serde::Serialize;

use crate::agent::AgentState;
use crate::config::AgentConfig;
use crate::presence::Presence;

const ICON_PRESENT: &str = "mdi:school";
const ICON_ABSENT: &str = "mdi:school-outline";

/// Device grouping both sensors of one Famly account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
}

impl DeviceInfo {
    pub fn for_config(config: &AgentConfig) -> Self {
        Self {
            identifier: config.entry_id(),
            name: format!("Famly ({})", config.famly.email),
            manufacturer: "Famly",
        }
    }
}

/// Text sensor: "At childcare" / "Outside childcare"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildcareStatusSensor {
    pub child_id: String,
    pub name: String,
    pub unique_id: String,
    presence: Option<Presence>,
}

impl ChildcareStatusSensor {
    pub fn new(entry_id: &str, child_id: &str, child_name: &str, presence: Option<Presence>) -> Self {
        Self {
            child_id: child_id.to_string(),
            name: format!("Childcare Status {}", child_name),
            unique_id: format!("{}_{}", entry_id, child_id),
            presence,
        }
    }

    /// Only available when the last poll resolved this child
    pub fn available(&self) -> bool {
        self.presence.is_some()
    }

    /// `None` after a failed poll; shown as unavailable rather than "Outside childcare" on purpose
    pub fn state(&self) -> Option<&'static str> {
        self.presence.map(|p| p.as_str())
    }

    fn present(&self) -> bool {
        self.presence.map(|p| p.is_present()).unwrap_or(false)
    }

    pub fn icon(&self) -> &'static str {
        if self.present() { ICON_PRESENT } else { ICON_ABSENT }
    }

    /// Attributes dashboards can style on
    pub fn extra_state_attributes(&self) -> StatusAttributes {
        let present = self.present();
        StatusAttributes {
            childcare_present: present,
            icon_color: if present { "green" } else { "grey" },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusAttributes {
    pub childcare_present: bool,
    pub icon_color: &'static str,
}

/// Binary sensor: on while the child is at childcare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildcarePresenceSensor {
    pub child_id: String,
    pub name: String,
    pub unique_id: String,
    presence: Option<Presence>,
}

impl ChildcarePresenceSensor {
    pub const DEVICE_CLASS: &'static str = "presence";

    pub fn new(entry_id: &str, child_id: &str, child_name: &str, presence: Option<Presence>) -> Self {
        Self {
            child_id: child_id.to_string(),
            name: format!("Childcare Presence {}", child_name),
            unique_id: format!("{}_{}_presence", entry_id, child_id),
            presence,
        }
    }

    pub fn available(&self) -> bool {
        self.presence.is_some()
    }

    pub fn is_on(&self) -> bool {
        self.presence == Some(Presence::AtChildcare)
    }
}

/// Both sensors for one tracked child
#[derive(Debug, Clone)]
pub struct ChildSensors {
    pub child_name: String,
    pub status: ChildcareStatusSensor,
    pub presence: ChildcarePresenceSensor,
}

/// Flattened view for JSON output
#[derive(Debug, Serialize)]
pub struct ChildSensorView<'a> {
    pub child_id: &'a str,
    pub name: &'a str,
    pub available: bool,
    pub state: Option<&'static str>,
    pub present: bool,
    pub device_class: &'static str,
    pub icon: &'static str,
    pub attributes: StatusAttributes,
}

impl ChildSensors {
    pub fn view(&self) -> ChildSensorView<'_> {
        ChildSensorView {
            child_id: &self.status.child_id,
            name: &self.child_name,
            available: self.status.available() && self.presence.available(),
            state: self.status.state(),
            present: self.presence.is_on(),
            device_class: ChildcarePresenceSensor::DEVICE_CLASS,
            icon: self.status.icon(),
            attributes: self.status.extra_state_attributes(),
        }
    }
}

/// Sensors for every configured child, fed from the last poll (if any)
pub fn build_sensors(config: &AgentConfig, state: Option<&AgentState>) -> Vec<ChildSensors> {
    let entry_id = config.entry_id();

    config
        .children
        .iter()
        .map(|(child_id, child_name)| {
            let presence = state.and_then(|s| s.presence(child_id));
            ChildSensors {
                child_name: child_name.clone(),
                status: ChildcareStatusSensor::new(&entry_id, child_id, child_name, presence),
                presence: ChildcarePresenceSensor::new(&entry_id, child_id, child_name, presence),
            }
        })
        .collect()
}
