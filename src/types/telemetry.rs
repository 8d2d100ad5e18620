//! Telemetry data structures for medical-device failure prediction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device class, closed vocabulary.
///
/// The wire format carries the human-readable name ("Infusion Pump" etc.),
/// so decoding rejects unknown device classes up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "Infusion Pump")]
    InfusionPump,
    #[serde(rename = "Dialysis Machine")]
    DialysisMachine,
    #[serde(rename = "Anesthesia Machine")]
    AnesthesiaMachine,
    #[serde(rename = "Patient Ventilator")]
    PatientVentilator,
    #[serde(rename = "Ultrasound Machine")]
    UltrasoundMachine,
    #[serde(rename = "ECG Monitor")]
    EcgMonitor,
    #[serde(rename = "CT Scanner")]
    CtScanner,
    #[serde(rename = "Defibrillator")]
    Defibrillator,
}

impl DeviceType {
    /// All device classes, in feature-encoding order.
    ///
    /// The ordinal position of a class in this slice is the value fed to the
    /// classifier; reordering it invalidates the trained model.
    pub const ALL: [DeviceType; 8] = [
        DeviceType::InfusionPump,
        DeviceType::DialysisMachine,
        DeviceType::AnesthesiaMachine,
        DeviceType::PatientVentilator,
        DeviceType::UltrasoundMachine,
        DeviceType::EcgMonitor,
        DeviceType::CtScanner,
        DeviceType::Defibrillator,
    ];

    /// Wire/display name for this device class.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::InfusionPump => "Infusion Pump",
            DeviceType::DialysisMachine => "Dialysis Machine",
            DeviceType::AnesthesiaMachine => "Anesthesia Machine",
            DeviceType::PatientVentilator => "Patient Ventilator",
            DeviceType::UltrasoundMachine => "Ultrasound Machine",
            DeviceType::EcgMonitor => "ECG Monitor",
            DeviceType::CtScanner => "CT Scanner",
            DeviceType::Defibrillator => "Defibrillator",
        }
    }

    /// Ordinal used as the classifier's categorical encoding.
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|d| d == self).unwrap_or(0)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static fleet inventory: device model name to device class.
pub const DEVICE_MAPPING: [(&str, DeviceType); 24] = [
    ("Alaris GH", DeviceType::InfusionPump),
    ("Baxter AK 96", DeviceType::DialysisMachine),
    ("Baxter Flo-Gard", DeviceType::InfusionPump),
    ("Datex Ohmeda S5", DeviceType::AnesthesiaMachine),
    ("Drager Fabius Trio", DeviceType::AnesthesiaMachine),
    ("Drager V500", DeviceType::PatientVentilator),
    ("Fresenius 4008", DeviceType::DialysisMachine),
    ("GE Aisys", DeviceType::AnesthesiaMachine),
    ("GE Logiq E9", DeviceType::UltrasoundMachine),
    ("GE MAC 2000", DeviceType::EcgMonitor),
    ("GE Revolution", DeviceType::CtScanner),
    ("Hamilton G5", DeviceType::PatientVentilator),
    ("HeartStart FRx", DeviceType::Defibrillator),
    ("Lifepak 20", DeviceType::Defibrillator),
    ("NxStage System One", DeviceType::DialysisMachine),
    ("Philips EPIQ", DeviceType::UltrasoundMachine),
    ("Philips HeartStrart", DeviceType::Defibrillator),
    ("Philips Ingenuity", DeviceType::CtScanner),
    ("Phillips PageWriter", DeviceType::EcgMonitor),
    ("Puritan Bennett 980", DeviceType::PatientVentilator),
    ("Siemens Acuson", DeviceType::UltrasoundMachine),
    ("Siemens S2000", DeviceType::UltrasoundMachine),
    ("Smiths Medfusion", DeviceType::InfusionPump),
    ("Zoll R Series", DeviceType::Defibrillator),
];

/// Look up the device class for a device model name.
pub fn device_type_for(device_name: &str) -> Option<DeviceType> {
    DEVICE_MAPPING
        .iter()
        .find(|(name, _)| *name == device_name)
        .map(|(_, ty)| *ty)
}

/// Deployment locations, closed vocabulary (hospital + region).
///
/// The ordinal position is the classifier's categorical encoding for the
/// `Location` field, matching the training data.
pub const LOCATIONS: [&str; 40] = [
    "Hospital A - Central Region",
    "Hospital A - East Region",
    "Hospital A - North Region",
    "Hospital A - South Region",
    "Hospital A - West Region",
    "Hospital B - Central Region",
    "Hospital B - East Region",
    "Hospital B - North Region",
    "Hospital B - South Region",
    "Hospital B - West Region",
    "Hospital C - Central Region",
    "Hospital C - East Region",
    "Hospital C - North Region",
    "Hospital C - South Region",
    "Hospital C - West Region",
    "Hospital D - Central Region",
    "Hospital D - East Region",
    "Hospital D - North Region",
    "Hospital D - South Region",
    "Hospital D - West Region",
    "Hospital E - Central Region",
    "Hospital E - East Region",
    "Hospital E - North Region",
    "Hospital E - South Region",
    "Hospital E - West Region",
    "Hospital F - Central Region",
    "Hospital F - East Region",
    "Hospital F - North Region",
    "Hospital F - South Region",
    "Hospital F - West Region",
    "Hospital G - Central Region",
    "Hospital G - East Region",
    "Hospital G - North Region",
    "Hospital G - South Region",
    "Hospital G - West Region",
    "Hospital H - Central Region",
    "Hospital H - East Region",
    "Hospital H - North Region",
    "Hospital H - South Region",
    "Hospital H - West Region",
];

/// Ordinal encoding for a location, if it is in the known vocabulary.
pub fn location_ordinal(location: &str) -> Option<usize> {
    LOCATIONS.iter().position(|l| *l == location)
}

/// Climate-control flag as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimateControl {
    Yes,
    No,
}

impl ClimateControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateControl::Yes => "Yes",
            ClimateControl::No => "No",
        }
    }
}

impl fmt::Display for ClimateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One device telemetry reading, exactly the published wire schema.
///
/// Numeric fields are assumed finite and in plausible ranges on arrival;
/// the pipeline does not range-check them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(rename = "DeviceType")]
    pub device_type: DeviceType,

    #[serde(rename = "DeviceName")]
    pub device_name: String,

    /// Total powered-on hours
    #[serde(rename = "RuntimeHours")]
    pub runtime_hours: f64,

    /// Internal temperature, Celsius
    #[serde(rename = "TemperatureC")]
    pub temperature_c: f64,

    /// Operating pressure, kPa
    #[serde(rename = "PressureKPa")]
    pub pressure_kpa: f64,

    /// Chassis vibration, mm/s
    #[serde(rename = "VibrationMM_S")]
    pub vibration_mm_s: f64,

    /// Supply current draw, amperes
    #[serde(rename = "CurrentDrawA")]
    pub current_draw_a: f64,

    /// Sensor signal noise level
    #[serde(rename = "SignalNoiseLevel")]
    pub signal_noise_level: f64,

    #[serde(rename = "ClimateControl")]
    pub climate_control: ClimateControl,

    #[serde(rename = "HumidityPercent")]
    pub humidity_percent: f64,

    #[serde(rename = "Location")]
    pub location: String,

    #[serde(rename = "OperationalCycles")]
    pub operational_cycles: u32,

    #[serde(rename = "UserInteractionsPerDay")]
    pub user_interactions_per_day: f64,

    /// Last service date, `DD-MM-YYYY`
    #[serde(rename = "LastServiceDate")]
    pub last_service_date: String,

    #[serde(rename = "ApproxDeviceAgeYears")]
    pub approx_device_age_years: f64,

    #[serde(rename = "NumRepairs")]
    pub num_repairs: u32,

    #[serde(rename = "ErrorLogsCount")]
    pub error_logs_count: u32,
}

impl TelemetryRecord {
    /// Whether the declared device type matches the fleet inventory entry
    /// for this device name. Unknown device names pass.
    pub fn device_type_consistent(&self) -> bool {
        match device_type_for(&self.device_name) {
            Some(expected) => expected == self.device_type,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "DeviceType": "Infusion Pump",
            "DeviceName": "Alaris GH",
            "RuntimeHours": 5230.5,
            "TemperatureC": 27.3,
            "PressureKPa": 101.2,
            "VibrationMM_S": 0.42,
            "CurrentDrawA": 0.87,
            "SignalNoiseLevel": 2.1,
            "ClimateControl": "Yes",
            "HumidityPercent": 45.0,
            "Location": "Hospital B - East Region",
            "OperationalCycles": 1042,
            "UserInteractionsPerDay": 12.5,
            "LastServiceDate": "14-03-2025",
            "ApproxDeviceAgeYears": 4.2,
            "NumRepairs": 3,
            "ErrorLogsCount": 7
        }"#
    }

    #[test]
    fn test_record_decodes_wire_schema() {
        let record: TelemetryRecord = serde_json::from_str(sample_json()).unwrap();

        assert_eq!(record.device_type, DeviceType::InfusionPump);
        assert_eq!(record.device_name, "Alaris GH");
        assert_eq!(record.climate_control, ClimateControl::Yes);
        assert_eq!(record.operational_cycles, 1042);
        assert!(record.device_type_consistent());
    }

    #[test]
    fn test_record_roundtrip_keeps_wire_names() {
        let record: TelemetryRecord = serde_json::from_str(sample_json()).unwrap();
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"DeviceType\":\"Infusion Pump\""));
        assert!(json.contains("\"VibrationMM_S\""));

        let back: TelemetryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.device_name, record.device_name);
        assert_eq!(back.location, record.location);
    }

    #[test]
    fn test_unknown_device_type_rejected() {
        let json = sample_json().replace("Infusion Pump", "Coffee Machine");
        assert!(serde_json::from_str::<TelemetryRecord>(&json).is_err());
    }

    #[test]
    fn test_device_mapping_lookup() {
        assert_eq!(device_type_for("Drager V500"), Some(DeviceType::PatientVentilator));
        assert_eq!(device_type_for("GE Revolution"), Some(DeviceType::CtScanner));
        assert_eq!(device_type_for("Unknown Device"), None);
    }

    #[test]
    fn test_inconsistent_device_type_detected() {
        let mut record: TelemetryRecord = serde_json::from_str(sample_json()).unwrap();
        record.device_name = "GE Revolution".to_string();
        assert!(!record.device_type_consistent());
    }

    #[test]
    fn test_location_ordinals_cover_vocabulary() {
        assert_eq!(location_ordinal("Hospital A - Central Region"), Some(0));
        assert_eq!(location_ordinal("Hospital H - West Region"), Some(39));
        assert_eq!(location_ordinal("Hospital Z - Moon Region"), None);
    }
}
