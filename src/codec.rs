//! Translation between the UI status vocabularies and the domain-language
//! codes the remote service stores. Each table is a fixed bijection;
//! `decode` tolerates unknown codes because historical rows may carry
//! values from older schema revisions, and refusing to decode them would
//! block rendering of otherwise valid data.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] =
        [AttendanceStatus::Present, AttendanceStatus::Absent, AttendanceStatus::Late];

    pub fn encode(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "presente",
            AttendanceStatus::Absent => "falta",
            AttendanceStatus::Late => "tardanza",
        }
    }

    /// Unrecognized codes decode to `Present` (the table default) after a
    /// soft-anomaly log; this never fails.
    pub fn decode(domain: &str) -> AttendanceStatus {
        match domain {
            "presente" => AttendanceStatus::Present,
            "falta" => AttendanceStatus::Absent,
            "tardanza" => AttendanceStatus::Late,
            other => {
                tracing::warn!(code = other, "unknown attendance status, using default");
                AttendanceStatus::default()
            }
        }
    }

    pub fn ui_code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }

    pub fn from_ui_code(ui: &str) -> Option<AttendanceStatus> {
        match ui {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl ParticipationLevel {
    pub const ALL: [ParticipationLevel; 3] =
        [ParticipationLevel::High, ParticipationLevel::Medium, ParticipationLevel::Low];

    pub fn encode(self) -> &'static str {
        match self {
            ParticipationLevel::High => "alta",
            ParticipationLevel::Medium => "media",
            ParticipationLevel::Low => "baja",
        }
    }

    /// Unrecognized codes decode to `Medium` (the table default) after a
    /// soft-anomaly log; this never fails.
    pub fn decode(domain: &str) -> ParticipationLevel {
        match domain {
            "alta" => ParticipationLevel::High,
            "media" => ParticipationLevel::Medium,
            "baja" => ParticipationLevel::Low,
            other => {
                tracing::warn!(code = other, "unknown participation level, using default");
                ParticipationLevel::default()
            }
        }
    }

    pub fn ui_code(self) -> &'static str {
        match self {
            ParticipationLevel::High => "high",
            ParticipationLevel::Medium => "medium",
            ParticipationLevel::Low => "low",
        }
    }

    pub fn from_ui_code(ui: &str) -> Option<ParticipationLevel> {
        match ui {
            "high" => Some(ParticipationLevel::High),
            "medium" => Some(ParticipationLevel::Medium),
            "low" => Some(ParticipationLevel::Low),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendance_round_trips_every_enumerant() {
        for s in AttendanceStatus::ALL {
            assert_eq!(AttendanceStatus::decode(s.encode()), s);
            assert_eq!(AttendanceStatus::from_ui_code(s.ui_code()), Some(s));
        }
    }

    #[test]
    fn participation_round_trips_every_enumerant() {
        for l in ParticipationLevel::ALL {
            assert_eq!(ParticipationLevel::decode(l.encode()), l);
            assert_eq!(ParticipationLevel::from_ui_code(l.ui_code()), Some(l));
        }
    }

    #[test]
    fn attendance_encode_table_matches_service_vocabulary() {
        assert_eq!(AttendanceStatus::Present.encode(), "presente");
        assert_eq!(AttendanceStatus::Absent.encode(), "falta");
        assert_eq!(AttendanceStatus::Late.encode(), "tardanza");
    }

    #[test]
    fn unknown_codes_fall_back_to_table_default() {
        assert_eq!(AttendanceStatus::decode("justificada"), AttendanceStatus::Present);
        assert_eq!(ParticipationLevel::decode("regular"), ParticipationLevel::Medium);
        assert_eq!(AttendanceStatus::decode(""), AttendanceStatus::Present);
    }

    #[test]
    fn ui_codes_are_rejected_by_decode_only_via_default() {
        // "present" is a UI code, not a domain code; it must hit the fallback.
        assert_eq!(AttendanceStatus::decode("present"), AttendanceStatus::Present);
        assert_eq!(ParticipationLevel::decode("high"), ParticipationLevel::Medium);
    }
}
