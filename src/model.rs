use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::codec::{AttendanceStatus, ParticipationLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Bimestre,
    Trimestre,
}

impl PeriodType {
    /// Highest period number the academic year admits for this type.
    pub fn max_number(self) -> u8 {
        match self {
            PeriodType::Bimestre => 4,
            PeriodType::Trimestre => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicPeriod {
    pub id: i64,
    pub period_type: PeriodType,
    pub number: u8,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AcademicPeriod {
    /// Structural sanity for payloads coming off the wire. Periods are
    /// created through the admin surface, so a bad one here means upstream
    /// drift; callers log and keep going rather than refuse the whole view.
    pub fn is_well_formed(&self) -> bool {
        self.start_date < self.end_date && self.number >= 1 && self.number <= self.period_type.max_number()
    }

    pub fn label(&self) -> String {
        let type_name = match self.period_type {
            PeriodType::Bimestre => "Bimestre",
            PeriodType::Trimestre => "Trimestre",
        };
        format!("{} {}", type_name, self.number)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeComponents {
    pub ser: f64,
    pub saber: f64,
    pub hacer: f64,
    pub decidir: f64,
    pub autoevaluacion: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeStatus {
    Approved,
    Failed,
}

/// One per-student grade row as served by `/grades/grades/by_class_and_period/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: i64,
    pub student: i64,
    #[serde(flatten)]
    pub components: GradeComponents,
    pub nota_total: f64,
    pub estado: GradeStatus,
}

/// One entry of a bulk grade save, before validation.
#[derive(Debug, Clone)]
pub struct GradeEntry {
    pub student_id: String,
    pub components: GradeComponents,
}

// ---- bulk write wire payloads (snake_case, domain-language codes) ----

#[derive(Debug, Clone, Serialize)]
pub struct GradeWriteRow {
    pub student_id: String,
    pub ser: f64,
    pub saber: f64,
    pub hacer: f64,
    pub decidir: f64,
    pub autoevaluacion: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkGradePayload {
    pub class_instance: i64,
    pub period: i64,
    pub grades: Vec<GradeWriteRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceWriteRow {
    pub student_id: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAttendancePayload {
    pub class_instance: i64,
    pub period: i64,
    pub date: NaiveDate,
    pub attendances: Vec<AttendanceWriteRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipationWriteRow {
    pub student_id: String,
    pub level: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkParticipationPayload {
    pub class_instance: i64,
    pub period: i64,
    pub date: NaiveDate,
    pub participations: Vec<ParticipationWriteRow>,
}

// ---- UI-side typed rows handed to the engine by the host ----

#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone)]
pub struct ParticipationEntry {
    pub student_id: String,
    pub level: ParticipationLevel,
}

// ---- session ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// Write operations are presented to staff only; students get the
    /// read-only statistics views.
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub user_type: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_number_bounds_follow_type() {
        assert_eq!(PeriodType::Bimestre.max_number(), 4);
        assert_eq!(PeriodType::Trimestre.max_number(), 3);
    }

    #[test]
    fn well_formedness_rejects_inverted_window_and_bad_number() {
        let mut p = AcademicPeriod {
            id: 1,
            period_type: PeriodType::Trimestre,
            number: 3,
            year: 2025,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        };
        assert!(p.is_well_formed());
        p.number = 4;
        assert!(!p.is_well_formed());
        p.number = 3;
        p.end_date = p.start_date;
        assert!(!p.is_well_formed());
    }

    #[test]
    fn grade_record_parses_wire_shape() {
        let raw = serde_json::json!({
            "id": 7,
            "student": 12,
            "ser": 4.0,
            "saber": 40.0,
            "hacer": 35.0,
            "decidir": 5.0,
            "autoevaluacion": 4.0,
            "nota_total": 88.0,
            "estado": "approved"
        });
        let rec: GradeRecord = serde_json::from_value(raw).expect("parse grade record");
        assert_eq!(rec.components.saber, 40.0);
        assert_eq!(rec.estado, GradeStatus::Approved);
    }
}
