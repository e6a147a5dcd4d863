//! Grade-component validation and aggregation. The five component maxima
//! sum to exactly 100, so a tuple that passes per-field validation always
//! totals within [0, 100] by construction.

use thiserror::Error;

use crate::model::{GradeComponents, GradeStatus};

/// Domain constant: a period total at or above this is approved.
pub const APPROVAL_THRESHOLD: f64 = 51.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentField {
    Ser,
    Saber,
    Hacer,
    Decidir,
    Autoevaluacion,
}

impl ComponentField {
    pub const ALL: [ComponentField; 5] = [
        ComponentField::Ser,
        ComponentField::Saber,
        ComponentField::Hacer,
        ComponentField::Decidir,
        ComponentField::Autoevaluacion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentField::Ser => "ser",
            ComponentField::Saber => "saber",
            ComponentField::Hacer => "hacer",
            ComponentField::Decidir => "decidir",
            ComponentField::Autoevaluacion => "autoevaluacion",
        }
    }

    pub fn from_str(name: &str) -> Option<ComponentField> {
        match name {
            "ser" => Some(ComponentField::Ser),
            "saber" => Some(ComponentField::Saber),
            "hacer" => Some(ComponentField::Hacer),
            "decidir" => Some(ComponentField::Decidir),
            "autoevaluacion" => Some(ComponentField::Autoevaluacion),
            _ => None,
        }
    }

    pub fn max(self) -> f64 {
        match self {
            ComponentField::Ser => 5.0,
            ComponentField::Saber => 45.0,
            ComponentField::Hacer => 40.0,
            ComponentField::Decidir => 5.0,
            ComponentField::Autoevaluacion => 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: value must be between 0 and {max}, got {value}")]
pub struct RangeError {
    pub field: &'static str,
    pub max: f64,
    pub value: f64,
}

pub fn validate_component(field: ComponentField, value: f64) -> Result<(), RangeError> {
    // NaN and infinities are out of range, not silently comparable.
    if !value.is_finite() || value < 0.0 || value > field.max() {
        return Err(RangeError {
            field: field.as_str(),
            max: field.max(),
            value,
        });
    }
    Ok(())
}

pub fn validate_components(c: &GradeComponents) -> Result<(), RangeError> {
    validate_component(ComponentField::Ser, c.ser)?;
    validate_component(ComponentField::Saber, c.saber)?;
    validate_component(ComponentField::Hacer, c.hacer)?;
    validate_component(ComponentField::Decidir, c.decidir)?;
    validate_component(ComponentField::Autoevaluacion, c.autoevaluacion)?;
    Ok(())
}

pub fn compute_total(c: &GradeComponents) -> f64 {
    c.ser + c.saber + c.hacer + c.decidir + c.autoevaluacion
}

pub fn compute_status(total: f64) -> GradeStatus {
    if total >= APPROVAL_THRESHOLD {
        GradeStatus::Approved
    } else {
        GradeStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(ser: f64, saber: f64, hacer: f64, decidir: f64, auto: f64) -> GradeComponents {
        GradeComponents {
            ser,
            saber,
            hacer,
            decidir,
            autoevaluacion: auto,
        }
    }

    #[test]
    fn full_marks_total_one_hundred_and_approve() {
        let c = components(5.0, 45.0, 40.0, 5.0, 5.0);
        assert!(validate_components(&c).is_ok());
        let total = compute_total(&c);
        assert_eq!(total, 100.0);
        assert_eq!(compute_status(total), GradeStatus::Approved);
    }

    #[test]
    fn zero_marks_total_zero_and_fail() {
        let c = components(0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(validate_components(&c).is_ok());
        let total = compute_total(&c);
        assert_eq!(total, 0.0);
        assert_eq!(compute_status(total), GradeStatus::Failed);
    }

    #[test]
    fn approval_boundary_is_fifty_one() {
        assert_eq!(compute_status(51.0), GradeStatus::Approved);
        assert_eq!(compute_status(50.0), GradeStatus::Failed);
        assert_eq!(compute_status(50.9), GradeStatus::Failed);
    }

    #[test]
    fn saber_above_bound_is_rejected_naming_field_and_bound() {
        let err = validate_component(ComponentField::Saber, 50.0).unwrap_err();
        assert_eq!(err.field, "saber");
        assert_eq!(err.max, 45.0);
        assert!(err.to_string().contains("between 0 and 45"));
    }

    #[test]
    fn negative_and_non_finite_values_are_rejected() {
        assert!(validate_component(ComponentField::Ser, -0.5).is_err());
        assert!(validate_component(ComponentField::Hacer, f64::NAN).is_err());
        assert!(validate_component(ComponentField::Decidir, f64::INFINITY).is_err());
    }

    #[test]
    fn bounds_at_the_edge_are_accepted() {
        for f in ComponentField::ALL {
            assert!(validate_component(f, 0.0).is_ok());
            assert!(validate_component(f, f.max()).is_ok());
        }
    }

    #[test]
    fn in_bound_tuples_always_total_within_range() {
        // Per-field maxima sum to 100; spot-check a mixed tuple.
        let c = components(3.5, 22.0, 31.0, 1.0, 4.5);
        assert!(validate_components(&c).is_ok());
        let total = compute_total(&c);
        assert!((0.0..=100.0).contains(&total));
        assert_eq!(total, 62.0);
    }
}
