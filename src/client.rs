//! Remote-service boundary. `AcademicClient` is the injected interface the
//! engine talks through, so the reconciler and handlers can run against a
//! fake in tests; `HttpAcademicClient` is the production implementation
//! carrying the bearer session token on every request.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::model::{BulkAttendancePayload, BulkGradePayload, BulkParticipationPayload};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

pub trait AcademicClient {
    fn class_detail(&self, class_id: i64) -> Result<serde_json::Value, ClientError>;

    fn bulk_save_grades(&self, payload: &BulkGradePayload) -> Result<serde_json::Value, ClientError>;
    fn grades_by_class_and_period(
        &self,
        class_id: i64,
        period_id: i64,
    ) -> Result<serde_json::Value, ClientError>;
    fn grade_stats(&self, class_id: i64, period_id: Option<i64>) -> Result<serde_json::Value, ClientError>;
    fn final_grades_by_class(&self, class_id: i64) -> Result<serde_json::Value, ClientError>;

    fn bulk_save_attendance(
        &self,
        payload: &BulkAttendancePayload,
    ) -> Result<serde_json::Value, ClientError>;
    fn attendances_by_class_and_period(
        &self,
        class_id: i64,
        period_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<serde_json::Value, ClientError>;
    fn attendance_stats(&self, class_id: i64, period_id: Option<i64>)
        -> Result<serde_json::Value, ClientError>;

    fn bulk_save_participation(
        &self,
        payload: &BulkParticipationPayload,
    ) -> Result<serde_json::Value, ClientError>;
    fn participations_by_class_and_period(
        &self,
        class_id: i64,
        period_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<serde_json::Value, ClientError>;
    fn participation_stats(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError>;

    fn predictions_by_class(&self, class_id: i64) -> Result<serde_json::Value, ClientError>;
    fn prediction_history_by_class(&self, class_id: i64) -> Result<serde_json::Value, ClientError>;
    fn prediction_comparison_stats(&self, class_id: i64) -> Result<serde_json::Value, ClientError>;
    fn update_class_predictions(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError>;
    fn generate_retrospective_predictions(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError>;
    fn retrain_model(&self, class_id: i64) -> Result<serde_json::Value, ClientError>;
}

pub struct HttpAcademicClient {
    base_url: String,
    token: String,
}

impl HttpAcademicClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value, ClientError> {
        let url = self.url(path);
        let mut request = ureq::get(&url).set("Authorization", &format!("Bearer {}", self.token));
        for (name, value) in query {
            request = request.query(name, value);
        }
        let response = request.call().map_err(|err| map_call_error(&url, err))?;
        response.into_json().map_err(|err| ClientError::Decode {
            url,
            message: err.to_string(),
        })
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<serde_json::Value, ClientError> {
        let url = self.url(path);
        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .send_json(body)
            .map_err(|err| map_call_error(&url, err))?;
        response.into_json().map_err(|err| ClientError::Decode {
            url,
            message: err.to_string(),
        })
    }
}

fn map_call_error(url: &str, err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, response) => ClientError::Status {
            url: url.to_string(),
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => ClientError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

fn id_query(class_id: i64, period_id: Option<i64>) -> Vec<(&'static str, String)> {
    let mut query = vec![("class_id", class_id.to_string())];
    if let Some(period_id) = period_id {
        query.push(("period_id", period_id.to_string()));
    }
    query
}

impl AcademicClient for HttpAcademicClient {
    fn class_detail(&self, class_id: i64) -> Result<serde_json::Value, ClientError> {
        self.get_json(&format!("/academic/classes/{}/", class_id), &[])
    }

    fn bulk_save_grades(&self, payload: &BulkGradePayload) -> Result<serde_json::Value, ClientError> {
        self.post_json("/grades/grades/bulk_create_update/", payload)
    }

    fn grades_by_class_and_period(
        &self,
        class_id: i64,
        period_id: i64,
    ) -> Result<serde_json::Value, ClientError> {
        self.get_json(
            "/grades/grades/by_class_and_period/",
            &id_query(class_id, Some(period_id)),
        )
    }

    fn grade_stats(&self, class_id: i64, period_id: Option<i64>) -> Result<serde_json::Value, ClientError> {
        self.get_json("/grades/grades/stats/", &id_query(class_id, period_id))
    }

    fn final_grades_by_class(&self, class_id: i64) -> Result<serde_json::Value, ClientError> {
        self.get_json("/grades/final-grades/by_class/", &id_query(class_id, None))
    }

    fn bulk_save_attendance(
        &self,
        payload: &BulkAttendancePayload,
    ) -> Result<serde_json::Value, ClientError> {
        self.post_json("/academic/attendances/bulk_create/", payload)
    }

    fn attendances_by_class_and_period(
        &self,
        class_id: i64,
        period_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<serde_json::Value, ClientError> {
        let mut query = id_query(class_id, Some(period_id));
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        self.get_json("/academic/attendances/by_class_and_period/", &query)
    }

    fn attendance_stats(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError> {
        self.get_json("/academic/attendances/stats/", &id_query(class_id, period_id))
    }

    fn bulk_save_participation(
        &self,
        payload: &BulkParticipationPayload,
    ) -> Result<serde_json::Value, ClientError> {
        self.post_json("/academic/participations/bulk_create/", payload)
    }

    fn participations_by_class_and_period(
        &self,
        class_id: i64,
        period_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<serde_json::Value, ClientError> {
        let mut query = id_query(class_id, Some(period_id));
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }
        self.get_json("/academic/participations/by_class_and_period/", &query)
    }

    fn participation_stats(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError> {
        self.get_json("/academic/participations/stats/", &id_query(class_id, period_id))
    }

    fn predictions_by_class(&self, class_id: i64) -> Result<serde_json::Value, ClientError> {
        self.get_json("/ml/predictions/by_class/", &id_query(class_id, None))
    }

    fn prediction_history_by_class(&self, class_id: i64) -> Result<serde_json::Value, ClientError> {
        self.get_json("/ml/prediction-history/by_class/", &id_query(class_id, None))
    }

    fn prediction_comparison_stats(&self, class_id: i64) -> Result<serde_json::Value, ClientError> {
        self.get_json("/ml/prediction-history/comparison_stats/", &id_query(class_id, None))
    }

    fn update_class_predictions(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError> {
        let mut body = serde_json::json!({ "class_id": class_id });
        if let Some(period_id) = period_id {
            body["period_id"] = serde_json::json!(period_id);
        }
        self.post_json("/ml/predictions/update_class_predictions/", &body)
    }

    fn generate_retrospective_predictions(
        &self,
        class_id: i64,
        period_id: Option<i64>,
    ) -> Result<serde_json::Value, ClientError> {
        let mut body = serde_json::json!({ "class_id": class_id });
        if let Some(period_id) = period_id {
            body["period_id"] = serde_json::json!(period_id);
        }
        self.post_json("/ml/predictions/generate_retrospective_predictions/", &body)
    }

    fn retrain_model(&self, class_id: i64) -> Result<serde_json::Value, ClientError> {
        self.post_json(
            "/ml/predictions/retrain_model/",
            &serde_json::json!({ "class_id": class_id }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = HttpAcademicClient::new("https://backend.example/", "tok");
        assert_eq!(
            client.url("/grades/grades/stats/"),
            "https://backend.example/grades/grades/stats/"
        );
    }
}
