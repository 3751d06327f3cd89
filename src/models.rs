//! Typed rows for the eight persistent entities, plus the two enums.
//!
//! Enum columns use Postgres enum types created by the migration; string
//! forms are lowercase on both the wire and in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Upcoming,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Standard,
    Vip,
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::Standard
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub customer_type: CustomerType,
    pub preferences: Option<Json<serde_json::Value>>,
    pub loyalty_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Staff {
    pub id: i32,
    pub name: String,
    pub role: String,
    pub skills: Option<Json<Vec<String>>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Staff {
    /// Membership test used by the by-skill scan. Staff with no skills
    /// recorded never match.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills
            .as_ref()
            .map(|s| s.0.iter().any(|x| x == skill))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ServiceCategory {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: i32,
    pub customer_id: i32,
    pub service_id: i32,
    pub staff_id: Option<i32>,
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Feedback {
    pub id: i32,
    pub appointment_id: i32,
    pub customer_id: i32,
    pub rating: i32,
    pub comments: Option<String>,
    pub sentiment_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Promotion {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub service_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct KnowledgeBaseEntry {
    pub id: i32,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_lowercase_wire_form() {
        assert_eq!(
            serde_json::to_value(AppointmentStatus::Upcoming).unwrap(),
            "upcoming"
        );
        assert_eq!(serde_json::to_value(CustomerType::Vip).unwrap(), "vip");
        let s: AppointmentStatus = serde_json::from_value("cancelled".into()).unwrap();
        assert_eq!(s, AppointmentStatus::Cancelled);
    }

    #[test]
    fn customer_type_serializes_under_type_key() {
        let c = Customer {
            id: 1,
            name: "Ana".into(),
            phone: "555-0100".into(),
            email: None,
            customer_type: CustomerType::Standard,
            preferences: None,
            loyalty_points: 0,
            created_at: Utc::now(),
            updated_at: None,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "standard");
        assert!(v["email"].is_null());
    }

    #[test]
    fn has_skill_is_exact_membership() {
        let s = Staff {
            id: 1,
            name: "Lee".into(),
            role: "stylist".into(),
            skills: Some(Json(vec!["haircut".into(), "coloring".into()])),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert!(s.has_skill("coloring"));
        assert!(!s.has_skill("color"));
        let none = Staff { skills: None, ..s };
        assert!(!none.has_skill("haircut"));
    }
}
