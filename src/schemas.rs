//! Request payloads and field-constraint checks.
//!
//! Update payloads model "field absent" vs "field set to null" separately:
//! non-nullable columns use `Option<T>` (absent means leave alone), nullable
//! columns use `Option<Option<T>>` (outer None = leave alone, `Some(None)` =
//! clear). Each update struct carries an explicit `apply` merge onto the
//! stored row, so partial updates never touch fields missing from the body.
//!
//! Range checks run before any database interaction and fail with
//! `AppError::Validation`.

use crate::error::AppError;
use crate::models::{
    Appointment, AppointmentStatus, Customer, CustomerType, Feedback, KnowledgeBaseEntry,
    Promotion, Service, ServiceCategory, Staff,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use sqlx::types::Json;

// Serde collapses JSON null to the outer None for a bare Option<Option<T>>,
// which would make null indistinguishable from an absent field. Deserializing
// the inner Option directly keeps null as Some(None).
fn double_option<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(d).map(Some)
}

fn check_rating(rating: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), AppError> {
    if price <= 0.0 {
        return Err(AppError::Validation("price must be greater than 0".into()));
    }
    Ok(())
}

fn check_duration(minutes: i32) -> Result<(), AppError> {
    if minutes <= 0 {
        return Err(AppError::Validation(
            "duration_minutes must be greater than 0".into(),
        ));
    }
    Ok(())
}

fn check_discount(percent: f64) -> Result<(), AppError> {
    if percent <= 0.0 || percent > 100.0 {
        return Err(AppError::Validation(
            "discount_percent must be in (0, 100]".into(),
        ));
    }
    Ok(())
}

fn check_loyalty_points(points: i32) -> Result<(), AppError> {
    if points < 0 {
        return Err(AppError::Validation(
            "loyalty_points must not be negative".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------- customers

#[derive(Debug, Deserialize)]
pub struct CustomerCreate {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type", default)]
    pub customer_type: CustomerType,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub loyalty_points: i32,
}

impl CustomerCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_loyalty_points(self.loyalty_points)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(rename = "type")]
    pub customer_type: Option<CustomerType>,
    #[serde(default, deserialize_with = "double_option")]
    pub preferences: Option<Option<serde_json::Value>>,
    pub loyalty_points: Option<i32>,
}

impl CustomerUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(points) = self.loyalty_points {
            check_loyalty_points(points)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut Customer) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            row.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            row.email = email.clone();
        }
        if let Some(t) = self.customer_type {
            row.customer_type = t;
        }
        if let Some(prefs) = &self.preferences {
            row.preferences = prefs.clone().map(Json);
        }
        if let Some(points) = self.loyalty_points {
            row.loyalty_points = points;
        }
    }
}

// -------------------------------------------------------------------- staff

#[derive(Debug, Deserialize)]
pub struct StaffCreate {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffUpdate {
    pub name: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub skills: Option<Option<Vec<String>>>,
    pub is_active: Option<bool>,
}

impl StaffUpdate {
    pub fn apply(&self, row: &mut Staff) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(role) = &self.role {
            row.role = role.clone();
        }
        if let Some(skills) = &self.skills {
            row.skills = skills.clone().map(Json);
        }
        if let Some(active) = self.is_active {
            row.is_active = active;
        }
    }
}

// -------------------------------------------------------- service categories

#[derive(Debug, Deserialize)]
pub struct ServiceCategoryCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceCategoryUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl ServiceCategoryUpdate {
    pub fn apply(&self, row: &mut ServiceCategory) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(desc) = &self.description {
            row.description = desc.clone();
        }
    }
}

// ----------------------------------------------------------------- services

#[derive(Debug, Deserialize)]
pub struct ServiceCreate {
    pub name: String,
    pub price: f64,
    pub duration_minutes: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i32>,
}

impl ServiceCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_price(self.price)?;
        check_duration(self.duration_minutes)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i32>>,
}

impl ServiceUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(minutes) = self.duration_minutes {
            check_duration(minutes)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut Service) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(price) = self.price {
            row.price = price;
        }
        if let Some(minutes) = self.duration_minutes {
            row.duration_minutes = minutes;
        }
        if let Some(desc) = &self.description {
            row.description = desc.clone();
        }
        if let Some(category) = self.category_id {
            row.category_id = category;
        }
    }
}

// ------------------------------------------------------------- appointments

/// Status is not accepted at creation; every appointment starts `upcoming`.
#[derive(Debug, Deserialize)]
pub struct AppointmentCreate {
    pub customer_id: i32,
    pub service_id: i32,
    #[serde(default)]
    pub staff_id: Option<i32>,
    pub appointment_time: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentUpdate {
    pub customer_id: Option<i32>,
    pub service_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub staff_id: Option<Option<i32>>,
    pub appointment_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl AppointmentUpdate {
    pub fn apply(&self, row: &mut Appointment) {
        if let Some(customer) = self.customer_id {
            row.customer_id = customer;
        }
        if let Some(service) = self.service_id {
            row.service_id = service;
        }
        if let Some(staff) = self.staff_id {
            row.staff_id = staff;
        }
        if let Some(time) = self.appointment_time {
            row.appointment_time = time;
        }
        if let Some(status) = self.status {
            row.status = status;
        }
        if let Some(notes) = &self.notes {
            row.notes = notes.clone();
        }
    }
}

// ----------------------------------------------------------------- feedback

#[derive(Debug, Deserialize)]
pub struct FeedbackCreate {
    pub appointment_id: i32,
    pub customer_id: i32,
    pub rating: i32,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
}

impl FeedbackCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_rating(self.rating)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackUpdate {
    pub rating: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub comments: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sentiment_score: Option<Option<f64>>,
}

impl FeedbackUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(rating) = self.rating {
            check_rating(rating)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut Feedback) {
        if let Some(rating) = self.rating {
            row.rating = rating;
        }
        if let Some(comments) = &self.comments {
            row.comments = comments.clone();
        }
        if let Some(score) = self.sentiment_score {
            row.sentiment_score = score;
        }
    }
}

// --------------------------------------------------------------- promotions

#[derive(Debug, Deserialize)]
pub struct PromotionCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_percent: f64,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub service_id: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PromotionCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_discount(self.discount_percent)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PromotionUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub discount_percent: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub service_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl PromotionUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(percent) = self.discount_percent {
            check_discount(percent)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut Promotion) {
        if let Some(title) = &self.title {
            row.title = title.clone();
        }
        if let Some(desc) = &self.description {
            row.description = desc.clone();
        }
        if let Some(percent) = self.discount_percent {
            row.discount_percent = percent;
        }
        if let Some(start) = self.start_date {
            row.start_date = start;
        }
        if let Some(end) = self.end_date {
            row.end_date = end;
        }
        if let Some(service) = self.service_id {
            row.service_id = service;
        }
        if let Some(active) = self.is_active {
            row.is_active = active;
        }
    }
}

// ----------------------------------------------------------- knowledge base

#[derive(Debug, Deserialize)]
pub struct KnowledgeBaseCreate {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeBaseUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
}

impl KnowledgeBaseUpdate {
    pub fn apply(&self, row: &mut KnowledgeBaseEntry) {
        if let Some(question) = &self.question {
            row.question = question.clone();
        }
        if let Some(answer) = &self.answer {
            row.answer = answer.clone();
        }
        if let Some(category) = &self.category {
            row.category = category.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_row() -> Service {
        Service {
            id: 3,
            name: "Swedish Massage".into(),
            price: 85.0,
            duration_minutes: 60,
            description: Some("Full body".into()),
            category_id: Some(1),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn service_create_rejects_non_positive_price_and_duration() {
        let body: ServiceCreate = serde_json::from_value(serde_json::json!({
            "name": "Cut", "price": 0.0, "duration_minutes": 30
        }))
        .unwrap();
        assert!(body.validate().is_err());

        let body: ServiceCreate = serde_json::from_value(serde_json::json!({
            "name": "Cut", "price": 20.0, "duration_minutes": 0
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn feedback_rating_bounds_are_inclusive() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let body = FeedbackCreate {
                appointment_id: 1,
                customer_id: 1,
                rating,
                comments: None,
                sentiment_score: None,
            };
            assert_eq!(body.validate().is_ok(), ok, "rating {}", rating);
        }
    }

    #[test]
    fn discount_is_half_open_at_zero_and_closed_at_hundred() {
        let mut upd = PromotionUpdate::default();
        upd.discount_percent = Some(0.0);
        assert!(upd.validate().is_err());
        upd.discount_percent = Some(100.0);
        assert!(upd.validate().is_ok());
        upd.discount_percent = Some(100.5);
        assert!(upd.validate().is_err());
    }

    #[test]
    fn customer_create_defaults_type_and_points() {
        let body: CustomerCreate = serde_json::from_value(serde_json::json!({
            "name": "Ana", "phone": "555-0100"
        }))
        .unwrap();
        assert_eq!(body.customer_type, CustomerType::Standard);
        assert_eq!(body.loyalty_points, 0);
        assert!(body.email.is_none());
        assert!(body.validate().is_ok());
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let absent: CustomerUpdate = serde_json::from_value(serde_json::json!({
            "name": "Bea"
        }))
        .unwrap();
        assert!(absent.email.is_none());

        let cleared: CustomerUpdate = serde_json::from_value(serde_json::json!({
            "email": null
        }))
        .unwrap();
        assert_eq!(cleared.email, Some(None));

        let set: CustomerUpdate = serde_json::from_value(serde_json::json!({
            "email": "bea@example.com"
        }))
        .unwrap();
        assert_eq!(set.email, Some(Some("bea@example.com".into())));
    }

    #[test]
    fn apply_only_touches_provided_fields() {
        let mut row = service_row();
        let upd: ServiceUpdate = serde_json::from_value(serde_json::json!({
            "price": 95.0
        }))
        .unwrap();
        upd.apply(&mut row);
        assert_eq!(row.price, 95.0);
        assert_eq!(row.name, "Swedish Massage");
        assert_eq!(row.duration_minutes, 60);
        assert_eq!(row.category_id, Some(1));
    }

    #[test]
    fn apply_clears_nullable_field_on_explicit_null() {
        let mut row = service_row();
        let upd: ServiceUpdate =
            serde_json::from_value(serde_json::json!({ "category_id": null })).unwrap();
        upd.apply(&mut row);
        assert_eq!(row.category_id, None);
    }

    #[test]
    fn explicit_null_unassigns_appointment_staff() {
        let mut row = Appointment {
            id: 1,
            customer_id: 1,
            service_id: 1,
            staff_id: Some(4),
            appointment_time: Utc::now(),
            status: AppointmentStatus::Upcoming,
            notes: Some("with Lee".into()),
            created_at: Utc::now(),
            updated_at: None,
        };
        let upd: AppointmentUpdate =
            serde_json::from_value(serde_json::json!({ "staff_id": null })).unwrap();
        assert_eq!(upd.staff_id, Some(None));
        upd.apply(&mut row);
        assert_eq!(row.staff_id, None);
        assert_eq!(row.notes.as_deref(), Some("with Lee"));
    }

    #[test]
    fn appointment_update_notes_leaves_status_alone() {
        let mut row = Appointment {
            id: 1,
            customer_id: 1,
            service_id: 1,
            staff_id: None,
            appointment_time: Utc::now(),
            status: AppointmentStatus::Completed,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let upd: AppointmentUpdate =
            serde_json::from_value(serde_json::json!({ "notes": "ran late" })).unwrap();
        upd.apply(&mut row);
        assert_eq!(row.status, AppointmentStatus::Completed);
        assert_eq!(row.notes.as_deref(), Some("ran late"));
    }

    // Transitions are deliberately unrestricted: the status endpoint will take
    // a completed appointment back to upcoming.
    #[test]
    fn status_update_allows_any_transition() {
        let mut row = Appointment {
            id: 1,
            customer_id: 1,
            service_id: 1,
            staff_id: None,
            appointment_time: Utc::now(),
            status: AppointmentStatus::Completed,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let upd: AppointmentUpdate =
            serde_json::from_value(serde_json::json!({ "status": "upcoming" })).unwrap();
        upd.apply(&mut row);
        assert_eq!(row.status, AppointmentStatus::Upcoming);
    }

    #[test]
    fn loyalty_points_must_be_non_negative() {
        let body: CustomerCreate = serde_json::from_value(serde_json::json!({
            "name": "Ana", "phone": "555-0100", "loyalty_points": -1
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }
}
