//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the public REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{admin, state::AppState};
use axum::{
    extract::{Query, State},
    response::Json,
};
use clinic_core::{
    catalog::{CLINIC_INFO, DOCTORS, SERVICES, TESTIMONIALS},
    domain::{Appointment, AppointmentStatus, Doctor, Language, Service, Testimonial},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        clinic_handler,
        pending_count_handler,
        admin::login_handler,
        admin::logout_handler,
        admin::list_appointments_handler,
        admin::toggle_status_handler,
        admin::delete_appointment_handler,
    ),
    components(
        schemas(
            ClinicResponse,
            ClinicInfoView,
            ServiceView,
            DoctorView,
            TestimonialView,
            PendingCountResponse,
            AppointmentView,
            admin::LoginRequest,
            admin::DeleteResponse,
        )
    ),
    tags(
        (name = "SmileCare Clinic API", description = "Clinic content, booking records and the admin panel.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LanguageQuery {
    /// `en` (default) or `zh`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub lang: Language,
}

/// The clinic's static content, localized.
#[derive(Serialize, ToSchema)]
pub struct ClinicResponse {
    pub info: ClinicInfoView,
    pub services: Vec<ServiceView>,
    pub doctors: Vec<DoctorView>,
    pub testimonials: Vec<TestimonialView>,
}

#[derive(Serialize, ToSchema)]
pub struct ClinicInfoView {
    pub name: String,
    pub chinese_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub opening_hours: String,
}

#[derive(Serialize, ToSchema)]
pub struct ServiceView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub price_start: String,
}

impl ServiceView {
    fn localized(service: &Service, language: Language) -> Self {
        Self {
            id: service.id.to_string(),
            title: service.title.get(language).to_string(),
            description: service.description.get(language).to_string(),
            icon: service.icon.to_string(),
            price_start: service.price_start.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DoctorView {
    pub id: String,
    pub name: String,
    pub title: String,
    pub specialty: String,
    pub image: String,
    pub experience: String,
    pub bio: String,
    pub education: String,
}

impl DoctorView {
    fn localized(doctor: &Doctor, language: Language) -> Self {
        Self {
            id: doctor.id.to_string(),
            name: doctor.name.get(language).to_string(),
            title: doctor.title.get(language).to_string(),
            specialty: doctor.specialty.get(language).to_string(),
            image: doctor.image.to_string(),
            experience: doctor.experience.get(language).to_string(),
            bio: doctor.bio.get(language).to_string(),
            education: doctor.education.get(language).to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TestimonialView {
    pub id: String,
    pub name: String,
    pub comment: String,
    pub rating: u8,
}

impl TestimonialView {
    fn localized(testimonial: &Testimonial, language: Language) -> Self {
        Self {
            id: testimonial.id.to_string(),
            name: testimonial.name.get(language).to_string(),
            comment: testimonial.comment.get(language).to_string(),
            rating: testimonial.rating,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PendingCountResponse {
    pub count: usize,
}

/// A booking record as shown in the admin panel.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub date: String,
    pub service: String,
    pub doctor: String,
    pub notes: String,
    /// `pending` or `contacted`.
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        let status = match appointment.status {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Contacted => "contacted",
        };
        Self {
            id: appointment.id,
            name: appointment.name,
            phone: appointment.phone,
            date: appointment.date,
            service: appointment.service,
            doctor: appointment.doctor,
            notes: appointment.notes,
            status: status.to_string(),
            created_at: appointment.created_at,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Clinic info, services, doctors and testimonials in the requested language.
#[utoipa::path(
    get,
    path = "/clinic",
    params(LanguageQuery),
    responses(
        (status = 200, description = "Localized clinic content", body = ClinicResponse)
    )
)]
pub async fn clinic_handler(Query(query): Query<LanguageQuery>) -> Json<ClinicResponse> {
    let language = query.lang;
    Json(ClinicResponse {
        info: ClinicInfoView {
            name: CLINIC_INFO.name.to_string(),
            chinese_name: CLINIC_INFO.chinese_name.to_string(),
            address: CLINIC_INFO.address.get(language).to_string(),
            phone: CLINIC_INFO.phone.to_string(),
            email: CLINIC_INFO.email.to_string(),
            opening_hours: CLINIC_INFO.opening_hours.get(language).to_string(),
        },
        services: SERVICES.iter().map(|s| ServiceView::localized(s, language)).collect(),
        doctors: DOCTORS.iter().map(|d| DoctorView::localized(d, language)).collect(),
        testimonials: TESTIMONIALS
            .iter()
            .map(|t| TestimonialView::localized(t, language))
            .collect(),
    })
}

/// The number of bookings still awaiting contact.
///
/// An unreadable collection reports zero.
#[utoipa::path(
    get,
    path = "/appointments/pending-count",
    responses(
        (status = 200, description = "Pending booking count", body = PendingCountResponse)
    )
)]
pub async fn pending_count_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<PendingCountResponse> {
    let count = app_state.book.pending_count().await.unwrap_or_else(|e| {
        warn!("Failed to count pending appointments: {}", e);
        0
    });
    Json(PendingCountResponse { count })
}
