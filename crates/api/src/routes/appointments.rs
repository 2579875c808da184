//! Appointment booking and management route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use zaffira_core::booking::{
    Appointment, BookingError, BookingRequest, NewAppointment, normalize_notes, schedule,
};
use zaffira_core::{AppointmentId, AppointmentStatus};

use crate::db::{AppointmentRepository, ProductRepository, RepositoryError};
use crate::db::appointments::AdminAppointment;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::CurrentUser;
use crate::services::{BookingNotifier, ChangeAction, Table};
use crate::state::AppState;

/// Shown when the confirmation emails went out.
pub const BOOKED_MESSAGE: &str =
    "Your appointment has been successfully booked and confirmation emails have been sent.";

/// Shown when the booking is stored but the notification did not go out.
pub const SAVED_MESSAGE: &str =
    "Your appointment has been saved. We'll contact you soon to confirm.";

/// Result of a booking.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub appointment: Appointment,
    pub notification_sent: bool,
    pub message: &'static str,
    /// The client empties its cart once the snapshot is stored.
    pub cart_cleared: bool,
}

/// Edit to an existing appointment.
///
/// `date` and `time` move the appointment and must be given together.
/// `status` is admin-only.
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentUpdate {
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
}

/// New status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AppointmentStatus,
}

const fn message_for(notification_sent: bool) -> &'static str {
    if notification_sent {
        BOOKED_MESSAGE
    } else {
        SAVED_MESSAGE
    }
}

/// Forward a stored booking to the notification service, if one is
/// configured. Failures are logged and reported as `false`.
async fn notify(
    notifier: Option<&BookingNotifier>,
    booking: &NewAppointment,
    appointment_id: AppointmentId,
) -> bool {
    let Some(notifier) = notifier else {
        return false;
    };
    match notifier.send(booking).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error = %e,
                appointment_id = %appointment_id,
                "booking notification failed"
            );
            false
        }
    }
}

/// Owner writes are conditional on the appointment still being pending;
/// a guarded write that matched no row means it moved on since it was read.
fn guarded_write_error(err: RepositoryError, pending_only: bool) -> AppError {
    match err {
        RepositoryError::NotFound if pending_only => BookingError::NotEditable.into(),
        other => other.into(),
    }
}

/// Load an appointment the caller may see.
///
/// Other customers' appointments are reported as missing.
async fn load_accessible(
    repo: &AppointmentRepository<'_>,
    id: AppointmentId,
    caller: CurrentUser,
) -> Result<Appointment> {
    repo.get(id)
        .await?
        .filter(|a| caller.can_access(a.user_id))
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))
}

/// The caller's appointments.
///
/// GET /api/appointments
#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<Appointment>>> {
    let appointments = AppointmentRepository::new(state.pool())
        .list_for_user(caller.id)
        .await?;
    Ok(Json(appointments))
}

/// Book an appointment with the current cart.
///
/// Cart lines are repriced from the catalog; the client only chooses
/// products and quantities. The appointment is stored first; the
/// confirmation call afterwards is best effort and never undoes the booking.
///
/// POST /api/appointments
#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(mut request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>)> {
    let catalog = ProductRepository::new(state.pool())
        .get_many(&request.product_ids())
        .await?;
    request.reprice(&catalog)?;
    let booking = request.validate(Utc::now())?;
    let appointment = AppointmentRepository::new(state.pool())
        .create(caller.id, &booking)
        .await?;

    tracing::info!(
        appointment_id = %appointment.id,
        items = appointment.cart_items.len(),
        total = %appointment.total_amount,
        "appointment booked"
    );
    state
        .changes()
        .publish(Table::Appointments, ChangeAction::Insert, appointment.id);

    let notification_sent = notify(state.notifier(), &booking, appointment.id).await;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            appointment,
            notification_sent,
            message: message_for(notification_sent),
            cart_cleared: true,
        }),
    ))
}

/// Edit an appointment.
///
/// Owners may change notes and reschedule while the appointment is pending.
/// Admins may also change the status.
///
/// PUT /api/appointments/{id}
#[instrument(skip_all, fields(user_id = %caller.id, appointment_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<AppointmentId>,
    Json(update): Json<AppointmentUpdate>,
) -> Result<Json<Appointment>> {
    let repo = AppointmentRepository::new(state.pool());
    let mut appointment = load_accessible(&repo, id, caller).await?;

    if update.status.is_some() && !caller.is_admin() {
        return Err(AppError::Forbidden(
            "Only staff can change an appointment's status".to_string(),
        ));
    }

    let new_date = match (update.date, update.time.as_deref()) {
        (Some(date), Some(time)) => Some(schedule(date, time, Utc::now())?),
        (None, None) => None,
        _ => return Err(BookingError::MissingInformation.into()),
    };
    let notes = update.notes.map(|n| normalize_notes(Some(n))).transpose()?.flatten();

    let pending_only = !caller.is_admin();
    let mut changed = false;
    if notes.is_some() || new_date.is_some() {
        if pending_only {
            appointment.ensure_editable()?;
        }
        appointment = repo
            .update_details(id, notes.as_deref(), new_date, pending_only)
            .await
            .map_err(|e| guarded_write_error(e, pending_only))?;
        changed = true;
    }
    if let Some(status) = update.status {
        appointment = repo.set_status(id, status, false).await?;
        changed = true;
    }

    if changed {
        state
            .changes()
            .publish(Table::Appointments, ChangeAction::Update, id);
    }

    Ok(Json(appointment))
}

/// Cancel an appointment.
///
/// Owners may cancel while pending; admins at any time.
///
/// DELETE /api/appointments/{id}
#[instrument(skip_all, fields(user_id = %caller.id, appointment_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<AppointmentId>,
) -> Result<Json<Appointment>> {
    let repo = AppointmentRepository::new(state.pool());
    let appointment = load_accessible(&repo, id, caller).await?;
    let pending_only = !caller.is_admin();
    if pending_only {
        appointment.ensure_editable()?;
    }

    let appointment = repo
        .set_status(id, AppointmentStatus::Cancelled, pending_only)
        .await
        .map_err(|e| guarded_write_error(e, pending_only))?;

    tracing::info!("appointment cancelled");
    state
        .changes()
        .publish(Table::Appointments, ChangeAction::Update, id);

    Ok(Json(appointment))
}

/// Every appointment with customer contact details.
///
/// GET /api/admin/appointments
#[instrument(skip_all)]
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<AdminAppointment>>> {
    let appointments = AppointmentRepository::new(state.pool())
        .list_with_customers()
        .await?;
    Ok(Json(appointments))
}

/// Set an appointment's status.
///
/// PUT /api/admin/appointments/{id}/status
#[instrument(skip_all, fields(admin = %admin.id, appointment_id = %id))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<AppointmentId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .set_status(id, request.status, false)
        .await?;

    tracing::info!(status = %request.status, "appointment status changed");
    state
        .changes()
        .publish(Table::Appointments, ChangeAction::Update, id);

    Ok(Json(appointment))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notify::stub;
    use crate::services::notify::tests as notify_tests;

    #[test]
    fn test_message_for_notification_outcome() {
        assert_eq!(message_for(true), BOOKED_MESSAGE);
        assert_eq!(message_for(false), SAVED_MESSAGE);
    }

    #[tokio::test]
    async fn test_failed_notification_still_reports_saved() {
        let booking = notify_tests::booking();
        let id = AppointmentId::generate();

        let url = stub::serve(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
        let failing = BookingNotifier::new(&url).unwrap();
        let sent = notify(Some(&failing), &booking, id).await;
        assert!(!sent);
        assert_eq!(message_for(sent), SAVED_MESSAGE);

        let url = stub::serve(StatusCode::OK, r#"{"success": false}"#).await;
        let refusing = BookingNotifier::new(&url).unwrap();
        assert!(!notify(Some(&refusing), &booking, id).await);

        assert!(!notify(None, &booking, id).await);

        let url = stub::serve(StatusCode::OK, "").await;
        let working = BookingNotifier::new(&url).unwrap();
        let sent = notify(Some(&working), &booking, id).await;
        assert!(sent);
        assert_eq!(message_for(sent), BOOKED_MESSAGE);
    }

    #[test]
    fn test_guarded_write_miss_is_not_editable() {
        assert!(matches!(
            guarded_write_error(RepositoryError::NotFound, true),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            guarded_write_error(RepositoryError::NotFound, false),
            AppError::Database(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn test_update_parses_status() {
        let update: AppointmentUpdate =
            serde_json::from_str(r#"{"status": "confirmed"}"#).unwrap();
        assert_eq!(update.status, Some(AppointmentStatus::Confirmed));
        assert!(update.notes.is_none());
    }
}
