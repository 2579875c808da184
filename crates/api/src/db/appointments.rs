//! Appointment repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use sqlx::types::Json;

use zaffira_core::booking::{Appointment, NewAppointment};
use zaffira_core::cart::CartItem;
use zaffira_core::profile::full_name;
use zaffira_core::{AppointmentId, AppointmentStatus, AppointmentType, Price, UserId};

use super::RepositoryError;

macro_rules! appointment_columns {
    () => {
        "id, user_id, appointment_date, status, appointment_type, duration_minutes, \
         customer_name, customer_email, customer_phone, cart_items, total_amount, notes, \
         reminder_sent, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: AppointmentId,
    user_id: UserId,
    appointment_date: DateTime<Utc>,
    status: AppointmentStatus,
    appointment_type: AppointmentType,
    duration_minutes: i32,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    cart_items: Json<Vec<CartItem>>,
    total_amount: Price,
    notes: Option<String>,
    reminder_sent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            appointment_date: row.appointment_date,
            status: row.status,
            appointment_type: row.appointment_type,
            duration_minutes: row.duration_minutes,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            cart_items: row.cart_items.0,
            total_amount: row.total_amount,
            notes: row.notes,
            reminder_sent: row.reminder_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AdminAppointmentRow {
    #[sqlx(flatten)]
    appointment: AppointmentRow,
    profile_first_name: Option<String>,
    profile_last_name: Option<String>,
    profile_email: Option<String>,
    profile_phone: Option<String>,
}

/// Contact details shown in the back office.
///
/// Profile values win over what was typed into the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// An appointment with its customer's contact details.
#[derive(Debug, Clone, Serialize)]
pub struct AdminAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub customer: CustomerContact,
}

impl From<AdminAppointmentRow> for AdminAppointment {
    fn from(row: AdminAppointmentRow) -> Self {
        let appointment = Appointment::from(row.appointment);
        let profile_name = match (&row.profile_first_name, &row.profile_last_name) {
            (Some(first), Some(last)) => Some(full_name(first, last)),
            _ => None,
        };
        let customer = CustomerContact {
            name: profile_name.unwrap_or_else(|| appointment.customer_name.clone()),
            email: row
                .profile_email
                .unwrap_or_else(|| appointment.customer_email.clone()),
            phone: row
                .profile_phone
                .unwrap_or_else(|| appointment.customer_phone.clone()),
        };
        Self {
            appointment,
            customer,
        }
    }
}

/// Appointment counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AppointmentStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// Repository for appointment database operations.
pub struct AppointmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentRepository<'a> {
    /// Create a new appointment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a validated booking for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        booking: &NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(concat!(
            "INSERT INTO appointments (user_id, appointment_date, appointment_type, \
             duration_minutes, customer_name, customer_email, customer_phone, cart_items, \
             total_amount, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            appointment_columns!()
        ))
        .bind(user_id)
        .bind(booking.appointment_date)
        .bind(booking.appointment_type)
        .bind(booking.duration_minutes)
        .bind(&booking.customer_name)
        .bind(&booking.customer_email)
        .bind(&booking.customer_phone)
        .bind(Json(&booking.cart_items))
        .bind(booking.total_amount)
        .bind(&booking.notes)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get an appointment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(concat!(
            "SELECT ",
            appointment_columns!(),
            " FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Appointment::from))
    }

    /// A user's appointments, latest date first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Appointment>, RepositoryError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(concat!(
            "SELECT ",
            appointment_columns!(),
            " FROM appointments WHERE user_id = $1 ORDER BY appointment_date DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    /// Every appointment with its customer's profile, latest date first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_customers(&self) -> Result<Vec<AdminAppointment>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminAppointmentRow>(
            r"
            SELECT a.id, a.user_id, a.appointment_date, a.status, a.appointment_type,
                   a.duration_minutes, a.customer_name, a.customer_email, a.customer_phone,
                   a.cart_items, a.total_amount, a.notes, a.reminder_sent, a.created_at,
                   a.updated_at,
                   p.first_name AS profile_first_name,
                   p.last_name AS profile_last_name,
                   p.email AS profile_email,
                   p.phone AS profile_phone
            FROM appointments a
            LEFT JOIN profiles p ON p.id = a.user_id
            ORDER BY a.appointment_date DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(AdminAppointment::from).collect())
    }

    /// Change the notes and/or date. `None` leaves a field unchanged.
    ///
    /// With `pending_only`, the row is only written while its status is
    /// still `pending`, checked in the same statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment does not exist
    /// or, with `pending_only`, is no longer pending.
    pub async fn update_details(
        &self,
        id: AppointmentId,
        notes: Option<&str>,
        appointment_date: Option<DateTime<Utc>>,
        pending_only: bool,
    ) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(concat!(
            "UPDATE appointments SET notes = COALESCE($2, notes), \
             appointment_date = COALESCE($3, appointment_date) \
             WHERE id = $1 AND (NOT $4 OR status = 'pending') RETURNING ",
            appointment_columns!()
        ))
        .bind(id)
        .bind(notes)
        .bind(appointment_date)
        .bind(pending_only)
        .fetch_optional(self.pool)
        .await?;

        row.map(Appointment::from).ok_or(RepositoryError::NotFound)
    }

    /// Set the status.
    ///
    /// With `pending_only`, the row is only written while its status is
    /// still `pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment does not exist
    /// or, with `pending_only`, is no longer pending.
    pub async fn set_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        pending_only: bool,
    ) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(concat!(
            "UPDATE appointments SET status = $2 \
             WHERE id = $1 AND (NOT $3 OR status = 'pending') RETURNING ",
            appointment_columns!()
        ))
        .bind(id)
        .bind(status)
        .bind(pending_only)
        .fetch_optional(self.pool)
        .await?;

        row.map(Appointment::from).ok_or(RepositoryError::NotFound)
    }

    /// Counts per status for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<AppointmentStats, RepositoryError> {
        let stats = sqlx::query_as::<_, AppointmentStats>(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
            FROM appointments
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
