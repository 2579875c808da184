//! Booking notification client.
//!
//! After an appointment is stored, the booking is forwarded to an external
//! service that emails the customer and the store. The call is best effort:
//! callers log a failure and carry on.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use zaffira_core::booking::{NewAppointment, store_offset};
use zaffira_core::cart::CartItem;

/// Request timeout for the notification call.
const TIMEOUT: Duration = Duration::from_secs(10);

/// Path appended to the configured base URL.
const BOOKING_PATH: &str = "api/book-appointment";

/// Errors that can occur when calling the notification service.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the URL or parse the response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Body sent to the notification service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingNotice<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub date: String,
    pub time: &'a str,
    pub notes: &'a str,
    pub cart_items: &'a [CartItem],
}

impl<'a> From<&'a NewAppointment> for BookingNotice<'a> {
    fn from(booking: &'a NewAppointment) -> Self {
        Self {
            name: &booking.customer_name,
            email: booking.customer_email.as_str(),
            phone: &booking.customer_phone,
            date: booking
                .appointment_date
                .with_timezone(&store_offset())
                .format("%Y-%m-%d")
                .to_string(),
            time: &booking.time_slot,
            notes: booking.notes.as_deref().unwrap_or_default(),
            cart_items: &booking.cart_items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NoticeResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

const fn default_success() -> bool {
    true
}

/// HTTP client for the booking notification service.
#[derive(Debug, Clone)]
pub struct BookingNotifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl BookingNotifier {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the URL cannot
    /// take the booking path.
    pub fn new(base_url: &Url) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint(base_url)?,
        })
    }

    /// The URL bookings are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send the booking confirmation request.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, timeout, a non-success status, or
    /// a response that reports `success: false`.
    pub async fn send(&self, booking: &NewAppointment) -> Result<(), NotifyError> {
        let body = BookingNotice::from(booking);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        let parsed: NoticeResponse =
            serde_json::from_str(&text).map_err(|e| NotifyError::Parse(e.to_string()))?;
        if !parsed.success {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message: parsed.message.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

/// Join the booking path onto a base URL, keeping any base path.
fn endpoint(base_url: &Url) -> Result<Url, NotifyError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(BOOKING_PATH)
        .map_err(|e| NotifyError::Parse(e.to_string()))
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};

    use zaffira_core::{AppointmentType, Email, Price, ProductId};

    use super::*;

    pub fn booking() -> NewAppointment {
        NewAppointment {
            appointment_date: Utc.with_ymd_and_hms(2030, 3, 1, 18, 30, 0).unwrap(),
            time_slot: "12:00 AM".to_owned(),
            appointment_type: AppointmentType::Consultation,
            duration_minutes: 60,
            customer_name: "Asha Verma".to_owned(),
            customer_email: Email::parse("asha@example.com").unwrap(),
            customer_phone: "+91 98765 43210".to_owned(),
            cart_items: vec![CartItem {
                id: ProductId::generate(),
                name: "Solitaire Ring".to_owned(),
                price: Price::from_rupees(45_000),
                quantity: 1,
                image: "https://cdn.example.com/ring.jpg".to_owned(),
            }],
            total_amount: Price::from_rupees(45_000),
            notes: None,
        }
    }

    async fn send_to(status: StatusCode, body: &'static str) -> Result<(), NotifyError> {
        let notifier = BookingNotifier::new(&stub::serve(status, body).await).unwrap();
        notifier.send(&booking()).await
    }

    #[test]
    fn test_endpoint_joins_path() {
        let url = Url::parse("https://mail.example.com").unwrap();
        assert_eq!(
            endpoint(&url).unwrap().as_str(),
            "https://mail.example.com/api/book-appointment"
        );

        let nested = Url::parse("https://example.com/hooks").unwrap();
        assert_eq!(
            endpoint(&nested).unwrap().as_str(),
            "https://example.com/hooks/api/book-appointment"
        );
    }

    #[test]
    fn test_notice_body_shape() {
        let booking = booking();

        let json = serde_json::to_value(BookingNotice::from(&booking)).unwrap();
        // 18:30 UTC is midnight the next day in the store's timezone.
        assert_eq!(json["date"], "2030-03-02");
        assert_eq!(json["time"], "12:00 AM");
        assert_eq!(json["notes"], "");
        assert_eq!(json["cartItems"][0]["name"], "Solitaire Ring");
        assert!(json.get("cart_items").is_none());
    }

    #[test]
    fn test_response_defaults_to_success() {
        let parsed: NoticeResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.success);
        let failed: NoticeResponse =
            serde_json::from_str(r#"{"success": false, "message": "smtp down"}"#).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.message.as_deref(), Some("smtp down"));
    }

    #[tokio::test]
    async fn test_send_accepts_empty_and_successful_replies() {
        send_to(StatusCode::OK, "").await.unwrap();
        send_to(StatusCode::NO_CONTENT, "").await.unwrap();
        send_to(StatusCode::OK, r#"{"success": true}"#).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_reports_error_status() {
        let err = send_to(StatusCode::BAD_GATEWAY, "relay down").await.unwrap_err();
        assert!(
            matches!(&err, NotifyError::Api { status: 502, message } if message == "relay down"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_send_rejects_non_json_reply() {
        let err = send_to(StatusCode::OK, "<html>ok</html>").await.unwrap_err();
        assert!(matches!(err, NotifyError::Parse(_)), "{err}");
    }

    #[tokio::test]
    async fn test_send_reports_unsuccessful_reply() {
        let err = send_to(StatusCode::OK, r#"{"success": false, "message": "smtp down"}"#)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, NotifyError::Api { status: 200, message } if message == "smtp down"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_send_reports_transport_error() {
        let notifier = BookingNotifier::new(&stub::closed().await).unwrap();
        let err = notifier.send(&booking()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)), "{err}");
    }
}
