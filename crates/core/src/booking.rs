//! Appointment booking rules.
//!
//! A booking turns the contact form plus the current cart into a
//! [`NewAppointment`]: the cart is repriced from the catalog, copied by
//! value and its total computed, so later product edits never change what
//! was booked. Only the product ids and quantities come from the client.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::product::Product;
use crate::profile::validate_phone;
use crate::types::{
    AppointmentId, AppointmentStatus, AppointmentType, Email, EmailError, Price, ProductId,
    UserId,
};

/// Bookable slots shown to customers.
pub const TIME_SLOTS: [&str; 9] = [
    "09:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "01:00 PM", "02:00 PM", "03:00 PM",
    "04:00 PM", "05:00 PM",
];

/// Store-local offset from UTC (India Standard Time).
pub const STORE_UTC_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Default appointment length.
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// Longest accepted notes field.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// A booking validation failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Please fill in all required fields.")]
    MissingInformation,
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error("Please provide a valid phone number")]
    Phone,
    #[error("Notes cannot exceed 1000 characters")]
    NotesTooLong,
    #[error("invalid time slot: {0}")]
    InvalidTimeSlot(String),
    #[error("Appointment date must be in the future")]
    NotInFuture,
    #[error("Only pending appointments can be changed")]
    NotEditable,
    #[error("Product {0} in your cart is no longer available")]
    UnavailableProduct(ProductId),
    #[error("Cart total is too large")]
    TotalTooLarge,
}

/// Convert a 12-hour slot label (`"01:00 PM"`) to a time of day.
///
/// `12:xx AM` is just after midnight and `12:xx PM` just after noon.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTimeSlot`] if the label is not
/// `hh:mm AM|PM` with an hour in 1..=12 and minutes in 0..=59.
///
/// ```
/// use chrono::NaiveTime;
/// use zaffira_core::booking::parse_time_slot;
///
/// assert_eq!(
///     parse_time_slot("01:00 PM").unwrap(),
///     NaiveTime::from_hms_opt(13, 0, 0).unwrap()
/// );
/// ```
pub fn parse_time_slot(slot: &str) -> Result<NaiveTime, BookingError> {
    let invalid = || BookingError::InvalidTimeSlot(slot.to_owned());

    let (clock, meridiem) = slot.trim().split_once(' ').ok_or_else(invalid)?;
    let (hours, minutes) = clock.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hours) {
        return Err(invalid());
    }

    let hours = match meridiem.trim().to_ascii_uppercase().as_str() {
        "AM" => hours % 12,
        "PM" => hours % 12 + 12,
        _ => return Err(invalid()),
    };

    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// The store's fixed UTC offset.
#[must_use]
pub fn store_offset() -> FixedOffset {
    FixedOffset::east_opt(STORE_UTC_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Combine a calendar date and slot label into a UTC instant, reading the
/// slot in store-local time.
///
/// # Errors
///
/// Propagates [`parse_time_slot`] failures.
pub fn slot_instant(date: NaiveDate, slot: &str) -> Result<DateTime<Utc>, BookingError> {
    let time = parse_time_slot(slot)?;
    store_offset()
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| BookingError::InvalidTimeSlot(slot.to_owned()))
}

/// Reject instants that are not strictly after `now`.
///
/// # Errors
///
/// Returns [`BookingError::NotInFuture`].
pub fn ensure_future(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), BookingError> {
    if at <= now {
        return Err(BookingError::NotInFuture);
    }
    Ok(())
}

/// Resolve a date and one of the [`TIME_SLOTS`] into a future instant.
///
/// # Errors
///
/// Returns [`BookingError::InvalidTimeSlot`] for a slot that is not offered
/// and [`BookingError::NotInFuture`] if the instant has passed.
pub fn schedule(
    date: NaiveDate,
    slot: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, BookingError> {
    let slot = slot.trim();
    if !TIME_SLOTS.contains(&slot) {
        return Err(BookingError::InvalidTimeSlot(slot.to_owned()));
    }
    let at = slot_instant(date, slot)?;
    ensure_future(at, now)?;
    Ok(at)
}

/// Trim notes, drop them when empty, and enforce the length limit.
///
/// # Errors
///
/// Returns [`BookingError::NotesTooLong`].
pub fn normalize_notes(notes: Option<String>) -> Result<Option<String>, BookingError> {
    let notes = notes.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
    {
        return Err(BookingError::NotesTooLong);
    }
    Ok(notes)
}

/// The booking form as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
}

/// A validated appointment ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub appointment_date: DateTime<Utc>,
    pub time_slot: String,
    pub appointment_type: AppointmentType,
    pub duration_minutes: i32,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: String,
    pub cart_items: Vec<CartItem>,
    pub total_amount: Price,
    pub notes: Option<String>,
}

impl BookingRequest {
    /// Distinct product ids in the cart, in cart order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.cart_items.len());
        for item in &self.cart_items {
            if !ids.contains(&item.id) {
                ids.push(item.id);
            }
        }
        ids
    }

    /// Replace every cart line's name, price and image with the catalog's
    /// current values. Only the client's quantities are kept.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::UnavailableProduct`] for a line whose product
    /// is not in `catalog` or is inactive.
    pub fn reprice(&mut self, catalog: &[Product]) -> Result<(), BookingError> {
        for line in &mut self.cart_items {
            let product = catalog
                .iter()
                .find(|p| p.id == line.id && p.is_active)
                .ok_or(BookingError::UnavailableProduct(line.id))?;
            *line = CartItem::from_product(product, line.quantity);
        }
        Ok(())
    }

    /// Validate the form against `now` and snapshot the cart.
    ///
    /// # Errors
    ///
    /// Returns the first [`BookingError`] found, checking required fields
    /// before formats, and [`BookingError::TotalTooLarge`] if the cart total
    /// does not fit a [`Price`].
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewAppointment, BookingError> {
        let name = self.name.trim();
        let time = self.time.trim();
        let (Some(date), false, false, false, false) = (
            self.date,
            name.is_empty(),
            self.email.trim().is_empty(),
            self.phone.trim().is_empty(),
            time.is_empty(),
        ) else {
            return Err(BookingError::MissingInformation);
        };

        let customer_email = Email::parse(&self.email)?;
        let customer_phone = validate_phone(&self.phone).map_err(|_| BookingError::Phone)?;
        let notes = normalize_notes(self.notes)?;

        let appointment_date = schedule(date, time, now)?;

        let mut cart = Cart::from_items(self.cart_items);
        let total_amount = cart.total().ok_or(BookingError::TotalTooLarge)?;
        let cart_items = cart.take_snapshot();

        Ok(NewAppointment {
            appointment_date,
            time_slot: time.to_owned(),
            appointment_type: self.appointment_type,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            customer_name: name.to_owned(),
            customer_email,
            customer_phone,
            cart_items,
            total_amount,
            notes,
        })
    }
}

/// A stored appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub user_id: UserId,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub duration_minutes: i32,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub cart_items: Vec<CartItem>,
    pub total_amount: Price,
    pub notes: Option<String>,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Owners may only change an appointment that is still pending.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotEditable`] for any other status.
    pub fn ensure_editable(&self) -> Result<(), BookingError> {
        match self.status {
            AppointmentStatus::Pending => Ok(()),
            _ => Err(BookingError::NotEditable),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::product::{ProductImage, Specifications};
    use crate::types::Category;

    fn hms(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn tomorrow() -> NaiveDate {
        (Utc::now() + Duration::days(1)).date_naive()
    }

    fn request() -> BookingRequest {
        BookingRequest {
            name: " Asha Verma ".to_owned(),
            email: "Asha@Example.com".to_owned(),
            phone: "+91-9876543210".to_owned(),
            date: Some(tomorrow()),
            time: "11:00 AM".to_owned(),
            notes: Some("  Looking for an engagement ring ".to_owned()),
            appointment_type: AppointmentType::Consultation,
            cart_items: vec![],
        }
    }

    #[test]
    fn test_parse_time_slot() {
        assert_eq!(parse_time_slot("09:00 AM").unwrap(), hms(9, 0));
        assert_eq!(parse_time_slot("01:00 PM").unwrap(), hms(13, 0));
        assert_eq!(parse_time_slot("05:30 pm").unwrap(), hms(17, 30));
        assert_eq!(parse_time_slot("12:00 PM").unwrap(), hms(12, 0));
        assert_eq!(parse_time_slot("12:15 AM").unwrap(), hms(0, 15));
    }

    #[test]
    fn test_parse_time_slot_rejects_garbage() {
        for bad in ["", "13:00 PM", "00:30 AM", "9 AM", "09:00", "09:61 AM", "09:00 XM"] {
            assert!(parse_time_slot(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_every_slot_parses() {
        for slot in TIME_SLOTS {
            assert!(parse_time_slot(slot).is_ok());
        }
    }

    #[test]
    fn test_slot_instant_uses_store_time() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
        let at = slot_instant(date, "09:00 AM").unwrap();
        assert_eq!(at.to_rfc3339(), "2030-01-15T03:30:00+00:00");
    }

    #[test]
    fn test_validate_builds_snapshot() {
        let ring = ProductId::generate();
        let mut req = request();
        req.cart_items = vec![
            CartItem {
                id: ring,
                name: "Emerald Ring".to_owned(),
                price: Price::from_rupees(80_000),
                quantity: 1,
                image: String::new(),
            },
            CartItem {
                id: ring,
                name: "Emerald Ring".to_owned(),
                price: Price::from_rupees(80_000),
                quantity: 1,
                image: String::new(),
            },
        ];

        let appt = req.validate(Utc::now()).unwrap();
        assert_eq!(appt.customer_name, "Asha Verma");
        assert_eq!(appt.customer_email.as_str(), "asha@example.com");
        assert_eq!(appt.cart_items.len(), 1);
        assert_eq!(appt.total_amount, Price::from_rupees(160_000));
        assert_eq!(appt.notes.as_deref(), Some("Looking for an engagement ring"));
        assert_eq!(appt.duration_minutes, DEFAULT_DURATION_MINUTES);
    }

    fn product(price: u32, active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            name: "Emerald Ring".to_owned(),
            description: "Colombian emerald in yellow gold.".to_owned(),
            price: Price::from_rupees(price),
            category: Category::Rings,
            stock_quantity: 2,
            images: vec![ProductImage {
                url: "https://images.example.com/emerald.jpg".to_owned(),
                alt: "Emerald Ring".to_owned(),
                is_primary: true,
            }],
            is_active: active,
            is_featured: false,
            is_new: false,
            popularity: 0,
            tags: vec![],
            specifications: Specifications::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reprice_ignores_client_name_price_and_image() {
        let ring = product(80_000, true);
        let mut req = request();
        req.cart_items = vec![CartItem {
            id: ring.id,
            name: "Free ring".to_owned(),
            price: Price::ZERO,
            quantity: 3,
            image: "javascript:x".to_owned(),
        }];

        req.reprice(std::slice::from_ref(&ring)).unwrap();
        let appt = req.validate(Utc::now()).unwrap();

        assert_eq!(appt.cart_items, vec![CartItem::from_product(&ring, 3)]);
        assert_eq!(appt.cart_items[0].image, "https://images.example.com/emerald.jpg");
        assert_eq!(appt.total_amount, Price::from_rupees(240_000));
    }

    #[test]
    fn test_reprice_rejects_unknown_and_inactive_products() {
        let retired = product(5_000, false);
        for catalog in [vec![], vec![retired.clone()]] {
            let mut req = request();
            req.cart_items = vec![CartItem::from_product(&retired, 1)];
            assert_eq!(
                req.reprice(&catalog).unwrap_err(),
                BookingError::UnavailableProduct(retired.id)
            );
        }
    }

    #[test]
    fn test_product_ids_are_distinct() {
        let ring = product(100, true);
        let studs = product(200, true);
        let mut req = request();
        req.cart_items = vec![
            CartItem::from_product(&ring, 1),
            CartItem::from_product(&studs, 1),
            CartItem::from_product(&ring, 2),
        ];
        assert_eq!(req.product_ids(), vec![ring.id, studs.id]);
    }

    #[test]
    fn test_total_past_max_is_rejected() {
        let mut req = request();
        let mut line = CartItem::from_product(&product(1, true), 2);
        line.price = Price::MAX;
        req.cart_items = vec![line];
        assert_eq!(req.validate(Utc::now()).unwrap_err(), BookingError::TotalTooLarge);
    }

    #[test]
    fn test_missing_information() {
        for strip in 0..5 {
            let mut req = request();
            match strip {
                0 => req.name = " ".to_owned(),
                1 => req.email.clear(),
                2 => req.phone.clear(),
                3 => req.date = None,
                _ => req.time.clear(),
            }
            assert_eq!(
                req.validate(Utc::now()).unwrap_err(),
                BookingError::MissingInformation
            );
        }
    }

    #[test]
    fn test_rejects_past_date() {
        let mut req = request();
        req.date = Some((Utc::now() - Duration::days(2)).date_naive());
        assert_eq!(req.validate(Utc::now()).unwrap_err(), BookingError::NotInFuture);
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut req = request();
        req.email = "asha@".to_owned();
        assert!(matches!(
            req.validate(Utc::now()),
            Err(BookingError::Email(_))
        ));

        let mut req = request();
        req.phone = "ring me".to_owned();
        assert_eq!(req.validate(Utc::now()).unwrap_err(), BookingError::Phone);

        let mut req = request();
        req.notes = Some("n".repeat(1001));
        assert_eq!(req.validate(Utc::now()).unwrap_err(), BookingError::NotesTooLong);

        let mut req = request();
        req.time = "08:00 PM".to_owned();
        assert!(matches!(
            req.validate(Utc::now()),
            Err(BookingError::InvalidTimeSlot(_))
        ));
    }

    #[test]
    fn test_schedule_requires_offered_slot() {
        let date = tomorrow();
        assert!(schedule(date, " 02:00 PM ", Utc::now()).is_ok());
        assert!(matches!(
            schedule(date, "02:30 PM", Utc::now()),
            Err(BookingError::InvalidTimeSlot(_))
        ));
    }

    #[test]
    fn test_empty_notes_dropped() {
        assert_eq!(normalize_notes(Some("   ".to_owned())).unwrap(), None);
    }
}
