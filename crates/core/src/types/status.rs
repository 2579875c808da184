//! Enumerations stored as Postgres enum types.
//!
//! Every enum serializes in lowercase `snake_case`, accepts case-insensitive
//! input through [`FromStr`](std::str::FromStr), and (with the `postgres`
//! feature) maps onto the matching database enum.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Generates `as_str`, `ALL`, `Display` and case-insensitive `FromStr`.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The lowercase wire/database representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase();
                match needle.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_category", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Rings,
    Necklaces,
    Earrings,
    Bracelets,
    Pendants,
    Chains,
    Watches,
    Accessories,
}

string_enum!(Category, "category", {
    Rings => "rings",
    Necklaces => "necklaces",
    Earrings => "earrings",
    Bracelets => "bracelets",
    Pendants => "pendants",
    Chains => "chains",
    Watches => "watches",
    Accessories => "accessories",
});

impl Category {
    /// Display label with the first letter capitalized (`Rings`).
    #[must_use]
    pub fn label(&self) -> String {
        capitalize(self.as_str())
    }
}

/// Capitalize the first character and lowercase the rest.
///
/// Used to normalize free-form category names for display and counting.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.trim().chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

string_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

impl Role {
    /// Whether this role grants back-office access.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "appointment_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

string_enum!(AppointmentStatus, "appointment status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Kind of appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "appointment_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    Repair,
    CustomDesign,
    Valuation,
}

string_enum!(AppointmentType, "appointment type", {
    Consultation => "consultation",
    Repair => "repair",
    CustomDesign => "custom_design",
    Valuation => "valuation",
});

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Rings".parse::<Category>().unwrap(), Category::Rings);
        assert_eq!(" NECKLACES ".parse::<Category>().unwrap(), Category::Necklaces);
        assert!("tiaras".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_label() {
        assert_eq!(Category::Earrings.label(), "Earrings");
        assert_eq!(capitalize("bRACELETS"), "Bracelets");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_display_matches_serde() {
        for ty in AppointmentType::ALL {
            let json = serde_json::to_string(ty).unwrap();
            assert_eq!(json, format!("\"{ty}\""));
        }
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Role::default(), Role::User);
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Pending);
        assert_eq!(AppointmentType::default(), AppointmentType::Consultation);
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = "archived".parse::<AppointmentStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid appointment status: archived");
    }
}
