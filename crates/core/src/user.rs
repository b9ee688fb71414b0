//! User records and profile edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// Taste preferences offered on the registration and profile forms.
pub const PREFERENCE_OPTIONS: &[&str] = &[
    "Fruity", "Sweet", "Sour", "Spicy", "Creamy", "Fresh", "Tropical", "Classic",
];

/// A registered customer.
///
/// Serialized with camelCase field names; this is the shape of each entry
/// in the persisted `users` array and of the `currentUser` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub preferences: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Profile fields supplied at registration.
///
/// Everything a [`User`] carries except the identifier and creation
/// timestamp, which the profile store assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl NewUser {
    /// Complete the record with its assigned identity.
    #[must_use]
    pub fn into_user(self, id: UserId, created_at: DateTime<Utc>) -> User {
        User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            address: self.address,
            date_of_birth: self.date_of_birth,
            preferences: self.preferences,
            created_at,
        }
    }
}

/// A partial profile edit.
///
/// `None` leaves the field untouched. The email, identifier and creation
/// time are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub preferences: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Merge the provided fields into `user`.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(first_name) = &self.first_name {
            user.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &self.last_name {
            user.last_name.clone_from(last_name);
        }
        if let Some(phone) = &self.phone {
            user.phone.clone_from(phone);
        }
        if let Some(address) = &self.address {
            user.address.clone_from(address);
        }
        if let Some(date_of_birth) = &self.date_of_birth {
            user.date_of_birth.clone_from(date_of_birth);
        }
        if let Some(preferences) = &self.preferences {
            user.preferences.clone_from(preferences);
        }
    }

    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.date_of_birth.is_none()
            && self.preferences.is_none()
    }
}
