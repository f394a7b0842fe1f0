//! Driver profiles and the availability gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DriverId;

/// Availability of a freshly created profile.
///
/// Drivers are closed until they opt in.
pub const DEFAULT_AVAILABILITY: bool = false;

/// Username used when the identity carries no email.
const FALLBACK_USERNAME: &str = "Usuario";

/// A driver's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    /// Driver identity.
    pub owner_id: DriverId,
    /// Short handle derived from the email.
    pub username: String,
    /// Name shown to customers.
    pub display_name: Option<String>,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Vehicle model.
    pub car_model: Option<String>,
    /// Vehicle plate.
    pub car_plate: Option<String>,
    /// Avatar URL.
    pub picture_url: Option<String>,
    /// Whether new trip requests may target this driver.
    pub available: bool,
    /// Cost settings used by the earnings report.
    #[serde(default)]
    pub costs: CostSettings,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

/// What the identity provider tells us about a driver on sign-in.
#[derive(Debug, Clone, Default)]
pub struct ProfileIdentity {
    /// Email from the token.
    pub email: Option<String>,
    /// Full name from the token metadata.
    pub display_name: Option<String>,
    /// Avatar URL from the token metadata.
    pub picture_url: Option<String>,
}

impl DriverProfile {
    /// Create a profile for a first sign-in.
    #[must_use]
    pub fn new(owner_id: DriverId, identity: &ProfileIdentity) -> Self {
        let now = Utc::now();
        let email = identity.email.clone().unwrap_or_default();
        let username = email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .unwrap_or(FALLBACK_USERNAME)
            .to_string();
        let display_name = identity
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(username.clone()));

        Self {
            owner_id,
            username,
            display_name,
            email,
            phone: None,
            car_model: None,
            car_plate: None,
            picture_url: identity.picture_url.clone(),
            available: DEFAULT_AVAILABILITY,
            costs: CostSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fill a missing display name (and avatar) from a later sign-in.
    ///
    /// Returns `true` if anything changed.
    pub fn backfill(&mut self, identity: &ProfileIdentity) -> bool {
        if self.display_name.is_some() {
            return false;
        }
        let Some(name) = identity
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            return false;
        };

        self.display_name = Some(name.to_string());
        if identity.picture_url.is_some() {
            self.picture_url.clone_from(&identity.picture_url);
        }
        self.updated_at = Utc::now();
        true
    }

    /// Name to show customers.
    #[must_use]
    pub fn public_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Case-insensitive substring match over name, vehicle and phone.
    ///
    /// A blank term matches every profile.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        [
            Some(self.username.as_str()),
            self.display_name.as_deref(),
            self.car_model.as_deref(),
            self.car_plate.as_deref(),
            self.phone.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }

    /// Flip the availability flag; existing trips are unaffected.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
        self.updated_at = Utc::now();
    }
}

/// Partial update of the editable profile fields.
///
/// `None` leaves a field alone; a blank string clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    /// New display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// New vehicle model.
    #[serde(default)]
    pub car_model: Option<String>,
    /// New vehicle plate.
    #[serde(default)]
    pub car_plate: Option<String>,
    /// New avatar URL.
    #[serde(default)]
    pub picture_url: Option<String>,
}

impl ProfilePatch {
    /// Whether the patch touches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.phone.is_none()
            && self.car_model.is_none()
            && self.car_plate.is_none()
            && self.picture_url.is_none()
    }

    /// Apply the patch to a profile.
    pub fn apply(&self, profile: &mut DriverProfile) {
        fn set(field: &mut Option<String>, value: Option<&String>) {
            if let Some(value) = value {
                let value = value.trim();
                *field = (!value.is_empty()).then(|| value.to_string());
            }
        }

        set(&mut profile.display_name, self.display_name.as_ref());
        set(&mut profile.phone, self.phone.as_ref());
        set(&mut profile.car_model, self.car_model.as_ref());
        set(&mut profile.car_plate, self.car_plate.as_ref());
        set(&mut profile.picture_url, self.picture_url.as_ref());
        profile.updated_at = Utc::now();
    }
}

/// A driver's running-cost settings, in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSettings {
    /// Cost of one gas fill, used when a gas expense has no amount.
    pub gas_unit_cost_cents: i64,
    /// Monthly insurance.
    pub insurance_monthly_cents: i64,
    /// Monthly registration.
    pub registration_monthly_cents: i64,
}

impl CostSettings {
    /// Fixed monthly costs.
    #[must_use]
    pub const fn fixed_monthly_cents(&self) -> i64 {
        self.insurance_monthly_cents + self.registration_monthly_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str, name: Option<&str>) -> ProfileIdentity {
        ProfileIdentity {
            email: Some(email.into()),
            display_name: name.map(String::from),
            picture_url: None,
        }
    }

    #[test]
    fn new_profile_is_closed() {
        let profile = DriverProfile::new(DriverId::generate(), &identity("ana@mail.com", None));
        assert!(!profile.available);
        assert_eq!(profile.username, "ana");
        assert_eq!(profile.public_name(), "ana");
    }

    #[test]
    fn username_falls_back_without_email() {
        let profile = DriverProfile::new(DriverId::generate(), &ProfileIdentity::default());
        assert_eq!(profile.username, "Usuario");
    }

    #[test]
    fn backfill_only_fills_missing_name() {
        let mut profile = DriverProfile::new(DriverId::generate(), &identity("ana@mail.com", None));
        profile.display_name = None;

        assert!(profile.backfill(&identity("ana@mail.com", Some("Ana Gomez"))));
        assert_eq!(profile.display_name.as_deref(), Some("Ana Gomez"));
        assert!(!profile.backfill(&identity("ana@mail.com", Some("Otra"))));
        assert_eq!(profile.display_name.as_deref(), Some("Ana Gomez"));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let mut profile =
            DriverProfile::new(DriverId::generate(), &identity("carlos@mail.com", Some("Carlos")));
        profile.car_model = Some("Toyota Corolla".into());
        profile.car_plate = Some("AB123CD".into());
        profile.phone = Some("+54 11 5555".into());

        assert!(profile.matches_search("corolla"));
        assert!(profile.matches_search("ab123"));
        assert!(profile.matches_search("5555"));
        assert!(profile.matches_search("  "));
        assert!(!profile.matches_search("fiat"));
    }

    #[test]
    fn patch_sets_and_clears() {
        let mut profile = DriverProfile::new(DriverId::generate(), &identity("a@b.c", None));
        profile.car_plate = Some("OLD".into());

        let patch = ProfilePatch {
            car_model: Some(" Fiat Cronos ".into()),
            car_plate: Some(String::new()),
            ..ProfilePatch::default()
        };
        patch.apply(&mut profile);

        assert_eq!(profile.car_model.as_deref(), Some("Fiat Cronos"));
        assert_eq!(profile.car_plate, None);
        assert!(ProfilePatch::default().is_empty());
    }
}
