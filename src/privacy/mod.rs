//! Who may see which part of a profile.
//!
//! Every rendering of another alumnus' data goes through [`can_view`]; the
//! owner's flags live in a single [`PrivacySettings`] map that also carries
//! the communication [`Preference`]s.

mod attribute;
mod gate;
mod prefs;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use attribute::{Attribute, UnknownAttribute};
pub use gate::{Relationship, can_view, can_view_attr};
pub use prefs::{NotificationKind, Preference, UnknownPreference, should_notify};

/// Owner's visibility flags and preferences, keyed by canonical name.
///
/// Keys written in the older snake-case style are normalised on the way in,
/// so `show_email` and `email` address the same flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct PrivacySettings(BTreeMap<String, bool>);

fn canonical(key: &str) -> &str {
    if let Ok(attr) = key.parse::<Attribute>() {
        attr.key()
    } else if let Ok(pref) = key.parse::<Preference>() {
        pref.key()
    } else {
        key
    }
}

impl PrivacySettings {
    /// The explicitly stored flag, if any.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(canonical(key)).copied()
    }

    pub fn set(&mut self, key: &str, value: bool) {
        self.0.insert(canonical(key).to_owned(), value);
    }

    /// Effective visibility flag of `attr`, falling back to its default.
    pub fn shows(&self, attr: Attribute) -> bool {
        self.get(attr.key()).unwrap_or(attr.default_visible())
    }

    /// Effective value of `pref`, falling back to its default.
    pub fn allows(&self, pref: Preference) -> bool {
        self.get(pref.key()).unwrap_or(pref.default_enabled())
    }

    /// Overlays `other` onto `self`; keys absent from `other` keep their value.
    pub fn merge(&mut self, other: PrivacySettings) {
        self.0.extend(other.0);
    }

    /// Every known flag with its effective value, plus any stored extras.
    pub fn resolved(&self) -> BTreeMap<String, bool> {
        let mut all = self.0.clone();
        for attr in Attribute::ALL {
            all.insert(attr.key().to_owned(), self.shows(attr));
        }
        for pref in Preference::ALL {
            all.insert(pref.key().to_owned(), self.allows(pref));
        }
        all
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stored keys that name neither an attribute nor a preference.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| k.parse::<Attribute>().is_err() && k.parse::<Preference>().is_err())
    }
}

impl FromIterator<(String, bool)> for PrivacySettings {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        let mut settings = PrivacySettings::default();
        for (key, value) in iter {
            settings.set(&key, value);
        }
        settings
    }
}

impl From<BTreeMap<String, bool>> for PrivacySettings {
    fn from(map: BTreeMap<String, bool>) -> Self {
        // a canonical key outranks a legacy spelling of the same flag
        let (current, legacy): (Vec<_>, Vec<_>) = map.into_iter().partition(|(k, _)| canonical(k) == k);
        legacy.into_iter().chain(current).collect()
    }
}

impl From<PrivacySettings> for BTreeMap<String, bool> {
    fn from(settings: PrivacySettings) -> Self {
        settings.0
    }
}
