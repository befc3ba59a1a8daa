use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Attribute, PrivacySettings};

/// Social standing of a viewer with respect to a profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    #[serde(rename = "self")]
    Myself,
    Connection,
    Public,
    Blocked,
}

/// Decides whether `viewer` may see `attribute` on `owner`'s profile.
///
/// Unknown attribute names are hidden unless the owner stored an explicit
/// `true` for them, and even then only connections see them.
pub fn can_view(
    attribute: &str,
    viewer: Uuid,
    owner: Uuid,
    relationship: Relationship,
    settings: &PrivacySettings,
) -> bool {
    if viewer == owner {
        return true;
    }

    let known = attribute.parse::<Attribute>().ok();
    let allowed = || {
        settings
            .get(attribute)
            .or(known.map(Attribute::default_visible))
            .unwrap_or(false)
    };

    match relationship {
        Relationship::Myself => true,
        Relationship::Blocked => false,
        Relationship::Connection => allowed(),
        Relationship::Public => allowed() && known.is_some_and(Attribute::is_public_safe),
    }
}

/// Typed form of [`can_view`].
pub fn can_view_attr(
    attribute: Attribute,
    viewer: Uuid,
    owner: Uuid,
    relationship: Relationship,
    settings: &PrivacySettings,
) -> bool {
    can_view(attribute.key(), viewer, owner, relationship, settings)
}
