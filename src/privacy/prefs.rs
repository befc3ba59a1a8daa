use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PrivacySettings;

/// Owner-controlled switches for how other alumni may reach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preference {
    AllowDirectMessages,
    AllowMentorRequests,
    AllowJobOpportunities,
    AllowEventInvites,
    AllowAlumniSearch,
    AllowLocationSharing,
    AllowActivityStatus,
    AllowReadReceipts,
    AllowAnalyticsTracking,
    AllowMarketingEmails,
    AllowPushNotifications,
    AllowDataExport,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown preference `{0}`")]
pub struct UnknownPreference(pub String);

impl Preference {
    pub const ALL: [Preference; 12] = [
        Preference::AllowDirectMessages,
        Preference::AllowMentorRequests,
        Preference::AllowJobOpportunities,
        Preference::AllowEventInvites,
        Preference::AllowAlumniSearch,
        Preference::AllowLocationSharing,
        Preference::AllowActivityStatus,
        Preference::AllowReadReceipts,
        Preference::AllowAnalyticsTracking,
        Preference::AllowMarketingEmails,
        Preference::AllowPushNotifications,
        Preference::AllowDataExport,
    ];

    pub fn key(self) -> &'static str {
        use Preference::*;
        match self {
            AllowDirectMessages => "allowDirectMessages",
            AllowMentorRequests => "allowMentorRequests",
            AllowJobOpportunities => "allowJobOpportunities",
            AllowEventInvites => "allowEventInvites",
            AllowAlumniSearch => "allowAlumniSearch",
            AllowLocationSharing => "allowLocationSharing",
            AllowActivityStatus => "allowActivityStatus",
            AllowReadReceipts => "allowReadReceipts",
            AllowAnalyticsTracking => "allowAnalyticsTracking",
            AllowMarketingEmails => "allowMarketingEmails",
            AllowPushNotifications => "allowPushNotifications",
            AllowDataExport => "allowDataExport",
        }
    }

    pub fn legacy_key(self) -> &'static str {
        use Preference::*;
        match self {
            AllowDirectMessages => "allow_direct_messages",
            AllowMentorRequests => "allow_mentor_requests",
            AllowJobOpportunities => "allow_job_opportunities",
            AllowEventInvites => "allow_event_invites",
            AllowAlumniSearch => "allow_alumni_search",
            AllowLocationSharing => "allow_location_sharing",
            AllowActivityStatus => "allow_activity_status",
            AllowReadReceipts => "allow_read_receipts",
            AllowAnalyticsTracking => "allow_analytics_tracking",
            AllowMarketingEmails => "allow_marketing_emails",
            AllowPushNotifications => "allow_push_notifications",
            AllowDataExport => "allow_data_export",
        }
    }

    /// Mentoring is opt-in; tracking of presence and location is off.
    pub fn default_enabled(self) -> bool {
        use Preference::*;
        !matches!(
            self,
            AllowMentorRequests | AllowLocationSharing | AllowActivityStatus | AllowMarketingEmails
        )
    }
}

impl FromStr for Preference {
    type Err = UnknownPreference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preference::ALL
            .into_iter()
            .find(|pref| pref.key() == s || pref.legacy_key() == s)
            .ok_or_else(|| UnknownPreference(s.to_owned()))
    }
}

/// What a notification is about; decides which preference guards it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Message,
    MentorshipRequest,
    ConnectionRequest,
    JobOpportunity,
    EventInvite,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Message => "message",
            NotificationKind::MentorshipRequest => "mentorshipRequest",
            NotificationKind::ConnectionRequest => "connectionRequest",
            NotificationKind::JobOpportunity => "jobOpportunity",
            NotificationKind::EventInvite => "eventInvite",
        }
    }

    fn guard(self) -> Option<Preference> {
        match self {
            NotificationKind::Message => Some(Preference::AllowDirectMessages),
            NotificationKind::MentorshipRequest => Some(Preference::AllowMentorRequests),
            NotificationKind::ConnectionRequest => None,
            NotificationKind::JobOpportunity => Some(Preference::AllowJobOpportunities),
            NotificationKind::EventInvite => Some(Preference::AllowEventInvites),
        }
    }
}

/// Decides whether a recipient with `settings` gets a notification of `kind`.
pub fn should_notify(kind: NotificationKind, settings: &PrivacySettings) -> bool {
    settings.allows(Preference::AllowPushNotifications)
        && kind.guard().is_none_or(|pref| settings.allows(pref))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_privacy_first_table() {
        let off: Vec<_> = Preference::ALL
            .into_iter()
            .filter(|p| !p.default_enabled())
            .collect();
        assert_eq!(
            off,
            vec![
                Preference::AllowMentorRequests,
                Preference::AllowLocationSharing,
                Preference::AllowActivityStatus,
                Preference::AllowMarketingEmails,
            ]
        );
    }

    #[test]
    fn parses_legacy_keys() {
        assert_eq!(
            "allow_read_receipts".parse::<Preference>().unwrap(),
            Preference::AllowReadReceipts
        );
        assert!("allow_everything".parse::<Preference>().is_err());
    }

    #[rstest]
    #[case(NotificationKind::Message, true)]
    #[case(NotificationKind::ConnectionRequest, true)]
    #[case(NotificationKind::JobOpportunity, true)]
    #[case(NotificationKind::EventInvite, true)]
    #[case(NotificationKind::MentorshipRequest, false)]
    fn default_settings_notify(#[case] kind: NotificationKind, #[case] expected: bool) {
        assert_eq!(should_notify(kind, &PrivacySettings::default()), expected);
    }

    #[test]
    fn push_switch_silences_everything() {
        let settings = PrivacySettings::from_iter([
            ("allowPushNotifications".to_owned(), false),
            ("allowMentorRequests".to_owned(), true),
        ]);
        assert!(!should_notify(NotificationKind::ConnectionRequest, &settings));
        assert!(!should_notify(NotificationKind::MentorshipRequest, &settings));
    }

    #[test]
    fn kind_preference_is_respected() {
        let settings = PrivacySettings::from_iter([("allow_direct_messages".to_owned(), false)]);
        assert!(!should_notify(NotificationKind::Message, &settings));
        assert!(should_notify(NotificationKind::EventInvite, &settings));
    }
}
