//! Status composition -- label + permanent icons + manual overrides.
//!
//! Composition is a pure function of its inputs. Manual status expiry is
//! evaluated against the `now` the caller passes in; nothing here reads a
//! clock or runs a timer.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Shown before tracking has started.
pub const LOADING_PLACEHOLDER: &str = "Loading...";
/// Shown once tracking runs but no location has been resolved yet.
pub const WAITING_PLACEHOLDER: &str = "Waiting for location...";
/// Shown when the selected geocoder cannot be used at all.
pub const UNAVAILABLE_PLACEHOLDER: &str = "Location unavailable";
/// Manual statuses kept at once; the oldest is dropped beyond this.
pub const MANUAL_STACK_LIMIT: usize = 16;

/// One input to a composed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContribution {
    pub text: String,
    pub icon: String,
    #[serde(default)]
    pub is_permanent: bool,
    /// 0 means no expiry.
    #[serde(default)]
    pub expiration_seconds: i64,
}

impl StatusContribution {
    /// An always-appended icon.
    pub fn permanent_icon(icon: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            icon: icon.into(),
            is_permanent: true,
            expiration_seconds: 0,
        }
    }

    /// A user-set override.
    pub fn manual(text: impl Into<String>, icon: impl Into<String>, expiration_seconds: i64) -> Self {
        Self {
            text: text.into(),
            icon: icon.into(),
            is_permanent: false,
            expiration_seconds,
        }
    }
}

/// A manual contribution pinned to the instant it was set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualStatus {
    pub contribution: StatusContribution,
    pub set_at: DateTime<Utc>,
}

impl ManualStatus {
    pub fn activate(contribution: StatusContribution, now: DateTime<Utc>) -> Self {
        Self {
            contribution,
            set_at: now,
        }
    }

    /// `None` for no expiry, including an expiry too far out to represent.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.contribution.expiration_seconds <= 0 {
            return None;
        }
        let delta = TimeDelta::try_seconds(self.contribution.expiration_seconds)?;
        self.set_at.checked_add_signed(delta)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// Drop manual statuses whose expiry has passed.
pub fn prune_expired(manual: &mut Vec<ManualStatus>, now: DateTime<Utc>) {
    manual.retain(|m| !m.is_expired(now));
}

/// Make `status` the newest entry. An older entry with the same text is
/// replaced, and the stack never exceeds [`MANUAL_STACK_LIMIT`].
pub fn push_manual(manual: &mut Vec<ManualStatus>, status: ManualStatus) {
    manual.retain(|m| m.contribution.text != status.contribution.text);
    if manual.len() >= MANUAL_STACK_LIMIT {
        let excess = manual.len() + 1 - MANUAL_STACK_LIMIT;
        manual.drain(..excess);
    }
    manual.push(status);
}

/// The value handed to the presence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedStatus {
    pub text: String,
    pub icon: String,
    /// Unix timestamp (seconds) when the service should clear the status;
    /// 0 for none.
    pub expiration: i64,
}

impl ComposedStatus {
    /// The empty status, which clears presence.
    pub fn cleared() -> Self {
        Self {
            text: String::new(),
            icon: String::new(),
            expiration: 0,
        }
    }
}

/// Compose the outgoing status.
///
/// `manual` is ordered oldest to newest; the newest unexpired entry takes
/// precedence over the location label. Permanent icons follow any manual
/// icon, in configured order, without duplicates.
pub fn compose(
    label: Option<&str>,
    permanent: &[StatusContribution],
    manual: &[ManualStatus],
    now: DateTime<Utc>,
) -> ComposedStatus {
    let active = manual.iter().rev().find(|m| !m.is_expired(now));

    let (text, lead_icon, expiration) = match active {
        Some(m) => (
            m.contribution.text.clone(),
            Some(m.contribution.icon.as_str()),
            m.expires_at().map(|at| at.timestamp()).unwrap_or(0),
        ),
        None => (
            label.unwrap_or(WAITING_PLACEHOLDER).to_string(),
            None,
            0,
        ),
    };

    let mut icons: Vec<&str> = Vec::new();
    let candidates = lead_icon
        .into_iter()
        .chain(permanent.iter().map(|p| p.icon.as_str()));
    for icon in candidates {
        let icon = icon.trim();
        if !icon.is_empty() && !icons.contains(&icon) {
            icons.push(icon);
        }
    }

    ComposedStatus {
        text,
        icon: icons.concat(),
        expiration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn permanent() -> Vec<StatusContribution> {
        vec![
            StatusContribution::permanent_icon(":zoom:"),
            StatusContribution::permanent_icon(":around:"),
        ]
    }

    #[test]
    fn label_with_permanent_icons() {
        let status = compose(Some("Office"), &permanent(), &[], t0());
        assert_eq!(
            status,
            ComposedStatus {
                text: "Office".into(),
                icon: ":zoom::around:".into(),
                expiration: 0,
            }
        );
    }

    #[test]
    fn placeholder_before_first_label() {
        let status = compose(None, &[], &[], t0());
        assert_eq!(status.text, WAITING_PLACEHOLDER);
        assert_eq!(status.icon, "");
    }

    #[test]
    fn manual_override_until_expiry() {
        let meeting = ManualStatus::activate(
            StatusContribution::manual("In a meeting", ":calendar:", 1800),
            t0(),
        );
        let manual = vec![meeting];

        let during = compose(Some("Office"), &permanent(), &manual, t0() + TimeDelta::seconds(1799));
        assert_eq!(during.text, "In a meeting");
        assert_eq!(during.icon, ":calendar::zoom::around:");
        assert_eq!(during.expiration, (t0() + TimeDelta::seconds(1800)).timestamp());

        let after = compose(Some("Office"), &permanent(), &manual, t0() + TimeDelta::seconds(1800));
        assert_eq!(after.text, "Office");
        assert_eq!(after.icon, ":zoom::around:");
        assert_eq!(after.expiration, 0);
    }

    #[test]
    fn newest_unexpired_manual_wins() {
        let lunch = ManualStatus::activate(StatusContribution::manual("Lunch", ":pizza:", 0), t0());
        let call = ManualStatus::activate(
            StatusContribution::manual("On a call", ":phone:", 60),
            t0() + TimeDelta::seconds(10),
        );
        let manual = vec![lunch, call];

        assert_eq!(compose(None, &[], &manual, t0() + TimeDelta::seconds(20)).text, "On a call");
        assert_eq!(compose(None, &[], &manual, t0() + TimeDelta::seconds(100)).text, "Lunch");
    }

    #[test]
    fn icons_are_deduplicated() {
        let manual = vec![ManualStatus::activate(
            StatusContribution::manual("Pairing", ":zoom:", 0),
            t0(),
        )];
        let mut perm = permanent();
        perm.push(StatusContribution::permanent_icon(":around:"));
        perm.push(StatusContribution::permanent_icon(""));
        assert_eq!(compose(None, &perm, &manual, t0()).icon, ":zoom::around:");
    }

    #[test]
    fn compose_is_deterministic() {
        let manual = vec![ManualStatus::activate(
            StatusContribution::manual("Focus", ":headphones:", 900),
            t0(),
        )];
        let now = t0() + TimeDelta::seconds(5);
        assert_eq!(
            compose(Some("Home"), &permanent(), &manual, now),
            compose(Some("Home"), &permanent(), &manual, now)
        );
    }

    #[test]
    fn prune_removes_only_expired() {
        let mut manual = vec![
            ManualStatus::activate(StatusContribution::manual("a", "", 10), t0()),
            ManualStatus::activate(StatusContribution::manual("b", "", 0), t0()),
        ];
        prune_expired(&mut manual, t0() + TimeDelta::seconds(11));
        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0].contribution.text, "b");
    }

    #[test]
    fn unrepresentable_expiry_means_none() {
        let huge = ManualStatus::activate(StatusContribution::manual("Away", "", i64::MAX), t0());
        assert_eq!(huge.expires_at(), None);
        assert!(!huge.is_expired(t0()));

        let status = compose(Some("Office"), &[], &[huge], t0());
        assert_eq!(status.text, "Away");
        assert_eq!(status.expiration, 0);
    }

    #[test]
    fn push_manual_replaces_same_text() {
        let mut manual = Vec::new();
        push_manual(&mut manual, ManualStatus::activate(StatusContribution::manual("Lunch", "", 0), t0()));
        push_manual(&mut manual, ManualStatus::activate(StatusContribution::manual("Focus", "", 0), t0()));
        push_manual(
            &mut manual,
            ManualStatus::activate(StatusContribution::manual("Lunch", ":pizza:", 0), t0()),
        );

        let texts: Vec<_> = manual.iter().map(|m| m.contribution.text.as_str()).collect();
        assert_eq!(texts, vec!["Focus", "Lunch"]);
        assert_eq!(manual[1].contribution.icon, ":pizza:");
    }

    #[test]
    fn push_manual_caps_stack() {
        let mut manual = Vec::new();
        for i in 0..MANUAL_STACK_LIMIT + 5 {
            push_manual(
                &mut manual,
                ManualStatus::activate(StatusContribution::manual(format!("s{i}"), "", 0), t0()),
            );
        }
        assert_eq!(manual.len(), MANUAL_STACK_LIMIT);
        assert_eq!(manual[0].contribution.text, "s5");
        assert_eq!(
            manual.last().unwrap().contribution.text,
            format!("s{}", MANUAL_STACK_LIMIT + 4)
        );
    }
}
