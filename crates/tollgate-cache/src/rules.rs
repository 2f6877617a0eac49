//! Which notifications invalidate which cache entries.

use std::fmt;

use tollgate_core::{Notification, NotificationEvent};

/// Events a rule reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventMatch {
    Any,
    UpdateOrDelete,
}

impl EventMatch {
    pub fn matches(&self, event: NotificationEvent) -> bool {
        match self {
            EventMatch::Any => true,
            EventMatch::UpdateOrDelete => event.is_update_or_delete(),
        }
    }
}

/// Invalidation to perform when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// Drop the plan cached for `account_id`.
    Account,
    /// Drop every account cached on plan `entity_id`.
    Plan,
    /// Drop everything cached for `api_id`: libraries, endpoints and hosts.
    Api,
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidation::Account => f.write_str("account"),
            Invalidation::Plan => f.write_str("plan"),
            Invalidation::Api => f.write_str("api"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRule {
    pub table: String,
    pub events: EventMatch,
    pub action: Invalidation,
}

impl InvalidationRule {
    pub fn new(table: impl Into<String>, events: EventMatch, action: Invalidation) -> Self {
        Self {
            table: table.into(),
            events,
            action,
        }
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        self.table == notification.table && self.events.matches(notification.event)
    }
}

/// Ordered rule list. The first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<InvalidationRule>,
}

impl RuleTable {
    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The gateway's rules.
    ///
    /// Inserts into `apis`, `environments`, `proxy_endpoint_components` and
    /// `remote_endpoints` cannot affect anything already cached, so only
    /// updates and deletes on those tables invalidate.
    pub fn standard() -> Self {
        use EventMatch::{Any, UpdateOrDelete};
        use Invalidation::{Account, Api, Plan};

        Self::empty()
            .with_rule(InvalidationRule::new("accounts", Any, Account))
            .with_rule(InvalidationRule::new("plans", Any, Plan))
            .with_rule(InvalidationRule::new("hosts", Any, Api))
            .with_rule(InvalidationRule::new("apis", UpdateOrDelete, Api))
            .with_rule(InvalidationRule::new("environments", UpdateOrDelete, Api))
            .with_rule(InvalidationRule::new("libraries", Any, Api))
            .with_rule(InvalidationRule::new("proxy_endpoint_schemas", Any, Api))
            .with_rule(InvalidationRule::new("proxy_endpoint_components", UpdateOrDelete, Api))
            .with_rule(InvalidationRule::new("remote_endpoints", UpdateOrDelete, Api))
            .with_rule(InvalidationRule::new("proxy_endpoints", Any, Api))
    }

    #[must_use]
    pub fn with_rule(mut self, rule: InvalidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[InvalidationRule] {
        &self.rules
    }

    pub fn resolve(&self, notification: &Notification) -> Option<Invalidation> {
        self.rules
            .iter()
            .find(|rule| rule.matches(notification))
            .map(|rule| rule.action)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let rules = RuleTable::standard();
        let cases = [
            (Notification::update("accounts"), Some(Invalidation::Account)),
            (Notification::delete("plans"), Some(Invalidation::Plan)),
            (Notification::insert("hosts"), Some(Invalidation::Api)),
            (Notification::update("apis"), Some(Invalidation::Api)),
            (Notification::delete("apis"), Some(Invalidation::Api)),
            (Notification::insert("apis"), None),
            (Notification::insert("environments"), None),
            (Notification::insert("libraries"), Some(Invalidation::Api)),
            (Notification::insert("proxy_endpoint_schemas"), Some(Invalidation::Api)),
            (Notification::insert("proxy_endpoint_components"), None),
            (Notification::delete("remote_endpoints"), Some(Invalidation::Api)),
            (Notification::insert("proxy_endpoints"), Some(Invalidation::Api)),
            (Notification::update("users"), None),
        ];

        for (notification, expected) in cases {
            assert_eq!(
                rules.resolve(&notification),
                expected,
                "{} {}",
                notification.table,
                notification.event
            );
        }
    }

    #[test]
    fn test_unknown_event_only_matches_any() {
        let rules = RuleTable::standard();
        let unknown = Notification::new("apis", NotificationEvent::Unknown);
        assert_eq!(rules.resolve(&unknown), None);

        let unknown = Notification::new("libraries", NotificationEvent::Unknown);
        assert_eq!(rules.resolve(&unknown), Some(Invalidation::Api));
    }

    #[test]
    fn test_first_match_wins() {
        let rules = RuleTable::empty()
            .with_rule(InvalidationRule::new("apis", EventMatch::Any, Invalidation::Plan))
            .with_rule(InvalidationRule::new("apis", EventMatch::Any, Invalidation::Api));

        assert_eq!(rules.resolve(&Notification::insert("apis")), Some(Invalidation::Plan));
        assert_eq!(rules.rules().len(), 2);
        assert_eq!(RuleTable::empty().resolve(&Notification::insert("apis")), None);
    }
}
