//! Subject keys.

/// Subject used by handlers that declare none, by plain `post` and by dead events.
pub const DEFAULT_SUBJECT: &str = "event.subject.default";

/// Reserved subject observers listen on.
pub const OBSERVER_SUBJECT: &str = "herald.observer.__notification__";
