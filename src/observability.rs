use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("easydiet.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("easydiet.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("easydiet.client.request_duration_seconds");

pub(crate) static AUTH_REQUESTS: Counter = Counter::new("easydiet.auth.requests");
pub(crate) static AUTH_FAILURES: Counter = Counter::new("easydiet.auth.failures");
pub(crate) static AUTH_REFRESHES: Counter = Counter::new("easydiet.auth.refreshes");
pub(crate) static AUTH_STATE_CHANGES: Counter = Counter::new("easydiet.auth.state_changes");

pub(crate) static GUARD_REDIRECTS: Counter = Counter::new("easydiet.guard.redirects");

pub(crate) static CHAT_MESSAGES_SENT: Counter = Counter::new("easydiet.chat.messages_sent");
pub(crate) static CHAT_CONVERSATIONS_CREATED: Counter =
    Counter::new("easydiet.chat.conversations_created");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&AUTH_REQUESTS);
    collector.register_counter(&AUTH_FAILURES);
    collector.register_counter(&AUTH_REFRESHES);
    collector.register_counter(&AUTH_STATE_CHANGES);

    collector.register_counter(&GUARD_REDIRECTS);

    collector.register_counter(&CHAT_MESSAGES_SENT);
    collector.register_counter(&CHAT_CONVERSATIONS_CREATED);
}
