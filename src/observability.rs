use biometrics::{Collector, Counter};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("ollamus.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("ollamus.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("ollamus.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("ollamus.stream.errors");

pub(crate) static TURNS_COMPLETED: Counter = Counter::new("ollamus.turn.completed");
pub(crate) static TURNS_FAILED: Counter = Counter::new("ollamus.turn.failed");

pub(crate) static RENDER_CALLS: Counter = Counter::new("ollamus.render.calls");
pub(crate) static IMPORT_FAILURES: Counter = Counter::new("ollamus.import.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&TURNS_COMPLETED);
    collector.register_counter(&TURNS_FAILED);

    collector.register_counter(&RENDER_CALLS);
    collector.register_counter(&IMPORT_FAILURES);
}
