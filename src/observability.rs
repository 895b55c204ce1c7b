use biometrics::{Collector, Counter, Moments};

pub(crate) static CHAT_TURNS: Counter = Counter::new("chatwidget.chat.turns");
pub(crate) static CHAT_TURN_FAILURES: Counter = Counter::new("chatwidget.chat.turn_failures");
pub(crate) static CHAT_SENDS_IGNORED: Counter = Counter::new("chatwidget.chat.sends_ignored");
pub(crate) static CHAT_TURN_DURATION: Moments =
    Moments::new("chatwidget.chat.turn_duration_seconds");

pub(crate) static PHOTO_UPLOADS: Counter = Counter::new("chatwidget.photo.uploads");
pub(crate) static PHOTO_UPLOAD_FAILURES: Counter = Counter::new("chatwidget.photo.upload_failures");

pub(crate) static STORAGE_WRITE_FAILURES: Counter =
    Counter::new("chatwidget.storage.write_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_FAILURES);
    collector.register_counter(&CHAT_SENDS_IGNORED);
    collector.register_moments(&CHAT_TURN_DURATION);

    collector.register_counter(&PHOTO_UPLOADS);
    collector.register_counter(&PHOTO_UPLOAD_FAILURES);

    collector.register_counter(&STORAGE_WRITE_FAILURES);
}
