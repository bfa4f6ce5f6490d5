//! Progress message de-duplication
//!
//! The poll loop re-reads the same status every tick, so naive printing
//! would repeat identical lines once per interval. The deduper remembers the
//! last message emitted per key and drops repeats.

use std::collections::HashMap;

/// Destination for user-visible progress lines.
pub trait ProgressSink {
    fn line(&mut self, message: &str);
}

/// Writes progress lines to stdout.
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn line(&mut self, message: &str) {
        println!("{}", message);
    }
}

/// Sink that records lines for assertions in tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn line(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}

/// Suppresses repeated identical notifications per key.
///
/// One instance lives for the duration of a single wait operation and is
/// discarded when the wait completes. No ordering guarantee exists across
/// keys beyond call order.
pub struct MessageDeduper<S> {
    sink: S,
    last: HashMap<String, String>,
}

impl<S: ProgressSink> MessageDeduper<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last: HashMap::new(),
        }
    }

    /// Emit the message unless it matches the last one emitted for this key.
    pub fn notify(&mut self, key: &str, message: String) {
        if self.last.get(key).is_some_and(|previous| *previous == message) {
            return;
        }
        self.sink.line(&message);
        self.last.insert(key.to_string(), message);
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_suppressed() {
        let mut deduper = MessageDeduper::new(RecordingSink::default());
        deduper.notify("Reconciling", "pkgi/foo: Reconciling".to_string());
        deduper.notify("Reconciling", "pkgi/foo: Reconciling".to_string());
        deduper.notify("Reconciling", "pkgi/foo: Reconciling".to_string());

        let sink = deduper.into_inner();
        assert_eq!(sink.lines, vec!["pkgi/foo: Reconciling"]);
    }

    #[test]
    fn test_changed_message_emitted_again() {
        let mut deduper = MessageDeduper::new(RecordingSink::default());
        deduper.notify("status", "pkgi/foo: Reconciling".to_string());
        deduper.notify("status", "pkgi/foo: ReconcileSucceeded".to_string());
        deduper.notify("status", "pkgi/foo: ReconcileSucceeded".to_string());

        let sink = deduper.into_inner();
        assert_eq!(
            sink.lines,
            vec!["pkgi/foo: Reconciling", "pkgi/foo: ReconcileSucceeded"]
        );
    }

    #[test]
    fn test_keys_independent() {
        let mut deduper = MessageDeduper::new(RecordingSink::default());
        deduper.notify("a", "first".to_string());
        deduper.notify("b", "second".to_string());
        deduper.notify("a", "first".to_string());

        let sink = deduper.into_inner();
        assert_eq!(sink.lines, vec!["first", "second"]);
    }
}
