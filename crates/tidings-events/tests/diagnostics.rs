//! The debug channel only speaks when diagnostics are enabled.

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tidings_events::{NativeRoot, Registry, RegistryConfig};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture(f: impl FnOnce()) -> String {
    let sink = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = sink.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn reports_emit_without_handlers() {
    let output = capture(|| {
        let events = Registry::new(RegistryConfig::default().with_debug(true));
        events.emit("ghost", vec![]);
    });
    assert!(output.contains("No event handlers registered for 'ghost'!"));
}

#[test]
fn reports_repeated_unique_emit() {
    let output = capture(|| {
        let events = Registry::new(RegistryConfig::unique().with_debug(true));
        events.on("ready", |_: &[Value]| Value::Null);
        events.emit("ready", vec![json!(1)]);
        events.emit("ready", vec![json!(2)]);
    });
    assert!(output.contains("Unique event 'ready' was already emitted!"));
}

#[test]
fn reports_invalid_event_name() {
    let output = capture(|| {
        let events = Registry::new(RegistryConfig::default().with_debug(true));
        assert!(events.on("", |_: &[Value]| Value::Null).is_none());
    });
    assert!(output.contains("Registered event is not a string!"));
}

#[test]
fn reports_missing_native_target() {
    let output = capture(|| {
        let events = Registry::new(RegistryConfig::default().with_debug(true));
        let root = Arc::new(NativeRoot::new());
        let registration = events
            .native_on("click", |_: &[Value]| Value::Null, root.clone())
            .unwrap();
        drop(root);
        assert!(!registration.unregister());
    });
    assert!(output.contains("Native target for 'click' no longer exists!"));
}

#[test]
fn silent_without_debug() {
    let output = capture(|| {
        let events = Registry::unique();
        events.emit("ghost", vec![]);
        events.emit("ghost", vec![]);
        events.on("", |_: &[Value]| Value::Null);
    });
    assert!(!output.contains("No event handlers registered"));
    assert!(!output.contains("already emitted"));
    assert!(!output.contains("is not a string"));
}
