//! Every public call reports its completion, whatever path it took.

use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;

use trace_trees::{Engine, TreeConfig, TreeKind};

/// A layer that keeps the message of every event it sees.
#[derive(Clone, Default)]
struct EventCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor(Option<String>);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.messages.lock().unwrap().push(message);
        }
    }
}

fn captured_messages(f: impl FnOnce()) -> Vec<String> {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    let messages = capture.messages.lock().unwrap().clone();
    messages
}

fn count(messages: &[String], wanted: &str) -> usize {
    messages.iter().filter(|message| *message == wanted).count()
}

#[test]
fn every_insert_reports_completion() {
    for kind in TreeKind::ALL {
        let messages = captured_messages(|| {
            let mut tree = TreeConfig::new(kind).build::<i32>().unwrap();
            // Into an empty tree, a regular insert, then a duplicate.
            tree.insert(1);
            tree.insert(2);
            tree.insert(1);
        });
        assert_eq!(count(&messages, "insert done"), 3, "{kind}");
    }
}

#[test]
fn every_delete_and_search_reports_completion() {
    for kind in TreeKind::ALL {
        let messages = captured_messages(|| {
            let mut tree = TreeConfig::new(kind).build::<i32>().unwrap();
            tree.delete(&1);
            tree.search(&1);
            tree.insert(1);
            tree.delete(&2);
            tree.search(&2);
            tree.delete(&1);
        });
        assert_eq!(count(&messages, "delete done"), 3, "{kind}");
        assert_eq!(count(&messages, "search done"), 2, "{kind}");
    }
}

#[test]
fn structural_events_are_logged() {
    let messages = captured_messages(|| {
        let mut tree = TreeConfig::new(TreeKind::BTree).build::<i32>().unwrap();
        for key in [10, 20, 30] {
            tree.insert(key);
        }
        tree.delete(&10);
    });
    assert_eq!(count(&messages, "split grew a new root"), 1);
    assert_eq!(count(&messages, "merge"), 1);
    assert_eq!(count(&messages, "root collapse"), 1);
}
