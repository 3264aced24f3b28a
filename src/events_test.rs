use std::cell::Cell;

use super::*;

#[test]
fn affects_matches_same_area_and_key() {
    let event = StorageEvent::new(StorageArea::Local, "theme", Some("\"dark\"".to_owned()));
    assert!(event.affects(StorageArea::Local, "theme"));
    assert!(!event.affects(StorageArea::Local, "other"));
    assert!(!event.affects(StorageArea::Session, "theme"));
}

#[test]
fn cleared_event_affects_every_key_of_its_area() {
    let event = StorageEvent::cleared(StorageArea::Session);
    assert!(event.affects(StorageArea::Session, "a"));
    assert!(event.affects(StorageArea::Session, "b"));
    assert!(!event.affects(StorageArea::Local, "a"));
}

#[test]
fn event_serializes_with_lowercase_area() {
    let event = StorageEvent::new(StorageArea::Local, "k", None).with_old_value(Some("1".to_owned()));
    let json = serde_json::to_value(&event).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({"area": "local", "key": "k", "old_value": "1", "new_value": null})
    );
}

#[test]
fn subscription_runs_teardown_once() {
    let calls = Rc::new(Cell::new(0));
    let sub = {
        let calls = Rc::clone(&calls);
        Subscription::new(move || calls.set(calls.get() + 1))
    };
    sub.unsubscribe();
    assert_eq!(calls.get(), 1);
}

#[test]
fn dropping_subscription_runs_teardown() {
    let calls = Rc::new(Cell::new(0));
    {
        let calls = Rc::clone(&calls);
        let _sub = Subscription::new(move || calls.set(calls.get() + 1));
    }
    assert_eq!(calls.get(), 1);
}

#[test]
fn detached_subscription_is_inert() {
    let sub = Subscription::detached();
    assert!(format!("{sub:?}").contains("active: false"));
    sub.unsubscribe();
}
