use std::cell::Cell;

use super::*;
use crate::reactive::RuntimeError;
use crate::storage::memory::{MemoryBrowser, MemoryStorage};

// =============================================================
// Builder
// =============================================================

#[test]
fn builder_defaults_to_default_config() {
    let cx = StorageContext::builder().build();
    assert_eq!(*cx.config(), ContextConfig::default());
    assert!(cx.events().is_none());
    assert!(matches!(
        cx.backend(StorageArea::Local),
        Err(StorageError::Unavailable { area: StorageArea::Local })
    ));
}

#[test]
fn memory_context_wires_both_areas_and_events() {
    let browser = MemoryBrowser::new();
    let window = browser.open_window();
    let cx = StorageContext::memory(&window);
    assert!(cx.backend(StorageArea::Local).is_ok());
    assert!(cx.backend(StorageArea::Session).is_ok());
    assert!(cx.events().is_some());
    assert!(format!("{cx:?}").contains("events: true"));
}

#[test]
fn config_flush_limit_reaches_runtime() {
    let cx = StorageContext::builder()
        .config(ContextConfig { flush_limit: 3, storage_sync: true })
        .build();
    let signal = Signal::new(cx.runtime(), 0_u32);
    {
        let signal = signal.clone();
        cx.runtime().create_effect(move || {
            let next = signal.get() + 1;
            signal.set(next);
        });
    }
    let err = cx.flush().expect_err("limit");
    assert!(matches!(err, Error::Runtime(RuntimeError::FlushLimit { limit: 3 })));
}

#[test]
fn contexts_can_share_a_runtime() {
    let runtime = Runtime::new();
    let a = StorageContext::builder().runtime(runtime.clone()).build();
    let b = StorageContext::builder().runtime(runtime.clone()).build();
    let ran = Rc::new(Cell::new(false));
    {
        let ran = Rc::clone(&ran);
        a.runtime().create_effect(move || ran.set(true));
    }
    b.flush().expect("flush");
    assert!(ran.get());
}

#[test]
fn sync_default_comes_from_config() {
    let browser = MemoryBrowser::new();
    let window = browser.open_window();
    let cx = StorageContext::builder()
        .config(ContextConfig { storage_sync: false, ..ContextConfig::default() })
        .local(window.local())
        .events(window.clone())
        .build();
    let scope = cx.scope();
    let _quiet = scope
        .local_storage::<u8>("a", StorageOptions::default())
        .expect("quiet");
    assert_eq!(window.listener_count(), 0);

    let _loud = scope
        .local_storage::<u8>("b", StorageOptions::default().storage_sync(true))
        .expect("loud");
    assert_eq!(window.listener_count(), 1);
}

// =============================================================
// Shared cells and failures
// =============================================================

#[test]
fn shared_raw_is_one_cell_per_area_and_key() {
    let cx = StorageContext::builder().build();
    let first = cx.shared_raw(StorageArea::Local, "k", Some(&"1".to_owned()));
    let again = cx.shared_raw(StorageArea::Local, "k", Some(&"2".to_owned()));
    let session = cx.shared_raw(StorageArea::Session, "k", None);

    assert_eq!(
        first.get_untracked(),
        SharedRaw::storage(Some("2".to_owned())),
        "refreshed by the latest read"
    );
    again.set(SharedRaw::local(Some("3".to_owned())));
    assert_eq!(first.get_untracked().raw.as_deref(), Some("3"));
    assert_eq!(session.get_untracked().raw, None);
    assert_eq!(cx.shared_key_count(), 2);
}

#[test]
fn unchanged_read_keeps_local_origin() {
    let cx = StorageContext::builder().build();
    let cell = cx.shared_raw(StorageArea::Local, "k", None);
    cell.set(SharedRaw::local(Some("1".to_owned())));
    cx.shared_raw(StorageArea::Local, "k", Some(&"1".to_owned()));
    assert_eq!(cell.get_untracked().origin, RawOrigin::Local);
}

#[test]
fn disposing_last_scope_on_a_key_releases_its_cell() {
    let browser = MemoryBrowser::new();
    let window = browser.open_window();
    let cx = StorageContext::memory(&window);
    let keep = cx.scope();
    let _kept = keep.local_storage::<u8>("kept", StorageOptions::default()).expect("kept");
    let _shared_a = keep.local_storage::<u8>("shared", StorageOptions::default()).expect("shared a");
    {
        let gone = cx.scope();
        let _shared_b = gone.local_storage::<u8>("shared", StorageOptions::default()).expect("shared b");
        let _gone = gone.local_storage::<u8>("gone", StorageOptions::default()).expect("gone");
        cx.flush().expect("flush");
        assert_eq!(cx.shared_key_count(), 3);
    }
    assert_eq!(cx.shared_key_count(), 2, "only the key no live handle uses is released");

    keep.dispose();
    assert_eq!(cx.shared_key_count(), 0);
}

#[test]
fn flush_reports_first_write_failure_once() {
    let local = MemoryStorage::new(StorageArea::Local);
    local.set_quota(Some(1));
    let cx = StorageContext::builder().local(local).build();
    let scope = cx.scope();
    let a = scope.local_storage::<u32>("a", StorageOptions::default()).expect("a");
    let b = scope.local_storage::<u32>("b", StorageOptions::default()).expect("b");

    a.set(10);
    b.set(20);
    let err = cx.flush().expect_err("quota");
    assert!(matches!(
        err,
        Error::Storage(StorageError::QuotaExceeded { ref key }) if key == "a"
    ));
    assert_eq!(cx.flush().expect("second flush is clean"), 0);
}

#[test]
fn scope_dispose_is_exposed() {
    let cx = StorageContext::builder().build();
    let scope = cx.scope();
    assert!(!scope.scope().is_disposed());
    scope.dispose();
    assert!(scope.scope().is_disposed());
    assert!(format!("{scope:?}").contains("disposed: true"));
}

#[test]
fn write_failure_is_not_carried_past_an_aborted_flush() {
    let local = MemoryStorage::new(StorageArea::Local);
    local.set_quota(Some(1));
    let cx = StorageContext::builder()
        .config(ContextConfig { flush_limit: 5, storage_sync: true })
        .local(local)
        .build();
    let scope = cx.scope();
    let handle = scope.local_storage::<u32>("k", StorageOptions::default()).expect("handle");
    handle.set(10);

    let spin = Signal::new(cx.runtime(), 0_u32);
    let runaway = {
        let spin = spin.clone();
        cx.runtime().create_effect(move || {
            let next = spin.get() + 1;
            spin.set(next);
        })
    };

    let err = cx.flush().expect_err("limit");
    assert!(matches!(err, Error::Runtime(RuntimeError::FlushLimit { limit: 5 })));

    cx.runtime().dispose_effect(runaway);
    assert_eq!(cx.flush().expect("write failure already reported"), 0);
}
