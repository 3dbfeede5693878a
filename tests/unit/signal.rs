use super::*;
use std::cell::Cell;

#[test]
fn set_notifies_only_on_change() {
    let s = Signal::new(1u32);
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    let _sub = s.subscribe(move |_| h.set(h.get() + 1));

    assert!(!s.set(1));
    assert_eq!(hits.get(), 0);
    assert!(s.set(2));
    assert!(s.set(3));
    assert_eq!(hits.get(), 2);
    assert_eq!(s.get(), 3);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let s = Signal::new("a");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let sub = s.subscribe(move |v| log.borrow_mut().push(*v));
    assert_eq!(s.listener_count(), 1);
    s.set("b");
    drop(sub);
    assert_eq!(s.listener_count(), 0);
    s.set("c");
    assert_eq!(*seen.borrow(), vec!["b"]);
}

#[test]
fn cancel_is_idempotent_and_survives_signal_drop() {
    let s = Signal::new(0i32);
    let mut sub = s.subscribe(|_| {});
    sub.cancel();
    sub.cancel();
    assert!(!sub.is_active());

    let mut orphan = s.subscribe(|_| {});
    drop(s);
    orphan.cancel();
}

#[test]
fn listener_may_reenter_signal() {
    let s = Signal::new(0i32);
    let inner = s.clone();
    let observed = Rc::new(Cell::new(0));
    let o = observed.clone();
    let _sub = s.subscribe(move |_| o.set(inner.get()));
    s.set(5);
    assert_eq!(observed.get(), 5);
}
