use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::anim::AnimKind;
use crate::pet::PetState;

/// In-process notifications published by the app as the pet changes.
#[derive(Debug, Clone, PartialEq)]
pub enum PetEvent {
    StateChanged { from: PetState, to: PetState },
    Moved { x: i32, y: i32 },
    FollowChanged { enabled: bool },
    Greeted { message: String },
    AnimationStarted { kind: AnimKind },
    AnimationEnded { kind: AnimKind },
    BubbleShown,
    BubbleHidden,
}

/// Handle for removing a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

/// Typed notification hub.
///
/// Subscribers are plain callbacks owned by the hub. A panicking subscriber
/// is contained and logged; the remaining subscribers still receive the
/// event, and the offender stays registered.
pub struct EventHub {
    subscribers: Vec<(SubscriberId, Box<dyn FnMut(&PetEvent)>)>,
    next_id: u64,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&PetEvent) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was already gone.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every subscriber in subscription order.
    pub fn publish(&mut self, event: &PetEvent) {
        for (id, callback) in &mut self.subscribers {
            let result = catch_unwind(AssertUnwindSafe(|| callback(event)));
            if result.is_err() {
                log::error!("event subscriber {id:?} panicked on {event:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn delivers_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();

        for tag in ["a", "b", "c"] {
            let seen = seen.clone();
            hub.subscribe(move |_| seen.borrow_mut().push(tag));
        }

        hub.publish(&PetEvent::BubbleShown);
        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut hub = EventHub::new();

        let c = count.clone();
        let id = hub.subscribe(move |_| *c.borrow_mut() += 1);

        hub.publish(&PetEvent::BubbleShown);
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        hub.publish(&PetEvent::BubbleHidden);

        assert_eq!(*count.borrow(), 1);
        assert!(hub.subscribers.is_empty());
    }

    #[test]
    fn panicking_subscriber_does_not_block_the_rest() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();

        {
            let seen = seen.clone();
            hub.subscribe(move |_| seen.borrow_mut().push("first"));
        }
        hub.subscribe(|_| panic!("subscriber bug"));
        {
            let seen = seen.clone();
            hub.subscribe(move |_| seen.borrow_mut().push("last"));
        }

        hub.publish(&PetEvent::Moved { x: 1, y: 2 });
        hub.publish(&PetEvent::Moved { x: 3, y: 4 });

        // Both sides of the panicking subscriber saw both events.
        assert_eq!(*seen.borrow(), vec!["first", "last", "first", "last"]);
        assert_eq!(hub.subscribers.len(), 3);
    }

    #[test]
    fn events_carry_their_payloads() {
        let last = Rc::new(RefCell::new(None));
        let mut hub = EventHub::new();

        let l = last.clone();
        hub.subscribe(move |e| *l.borrow_mut() = Some(e.clone()));

        hub.publish(&PetEvent::Greeted {
            message: "Hi Sam!".into(),
        });
        assert_eq!(
            *last.borrow(),
            Some(PetEvent::Greeted {
                message: "Hi Sam!".into()
            })
        );
    }
}
