// ============================================================================
// REACTIVITY - Sistema de notificaciones/subscribers para reactividad
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback<E> = Rc<dyn Fn(&E)>;

/// Id devuelto por `subscribe`, sirve para desuscribirse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Lista de observers de eventos `E` (single-thread)
pub struct Subscribers<E> {
    next_id: Cell<u64>,
    callbacks: RefCell<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            callbacks: RefCell::new(Vec::new()),
        }
    }

    /// Suscribirse a eventos
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.callbacks.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.callbacks.borrow_mut().retain(|(sid, _)| *sid != id);
    }

    pub fn clear(&self) {
        self.callbacks.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notificar a todos los subscribers.
    /// Se itera sobre una copia: un callback puede suscribir/desuscribir sin
    /// provocar un doble borrow.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_and_unsubscribe() {
        let subs: Rc<Subscribers<u32>> = Rc::new(Subscribers::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_a = seen.clone();
        let a = subs.subscribe(move |v| seen_a.borrow_mut().push(("a", *v)));
        let seen_b = seen.clone();
        subs.subscribe(move |v| seen_b.borrow_mut().push(("b", *v)));

        subs.notify(&1);
        subs.unsubscribe(a);
        subs.notify(&2);

        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn test_callback_may_subscribe_during_notify() {
        let subs: Rc<Subscribers<()>> = Rc::new(Subscribers::new());
        let inner = subs.clone();
        subs.subscribe(move |_| {
            inner.subscribe(|_| {});
        });
        subs.notify(&());
        assert_eq!(subs.len(), 2);
    }
}
