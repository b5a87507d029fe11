//! Single owner of the current world-space mapping.
//!
//! Changes are queued by [`WorldSpace::update`] and delivered by
//! [`WorldSpace::flush`], which the surface owner calls once per display
//! refresh. A burst of viewport events inside one frame therefore results in
//! a single notification carrying the latest matrix.

use crate::matrix::{MatrixError, TransformationMatrix};

pub type Listener = Box<dyn FnMut(TransformationMatrix)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct WorldSpace {
    matrix: Option<TransformationMatrix>,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
    pending: bool,
}

impl std::fmt::Debug for WorldSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldSpace")
            .field("matrix", &self.matrix)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl WorldSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matrix(&self) -> Option<TransformationMatrix> {
        self.matrix
    }

    /// Stores `candidate` if it differs from the current mapping.
    ///
    /// Returns `Ok(true)` when a notification got scheduled. Degenerate
    /// matrices are rejected and the stored one stays authoritative.
    pub fn update(&mut self, candidate: TransformationMatrix) -> Result<bool, MatrixError> {
        let candidate = candidate.validate().inspect_err(|err| {
            log::debug!("world space: {err}");
        })?;

        if self
            .matrix
            .is_some_and(|current| current.same_mapping(&candidate))
        {
            return Ok(false);
        }

        self.matrix = Some(candidate);
        self.pending = true;
        Ok(true)
    }

    /// Registers `listener`. If a mapping already exists the listener runs
    /// right away with it, so a late subscriber can draw before the next
    /// viewport change.
    pub fn subscribe(
        &mut self,
        mut listener: impl FnMut(TransformationMatrix) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        if let Some(matrix) = self.matrix {
            listener(matrix);
        }

        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Refresh-tick boundary: delivers the scheduled notification, if any, to
    /// every registered listener with the same matrix value.
    pub fn flush(&mut self) -> bool {
        if !std::mem::take(&mut self.pending) {
            return false;
        }

        let Some(matrix) = self.matrix else {
            return false;
        };

        for (_, listener) in &mut self.listeners {
            listener(matrix);
        }
        true
    }

    pub fn clear(&mut self) {
        self.matrix = None;
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn matrix(e: f64) -> TransformationMatrix {
        TransformationMatrix::new(10.0, -5.0, e, 200.0, 1000.0, 50.0)
    }

    fn recorder(world: &mut WorldSpace) -> (ListenerId, Rc<RefCell<Vec<TransformationMatrix>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = world.subscribe(move |m| sink.borrow_mut().push(m));
        (id, seen)
    }

    #[test]
    fn identical_updates_notify_once() {
        let mut world = WorldSpace::new();
        let (_, seen) = recorder(&mut world);

        assert_eq!(world.update(matrix(100.0)), Ok(true));
        assert_eq!(world.update(matrix(100.0)), Ok(false));
        assert!(world.flush());
        assert!(!world.flush());

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn notification_waits_for_flush() {
        let mut world = WorldSpace::new();
        let (_, seen) = recorder(&mut world);

        world.update(matrix(100.0)).unwrap();
        assert!(seen.borrow().is_empty());
        assert!(world.has_pending());

        world.flush();
        assert_eq!(seen.borrow().as_slice(), &[matrix(100.0)]);
    }

    #[test]
    fn burst_coalesces_to_latest() {
        let mut world = WorldSpace::new();
        let (_, seen) = recorder(&mut world);

        for e in [100.0, 101.5, 102.25, 103.0] {
            world.update(matrix(e)).unwrap();
        }
        world.flush();

        assert_eq!(seen.borrow().as_slice(), &[matrix(103.0)]);
    }

    #[test]
    fn late_subscriber_gets_current_matrix_synchronously() {
        let mut world = WorldSpace::new();
        world.update(matrix(100.0)).unwrap();
        world.flush();

        let (_, seen) = recorder(&mut world);
        assert_eq!(seen.borrow().as_slice(), &[matrix(100.0)]);
    }

    #[test]
    fn degenerate_matrix_keeps_previous() {
        let mut world = WorldSpace::new();
        world.update(matrix(100.0)).unwrap();
        world.flush();

        let zero = TransformationMatrix::new(0.0, -5.0, 1.0, 1.0, 1.0, 1.0);
        assert!(world.update(zero).is_err());
        assert_eq!(world.matrix(), Some(matrix(100.0)));
        assert!(!world.has_pending());
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut world = WorldSpace::new();
        let (id, seen) = recorder(&mut world);
        let (_, other) = recorder(&mut world);

        world.update(matrix(100.0)).unwrap();
        assert!(world.unsubscribe(id));
        assert!(!world.unsubscribe(id));
        world.flush();

        assert!(seen.borrow().is_empty());
        assert_eq!(other.borrow().len(), 1);
    }

    #[test]
    fn every_listener_sees_same_matrix() {
        let mut world = WorldSpace::new();
        let (_, first) = recorder(&mut world);
        let (_, second) = recorder(&mut world);

        world.update(matrix(120.0)).unwrap();
        world.flush();

        assert_eq!(*first.borrow(), *second.borrow());
    }
}
