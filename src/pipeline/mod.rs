// Push pipeline shared by every block of the chain.
// A stage stores what it receives, transforms it, and fans the result out
// to its sinks depth-first, in connection order.

pub mod buffer;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::error::{ChainError, ChainResult};

pub use buffer::{Buffer, Sample};

/// Buffer handed downstream; every connected sink reads the same allocation
pub type Shared<T> = Rc<Buffer<T>>;

/// Handle to a downstream block
pub type SinkRef<T> = Rc<RefCell<dyn Sink<T>>>;

/// Shareable handle to a concrete stage
pub type StageRef<X> = Rc<RefCell<Stage<X>>>;

/// Anything that accepts buffers pushed from upstream
pub trait Sink<T> {
    fn receive(&mut self, buffer: Shared<T>) -> ChainResult<()>;
}

/// Anything that pushes buffers to connected sinks
pub trait Source<T> {
    /// Append a sink; no de-duplication
    fn connect(&mut self, sink: SinkRef<T>);

    /// Push the last produced buffer to every sink, in connection order
    fn emit(&mut self) -> ChainResult<()>;

    fn last_emitted(&self) -> Option<&Shared<T>>;
}

/// The per-block computation wrapped by a [`Stage`]
pub trait Transform {
    type Input;
    type Output;

    fn name(&self) -> &'static str;

    fn apply(
        &mut self,
        input: &Buffer<Self::Input>,
    ) -> ChainResult<Buffer<Self::Output>>;
}

/// A transform plus the receive/emit protocol and its private state
pub struct Stage<X: Transform> {
    inner: X,
    last_received: Option<Shared<X::Input>>,
    last_emitted: Option<Shared<X::Output>>,
    sinks: Vec<SinkRef<X::Output>>,
}

impl<X: Transform> Stage<X> {
    pub fn new(inner: X) -> Self {
        Self {
            inner,
            last_received: None,
            last_emitted: None,
            sinks: Vec::new(),
        }
    }

    /// Wrap into a shareable handle so the stage can be connected downstream
    /// of another block and still be inspected afterwards
    pub fn shared(inner: X) -> StageRef<X> {
        Rc::new(RefCell::new(Self::new(inner)))
    }

    pub fn inner(&self) -> &X {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut X {
        &mut self.inner
    }

    pub fn last_received(&self) -> Option<&Shared<X::Input>> {
        self.last_received.as_ref()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl<X: Transform> Sink<X::Input> for Stage<X> {
    fn receive(&mut self, buffer: Shared<X::Input>) -> ChainResult<()> {
        self.last_received = Some(Rc::clone(&buffer));
        self.last_emitted = None;

        let output = self.inner.apply(&buffer)?;
        trace!(
            "{}: {} in -> {} out",
            self.inner.name(),
            buffer.len(),
            output.len()
        );
        self.last_emitted = Some(Rc::new(output));
        self.emit()
    }
}

impl<X: Transform> Source<X::Output> for Stage<X> {
    fn connect(&mut self, sink: SinkRef<X::Output>) {
        self.sinks.push(sink);
    }

    fn emit(&mut self) -> ChainResult<()> {
        let output = match (&self.last_received, &self.last_emitted) {
            (Some(_), Some(output)) => Rc::clone(output),
            _ => {
                return Err(ChainError::non_conformant(format!(
                    "{} has nothing to emit before receiving a buffer",
                    self.inner.name()
                )));
            }
        };

        for (i, sink) in self.sinks.iter().enumerate() {
            trace!("{}: pushing to sink #{}", self.inner.name(), i);
            sink.borrow_mut().receive(Rc::clone(&output))?;
        }
        Ok(())
    }

    fn last_emitted(&self) -> Option<&Shared<X::Output>> {
        self.last_emitted.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Transform for Doubler {
        type Input = i32;
        type Output = i32;

        fn name(&self) -> &'static str {
            "doubler"
        }

        fn apply(&mut self, input: &Buffer<i32>) -> ChainResult<Buffer<i32>> {
            Ok(input.iter().map(|v| v * 2).collect())
        }
    }

    /// Records the order in which sinks were reached
    struct Recorder {
        id: usize,
        log: Rc<RefCell<Vec<usize>>>,
        seen: Option<Shared<i32>>,
    }

    impl Sink<i32> for Recorder {
        fn receive(&mut self, buffer: Shared<i32>) -> ChainResult<()> {
            self.log.borrow_mut().push(self.id);
            self.seen = Some(buffer);
            Ok(())
        }
    }

    #[test]
    fn test_receive_transforms_and_stores() {
        let mut stage = Stage::new(Doubler);
        stage
            .receive(Rc::new(Buffer::from(vec![1, 2, 3])))
            .unwrap();

        assert_eq!(stage.last_received().unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(stage.last_emitted().unwrap().as_slice(), &[2, 4, 6]);
    }

    #[test]
    fn test_emit_before_receive_fails() {
        let mut stage = Stage::new(Doubler);
        let err = stage.emit().unwrap_err();
        assert!(matches!(err, ChainError::NonConformantInput(_)));
    }

    #[test]
    fn test_fan_out_is_depth_first_in_connection_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Stage::shared(Doubler);
        let grandchild = Rc::new(RefCell::new(Recorder {
            id: 1,
            log: Rc::clone(&log),
            seen: None,
        }));
        let second = Rc::new(RefCell::new(Recorder {
            id: 2,
            log: Rc::clone(&log),
            seen: None,
        }));
        first.borrow_mut().connect(grandchild.clone());

        let mut root = Stage::new(Doubler);
        root.connect(first.clone());
        root.connect(second.clone());
        root.receive(Rc::new(Buffer::from(vec![1]))).unwrap();

        // the whole chain under `first` completes before `second` runs
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(grandchild.borrow().seen.as_ref().unwrap().as_slice(), &[4]);
        assert_eq!(second.borrow().seen.as_ref().unwrap().as_slice(), &[2]);
    }

    #[test]
    fn test_sinks_share_the_emitted_buffer() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(RefCell::new(Recorder {
            id: 0,
            log: Rc::clone(&log),
            seen: None,
        }));
        let b = Rc::new(RefCell::new(Recorder {
            id: 1,
            log: Rc::clone(&log),
            seen: None,
        }));
        let mut stage = Stage::new(Doubler);
        stage.connect(a.clone());
        stage.connect(b.clone());
        stage.receive(Rc::new(Buffer::from(vec![7]))).unwrap();

        let seen_a = a.borrow().seen.clone().unwrap();
        let seen_b = b.borrow().seen.clone().unwrap();
        assert!(Rc::ptr_eq(&seen_a, &seen_b));
        assert_eq!(stage.sink_count(), 2);
    }
}
