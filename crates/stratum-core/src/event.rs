//! Injected observation sink for protocol-level events.
//!
//! The reconciliation code never calls `tracing!` directly; it reports
//! through a `Sink` so tests can assert on the exact sequence of events a
//! handler produced. [`TracingSink`] is the production default.

/// A single protocol-level occurrence, tagged with the node's logical tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// This node became representative of `level`.
    Elect { level: u32 },
    /// This node stopped being representative of `level`.
    Unelect { level: u32 },
    /// The node's highest level changed to `level`.
    MaxLevel { level: u32 },
    /// A message was sent to `to`, `bytes` long.
    Send { to: u32, bytes: usize },
    /// A message was received from `from`, `bytes` long.
    Recv { from: u32, bytes: usize },
}

/// Receives [`Event`]s tagged with the emitting node's id and logical tick.
pub trait Sink: Send {
    fn observe(&mut self, node: u32, tick: u64, event: Event);
}

/// Forwards every event to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn observe(&mut self, node: u32, tick: u64, event: Event) {
        tracing::debug!(node, tick, ?event, "protocol event");
    }
}

/// Discards every event. Useful when a caller only wants side effects.
#[derive(Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn observe(&mut self, _node: u32, _tick: u64, _event: Event) {}
}

/// Collects every event in order, for assertions in tests.
#[derive(Debug, Default)]
pub struct VecSink(pub Vec<(u32, u64, Event)>);

impl Sink for VecSink {
    fn observe(&mut self, node: u32, tick: u64, event: Event) {
        self.0.push((node, tick, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_records_in_order() {
        let mut sink = VecSink::default();
        sink.observe(1, 0, Event::Elect { level: 1 });
        sink.observe(1, 1, Event::MaxLevel { level: 1 });
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0].2, Event::Elect { level: 1 });
    }
}
