//! Interrupt and control line outputs.
//!
//! A bus forwards card-raised lines to the host through an [`OutputLine`]:
//! an edge-filtered sink that invokes its callback only when the driven
//! state actually changes. Multi-slot buses aggregate per-slot sources
//! through a [`WiredOrLine`] so the host sees a single open-collector
//! style line.

use log::trace;

/// Sink for a line-state change, wired to a host CPU interrupt input (or
/// anything else) at configuration time.
pub type LineCallback = Box<dyn FnMut(bool)>;

/// A single output line with edge-filtered callback delivery.
#[derive(Default)]
pub struct OutputLine {
    state: bool,
    callback: Option<LineCallback>,
}

impl OutputLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the output to a sink. Replaces any previous sink.
    pub fn set_callback(&mut self, callback: LineCallback) {
        self.callback = Some(callback);
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Drive the line. The callback fires only on a state change, so a
    /// card re-asserting an already-asserted line is invisible to the
    /// host.
    pub fn set(&mut self, state: bool) {
        if state == self.state {
            return;
        }
        self.state = state;
        if let Some(callback) = self.callback.as_mut() {
            callback(state);
        }
    }

    #[must_use]
    pub fn state(&self) -> bool {
        self.state
    }
}

/// Wired-OR aggregation of up to 32 per-slot sources into one output.
///
/// Each source drives its own bit; the output is asserted while any
/// source is. The underlying [`OutputLine`] edge-filters delivery, so a
/// second card asserting while the line is already low-active produces
/// no intermediate transitions.
#[derive(Default)]
pub struct WiredOrLine {
    sources: u32,
    out: OutputLine,
}

impl WiredOrLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callback(&mut self, callback: LineCallback) {
        self.out.set_callback(callback);
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.out.has_callback()
    }

    /// Drive one source and propagate the new aggregate.
    pub fn drive(&mut self, source: usize, state: bool) {
        debug_assert!(source < 32);
        let bit = 1u32 << source;
        let sources = if state {
            self.sources | bit
        } else {
            self.sources & !bit
        };
        if sources != self.sources {
            trace!("line source {source} -> {state} (mask {sources:08x})");
        }
        self.sources = sources;
        self.out.set(sources != 0);
    }

    /// Release every source, e.g. on bus reset.
    pub fn clear(&mut self) {
        self.sources = 0;
        self.out.set(false);
    }

    #[must_use]
    pub fn state(&self) -> bool {
        self.out.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, LineCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Box::new(move |state| sink.borrow_mut().push(state)))
    }

    #[test]
    fn output_line_filters_edges() {
        let (seen, callback) = recorder();
        let mut line = OutputLine::new();
        line.set_callback(callback);

        line.set(true);
        line.set(true); // no edge
        line.set(false);
        line.set(false); // no edge

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn wired_or_aggregates_sources() {
        let (seen, callback) = recorder();
        let mut line = WiredOrLine::new();
        line.set_callback(callback);

        line.drive(0, true);
        line.drive(3, true); // already asserted, no edge
        line.drive(0, false); // source 3 still holds the line
        line.drive(3, false);

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert!(!line.state());
    }

    #[test]
    fn wired_or_clear_releases_everything() {
        let mut line = WiredOrLine::new();
        line.drive(1, true);
        line.drive(2, true);
        line.clear();
        assert!(!line.state());
    }
}
