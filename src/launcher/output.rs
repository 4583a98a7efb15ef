use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded ring of recent gateway output lines.
///
/// The gateway can log for days; only a tail is kept for diagnostics. Oldest
/// lines are evicted once the cap is reached. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct OutputRing {
    lines: Arc<Mutex<VecDeque<String>>>,
    max_lines: usize,
}

impl OutputRing {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(max_lines.min(64)))),
            max_lines,
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == self.max_lines {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Snapshot of the retained tail, oldest first.
    pub fn recent(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}
