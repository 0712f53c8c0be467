//! Call trees folded from sampled stacks.

use std::fmt;
use std::time::Duration;

/// Frames whose share of the samples is below this are left out of the
/// rendered tree.
pub const MIN_SHARE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub samples: u64,
    pub children: Vec<Frame>,
}

impl Frame {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            samples: 0,
            children: Vec::new(),
        }
    }

    fn child_mut(&mut self, name: &str) -> &mut Frame {
        let pos = match self.children.iter().position(|c| c.name == name) {
            Some(pos) => pos,
            None => {
                self.children.push(Frame::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[pos]
    }

    fn find_suffix(&self, suffix: &str) -> Option<&Frame> {
        for child in &self.children {
            if child.name.ends_with(suffix) {
                return Some(child);
            }
            if let Some(found) = child.find_suffix(suffix) {
                return Some(found);
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTree {
    root: Frame,
    interval: Duration,
    /// Time one sample stands for. Starts at `interval`; see [`CallTree::calibrate`].
    per_sample: Duration,
}

impl CallTree {
    pub fn new(interval: Duration) -> Self {
        Self {
            root: Frame::new("<root>"),
            interval,
            per_sample: interval,
        }
    }

    /// Spread the measured wall time of the profiled call evenly over the
    /// recorded samples.
    ///
    /// The sampler delivers fewer signals than requested at short intervals,
    /// so samples times the requested interval under-counts.
    pub fn calibrate(&mut self, wall: Duration) {
        if let Ok(samples @ 1..) = u32::try_from(self.root.samples) {
            self.per_sample = wall / samples;
        }
    }

    /// Record `count` samples of one stack, outermost frame first.
    pub fn add_stack<S: AsRef<str>>(&mut self, frames: &[S], count: u64) {
        if count == 0 {
            return;
        }
        let mut node = &mut self.root;
        node.samples += count;
        for frame in frames {
            node = node.child_mut(frame.as_ref());
            node.samples += count;
        }
    }

    pub fn roots(&self) -> &[Frame] {
        &self.root.children
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn per_sample(&self) -> Duration {
        self.per_sample
    }

    pub fn total_samples(&self) -> u64 {
        self.root.samples
    }

    pub fn total_time(&self) -> Duration {
        self.time_of(self.root.samples)
    }

    fn time_of(&self, samples: u64) -> Duration {
        self.per_sample.saturating_mul(u32::try_from(samples).unwrap_or(u32::MAX))
    }

    /// Cumulative time of the first frame, depth first, whose name ends
    /// with `name`.
    pub fn function_time(&self, name: &str) -> Option<Duration> {
        self.root.find_suffix(name).map(|frame| self.time_of(frame.samples))
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, frame: &Frame, depth: usize) -> fmt::Result {
        let total = self.root.samples.max(1) as f64;
        for child in &frame.children {
            if (child.samples as f64) / total < MIN_SHARE {
                continue;
            }
            writeln!(
                f,
                "{:indent$}{:.6} {}",
                "",
                self.time_of(child.samples).as_secs_f64(),
                child.name,
                indent = depth * 2
            )?;
            self.render(f, child, depth + 1)?;
        }
        Ok(())
    }

    /// Fold a `pprof` report, dropping the thread level.
    #[cfg(unix)]
    pub fn from_report(report: &pprof::Report, interval: Duration) -> Self {
        let mut tree = Self::new(interval);
        for (frames, &count) in &report.data {
            if count <= 0 {
                continue;
            }
            let names: Vec<String> = frames
                .frames
                .iter()
                .rev()
                .flat_map(|symbols| symbols.iter().rev().map(|symbol| symbol.name()))
                .collect();
            tree.add_stack(&names, count as u64);
        }
        tree
    }
}

impl fmt::Display for CallTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Samples: {}  Duration: {:.6} s  Interval: {:?} (requested {:?})",
            self.root.samples,
            self.total_time().as_secs_f64(),
            self.per_sample,
            self.interval
        )?;
        self.render(f, &self.root, 0)
    }
}
