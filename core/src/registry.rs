use crate::config::BenchEnv;
use crate::fixture::{Fixture, Output};
use anyhow::{Context, Result};
use std::fmt;
use std::time::Duration;

pub type SetupFn = fn(&BenchEnv) -> Result<Fixture>;
pub type RunFn = fn(&BenchEnv, &mut Fixture) -> Result<Output>;
pub type TeardownFn = fn(Fixture) -> Result<()>;

/// Sampling configuration used when a benchmark runs under the profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerOptions {
    pub interval: Duration,
}

impl Default for ProfilerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1),
        }
    }
}

impl ProfilerOptions {
    pub const MAX_FREQUENCY: i32 = 100_000;

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Sampling frequency in Hz, clamped to what the sampler accepts.
    pub fn frequency(&self) -> i32 {
        let nanos = self.interval.as_nanos().max(1);
        let hz = 1_000_000_000u128 / nanos;
        hz.clamp(1, Self::MAX_FREQUENCY as u128) as i32
    }
}

pub fn no_fixture(_env: &BenchEnv) -> Result<Fixture> {
    Ok(Fixture::Empty)
}

pub fn release(fixture: Fixture) -> Result<()> {
    drop(fixture);
    Ok(())
}

#[derive(Clone)]
pub struct BenchmarkEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub setup: SetupFn,
    pub run: RunFn,
    pub teardown: TeardownFn,
    pub profiler: ProfilerOptions,
}

impl fmt::Debug for BenchmarkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkEntry")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("profiler", &self.profiler)
            .finish_non_exhaustive()
    }
}

impl BenchmarkEntry {
    pub fn new(name: &'static str, title: &'static str, run: RunFn) -> Self {
        Self {
            name,
            title,
            setup: no_fixture,
            run,
            teardown: release,
            profiler: ProfilerOptions::default(),
        }
    }

    pub fn with_setup(mut self, setup: SetupFn) -> Self {
        self.setup = setup;
        self
    }

    pub fn with_teardown(mut self, teardown: TeardownFn) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.profiler = ProfilerOptions::with_interval(interval);
        self
    }

    pub fn setup(&self, env: &BenchEnv) -> Result<Fixture> {
        (self.setup)(env).with_context(|| format!("set up benchmark '{}'", self.name))
    }

    pub fn call(&self, env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
        (self.run)(env, fixture).with_context(|| format!("run benchmark '{}'", self.name))
    }

    pub fn teardown(&self, fixture: Fixture) -> Result<()> {
        (self.teardown)(fixture).with_context(|| format!("tear down benchmark '{}'", self.name))
    }

    /// Run `body` between setup and teardown.
    ///
    /// Teardown runs whether or not `body` fails; the body's error wins.
    pub fn scoped<T, F>(&self, env: &BenchEnv, body: F) -> Result<T>
    where
        F: FnOnce(&mut Fixture) -> Result<T>,
    {
        let mut fixture = self.setup(env)?;
        let result = body(&mut fixture);
        let released = self.teardown(fixture);
        let value = result?;
        released?;
        Ok(value)
    }
}

/// Benchmarks by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<BenchmarkEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entry`; an existing entry with the same name is replaced in place.
    pub fn register(&mut self, entry: BenchmarkEntry) -> &mut Self {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&BenchmarkEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BenchmarkEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
