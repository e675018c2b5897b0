//! Simulated host loop
//!
//! Stands in for a render loop: starts every configured interpolation,
//! ticks the scheduler with a fixed step and records what the callbacks saw.

use anyhow::{Context, Result};
use glide_animation::{FixedClock, LerpRequest, Owner, TaskHandle, TaskScheduler, TaskState};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info};

use crate::config::GlideConfig;

/// One callback invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub tick: u32,
    pub name: String,
    pub value: f64,
}

/// Final state of a configured interpolation
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub name: String,
    pub state: TaskState,
}

#[derive(Debug, Default)]
pub struct Report {
    pub samples: Vec<Sample>,
    pub outcomes: Vec<Outcome>,
    pub ticks: u32,
}

#[cfg(test)]
impl Report {
    pub fn outcome(&self, name: &str) -> Option<TaskState> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.state)
    }

    pub fn samples_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples.iter().filter(move |s| s.name == name)
    }
}

pub fn simulate(config: &GlideConfig) -> Result<Report> {
    let scheduler =
        TaskScheduler::with_config(config.scheduler).context("Invalid scheduler config")?;
    let samples: Rc<RefCell<Vec<Sample>>> = Rc::new(RefCell::new(Vec::new()));
    let current_tick = Rc::new(Cell::new(0u32));

    let mut owners: BTreeMap<String, Owner> = BTreeMap::new();
    let mut handles: Vec<(String, TaskHandle)> = Vec::with_capacity(config.lerp.len());

    for entry in &config.lerp {
        let mut request = LerpRequest::new(entry.from, entry.to, entry.duration);
        if let Some(threshold) = entry.threshold {
            request = request.threshold(threshold);
        }
        if let Some(max_ticks) = entry.max_ticks {
            request = request.max_ticks(max_ticks);
        }
        if let Some(owner) = &entry.owner {
            request = request.owner(owners.entry(owner.clone()).or_default());
        }

        let sink = Rc::clone(&samples);
        let tick = Rc::clone(&current_tick);
        let name = entry.name.clone();
        request = request.on_update(move |value| {
            sink.borrow_mut().push(Sample {
                tick: tick.get(),
                name: name.clone(),
                value,
            })
        });

        let handle = scheduler
            .start_with(request)
            .with_context(|| format!("Failed to start '{}'", entry.name))?;
        handles.push((entry.name.clone(), handle));
    }

    let mut clock = FixedClock::new(config.simulation.step);
    let mut ticks = 0;

    while ticks < config.simulation.tick_budget && scheduler.has_active_tasks() {
        ticks += 1;
        current_tick.set(ticks);

        for release in config.release.iter().filter(|r| r.at_tick == ticks) {
            if let Some(owner) = owners.remove(&release.owner) {
                let cancelled = scheduler.notify_owner_invalid(owner.id());
                info!(
                    "Released owner '{}' at tick {}, cancelled {} task(s)",
                    release.owner, ticks, cancelled
                );
            }
        }

        scheduler.tick_with(&mut clock);
    }

    if scheduler.has_active_tasks() {
        info!(
            "Tick budget of {} exhausted with {} task(s) still running",
            config.simulation.tick_budget,
            scheduler.task_count()
        );
    }
    debug!("Simulation finished after {} ticks", ticks);

    let outcomes = handles
        .into_iter()
        .map(|(name, handle)| Outcome {
            name,
            state: handle.state(),
        })
        .collect();

    let samples = samples.take();
    Ok(Report {
        samples,
        outcomes,
        ticks,
    })
}
