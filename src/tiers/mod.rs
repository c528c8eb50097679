// Tiered ring store: four bounded tiers, the shared event log and the roll-up cascade
// finest -> hourly -> daily -> weekly. Not synchronised; the engine wraps it in a mutex.

pub mod aggregation;
mod ring;

pub use aggregation::BoundaryWindow;
pub use ring::RingBuffer;

use crate::config::EngineConfig;
use crate::models::{AggregateRecord, Event, Sample, Tier, TierEntries};

pub struct TierStore {
    finest: RingBuffer<Sample>,
    hourly: RingBuffer<AggregateRecord>,
    daily: RingBuffer<AggregateRecord>,
    weekly: RingBuffer<AggregateRecord>,
    events: RingBuffer<Event>,
    to_hourly: BoundaryWindow<Sample>,
    to_daily: BoundaryWindow<AggregateRecord>,
    to_weekly: BoundaryWindow<AggregateRecord>,
}

impl TierStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            finest: RingBuffer::new(config.capacity(Tier::Finest)),
            hourly: RingBuffer::new(config.capacity(Tier::Hourly)),
            daily: RingBuffer::new(config.capacity(Tier::Daily)),
            weekly: RingBuffer::new(config.capacity(Tier::Weekly)),
            events: RingBuffer::new(config.event_capacity),
            to_hourly: BoundaryWindow::new(config.tiers.hourly.boundary_secs),
            to_daily: BoundaryWindow::new(config.tiers.daily.boundary_secs),
            to_weekly: BoundaryWindow::new(config.tiers.weekly.boundary_secs),
        }
    }

    /// Appends a raw sample and runs the cascade. Returns the tiers that received a roll-up.
    pub fn push_sample(&mut self, sample: Sample) -> Vec<Tier> {
        let mut promoted = Vec::new();
        let epoch = sample.epoch;
        self.finest.push(sample.clone());

        let Some((boundary, window)) = self.to_hourly.push(epoch, sample) else {
            return promoted;
        };
        let Some(minute) = aggregation::aggregate_samples(&window, boundary) else {
            return promoted;
        };
        self.hourly.push(minute.clone());
        promoted.push(Tier::Hourly);

        let Some((boundary, window)) = self.to_daily.push(minute.epoch, minute) else {
            return promoted;
        };
        let Some(five) = aggregation::aggregate_records(&window, boundary) else {
            return promoted;
        };
        self.daily.push(five.clone());
        promoted.push(Tier::Daily);

        let Some((boundary, window)) = self.to_weekly.push(five.epoch, five) else {
            return promoted;
        };
        if let Some(fifteen) = aggregation::aggregate_records(&window, boundary) {
            self.weekly.push(fifteen);
            promoted.push(Tier::Weekly);
        }
        promoted
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Restores an aggregate directly into `tier`, bypassing the cascade.
    pub(crate) fn restore_aggregate(&mut self, tier: Tier, record: AggregateRecord) {
        match tier {
            Tier::Finest => {}
            Tier::Hourly => {
                self.hourly.push(record);
            }
            Tier::Daily => {
                self.daily.push(record);
            }
            Tier::Weekly => {
                self.weekly.push(record);
            }
        }
    }

    /// Restores a raw sample without feeding the roll-up windows.
    pub(crate) fn restore_sample(&mut self, sample: Sample) {
        self.finest.push(sample);
    }

    pub fn latest_sample(&self) -> Option<&Sample> {
        self.finest.last()
    }

    /// Copy of one tier, oldest first.
    pub fn entries(&self, tier: Tier) -> TierEntries {
        match tier {
            Tier::Finest => TierEntries::Samples(self.finest.to_vec()),
            Tier::Hourly => TierEntries::Aggregates(self.hourly.to_vec()),
            Tier::Daily => TierEntries::Aggregates(self.daily.to_vec()),
            Tier::Weekly => TierEntries::Aggregates(self.weekly.to_vec()),
        }
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.finest.to_vec()
    }

    /// Copy of a roll-up tier; empty for `Tier::Finest`.
    pub fn aggregates(&self, tier: Tier) -> Vec<AggregateRecord> {
        match tier {
            Tier::Finest => Vec::new(),
            Tier::Hourly => self.hourly.to_vec(),
            Tier::Daily => self.daily.to_vec(),
            Tier::Weekly => self.weekly.to_vec(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.to_vec()
    }

    pub fn len(&self, tier: Tier) -> usize {
        match tier {
            Tier::Finest => self.finest.len(),
            Tier::Hourly => self.hourly.len(),
            Tier::Daily => self.daily.len(),
            Tier::Weekly => self.weekly.len(),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
