//! Bounded chart history for metric samples

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::metrics::Metrics;

/// Fixed-capacity buffer that overwrites its oldest item once full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: Vec<T>,
    capacity: usize,
    cursor: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() < self.capacity {
            self.items.push(item);
        } else {
            self.items[self.cursor] = item;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let split = if self.items.len() < self.capacity { 0 } else { self.cursor };
        self.items[split..].iter().chain(self.items[..split].iter())
    }

    pub fn latest(&self) -> Option<&T> {
        self.iter().last()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }
}

/// Derives MB/s from consecutive cumulative network counters.
///
/// The first sample after construction or [`NetworkRate::reset`] only sets
/// the baseline and reports zero, as does any sample whose predecessor had a
/// zero counter.
#[derive(Debug, Clone, Default)]
pub struct NetworkRate {
    last_in: f64,
    last_out: f64,
}

impl NetworkRate {
    pub fn observe(&mut self, network_in: f64, network_out: f64, interval: Duration) -> f64 {
        let secs = interval.as_secs_f64();
        let rate = if self.last_in > 0.0 && self.last_out > 0.0 && secs > 0.0 {
            let delta = (network_in - self.last_in) + (network_out - self.last_out);
            (delta / secs).max(0.0)
        } else {
            0.0
        };

        self.last_in = network_in;
        self.last_out = network_out;
        rate
    }

    pub fn reset(&mut self) {
        self.last_in = 0.0;
        self.last_out = 0.0;
    }
}

/// Chart series kept by the caller between samples
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    pub cpu: RingBuffer<f64>,
    pub memory: RingBuffer<f64>,
    pub network: RingBuffer<f64>,
    pub requests: RingBuffer<f64>,
    pub timestamps: RingBuffer<DateTime<Utc>>,
    network_rate: NetworkRate,
    interval: Duration,
}

/// Serializable copy of a [`MetricsHistory`], oldest point first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub network: Vec<f64>,
    pub requests: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
}

impl MetricsHistory {
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            cpu: RingBuffer::new(capacity),
            memory: RingBuffer::new(capacity),
            network: RingBuffer::new(capacity),
            requests: RingBuffer::new(capacity),
            timestamps: RingBuffer::new(capacity),
            network_rate: NetworkRate::default(),
            interval,
        }
    }

    /// Append one sample; returns the network rate derived for it
    pub fn record(&mut self, metrics: &Metrics) -> f64 {
        let rate = self
            .network_rate
            .observe(metrics.network_in, metrics.network_out, self.interval);

        self.cpu.push(metrics.cpu);
        self.memory.push(metrics.memory);
        self.network.push(rate);
        self.requests.push(metrics.request_rate);
        self.timestamps.push(metrics.timestamp);
        rate
    }

    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }

    pub fn reset(&mut self) {
        self.cpu.clear();
        self.memory.clear();
        self.network.clear();
        self.requests.clear();
        self.timestamps.clear();
        self.network_rate.reset();
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            cpu: self.cpu.to_vec(),
            memory: self.memory.to_vec(),
            network: self.network.to_vec(),
            requests: self.requests.to_vec(),
            timestamps: self.timestamps.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_fills_then_wraps() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.to_vec(), vec![1, 2]);

        ring.push(3);
        ring.push(4);
        ring.push(5);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.to_vec(), vec![3, 4, 5]);
        assert_eq!(ring.latest(), Some(&5));
    }

    #[test]
    fn test_ring_buffer_zero_capacity() {
        let mut ring = RingBuffer::new(0);
        ring.push(1);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_network_rate_warm_up() {
        let mut rate = NetworkRate::default();
        let second = Duration::from_secs(1);

        assert_eq!(rate.observe(100.0, 50.0, second), 0.0);
        assert_eq!(rate.observe(101.0, 50.5, second), 1.5);

        rate.reset();
        assert_eq!(rate.observe(110.0, 60.0, second), 0.0);
    }

    #[test]
    fn test_network_rate_divides_by_interval() {
        let mut rate = NetworkRate::default();
        rate.observe(10.0, 10.0, Duration::from_secs(2));
        assert_eq!(rate.observe(14.0, 12.0, Duration::from_secs(2)), 3.0);
    }

    #[test]
    fn test_network_rate_zero_baseline_stays_zero() {
        let mut rate = NetworkRate::default();
        rate.observe(0.0, 5.0, Duration::from_secs(1));
        assert_eq!(rate.observe(3.0, 6.0, Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_history_keeps_capacity() {
        let mut history = MetricsHistory::new(2, Duration::from_secs(1));
        for i in 1..=3 {
            history.record(&Metrics {
                cpu: i as f64,
                network_in: i as f64,
                network_out: i as f64,
                ..Default::default()
            });
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.cpu, vec![2.0, 3.0]);
        assert_eq!(snapshot.network, vec![2.0, 2.0]);

        history.reset();
        assert!(history.is_empty());
    }
}
