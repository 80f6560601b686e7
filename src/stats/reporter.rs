// src/stats/reporter.rs
use crate::stats::aggregator::{AggregateState, Aggregator};
use std::thread::JoinHandle;
use std::time::Duration;
use sysinfo::{Components, System};

/// Statistics related to hardware performance
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// Current CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory currently used on the host (in bytes)
    pub memory_used: u64,
    /// Current CPU temperature in Celsius, 0 when no sensor is found
    pub temperature: f32,
}

/// Periodically logs the aggregated mining state next to host statistics
pub struct StatsReporter {
    /// Source of rates and counters
    aggregator: Aggregator,
    /// System information collector
    system: System,
    /// Hardware component information collector
    components: Components,
    /// Interval at which stats are reported
    report_interval: Duration,
}

impl StatsReporter {
    /// Creates a reporter for `aggregator` with the specified reporting interval
    ///
    /// # Arguments
    /// * `aggregator` - Aggregator of the pool being reported on
    /// * `report_interval` - How often to log statistics
    pub fn new(aggregator: Aggregator, report_interval: Duration) -> Self {
        StatsReporter {
            aggregator,
            system: System::new_all(),
            components: Components::new_with_refreshed_list(),
            report_interval,
        }
    }

    /// Gets the current hardware statistics
    ///
    /// This refreshes system information before returning the stats.
    ///
    /// # Returns
    /// A snapshot of the current hardware statistics
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh(true);

        let cpus = self.system.cpus();
        let cpu_usage = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len() as f32
        };

        let temperature = self
            .components
            .iter()
            .find(|c| c.label().contains("CPU"))
            .and_then(|c| c.temperature())
            .unwrap_or(0.0);

        HardwareStats {
            cpu_usage,
            memory_used: self.system.used_memory(),
            temperature,
        }
    }

    /// Starts the periodic reporting of statistics
    ///
    /// Spawns a background thread that logs one line per interval while
    /// the aggregator stays open, and returns once it is closed.
    pub fn start_reporting(mut self) -> JoinHandle<()> {
        std::thread::spawn(move || {
            loop {
                std::thread::sleep(self.report_interval);
                if !self.aggregator.is_open() {
                    break;
                }

                let state = self.aggregator.snapshot();
                let hw_stats = self.get_hardware_stats();
                log::info!("{}", report_line(&state, &hw_stats));
            }
        })
    }
}

/// Formats one statistics line
pub fn report_line(state: &AggregateState, hw_stats: &HardwareStats) -> String {
    let temperature = if hw_stats.temperature > 0.0 {
        format!("{:.1}°C", hw_stats.temperature)
    } else {
        "n/a".to_string()
    };
    format!(
        "Rate: {} c/s | Successes: {} | Failures: {} | CPU: {:.1}% | Mem: {} MiB | Temp: {}",
        state.total_rate(),
        state.success_count(),
        state.failure_count(),
        hw_stats.cpu_usage,
        hw_stats.memory_used / (1024 * 1024),
        temperature
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::worker::WorkerEvent;

    #[test]
    fn report_line_shows_aggregate_and_host() {
        let mut state = AggregateState::new(10);
        state.apply_event(WorkerEvent::Rate { index: 0, rate: 700 });
        state.apply_event(WorkerEvent::Rate { index: 1, rate: 300 });
        let hw = HardwareStats {
            cpu_usage: 97.26,
            memory_used: 512 * 1024 * 1024,
            temperature: 0.0,
        };

        assert_eq!(
            report_line(&state, &hw),
            "Rate: 1000 c/s | Successes: 0 | Failures: 0 | CPU: 97.3% | Mem: 512 MiB | Temp: n/a"
        );
    }

    #[test]
    fn report_line_shows_sensor_temperature() {
        let state = AggregateState::new(10);
        let hw = HardwareStats {
            cpu_usage: 12.0,
            memory_used: 0,
            temperature: 64.5,
        };

        assert!(report_line(&state, &hw).ends_with("| CPU: 12.0% | Mem: 0 MiB | Temp: 64.5°C"));
    }

    #[test]
    fn reporter_exits_when_aggregator_closes() {
        let aggregator = Aggregator::new(10);
        let epoch = aggregator.reset(10);
        let handle =
            StatsReporter::new(aggregator.clone(), Duration::from_millis(10)).start_reporting();

        std::thread::sleep(Duration::from_millis(30));
        aggregator.close(epoch);
        handle.join().unwrap();
    }

    #[test]
    fn hardware_stats_are_sane() {
        let mut reporter = StatsReporter::new(Aggregator::default(), Duration::from_secs(1));
        let stats = reporter.get_hardware_stats();
        assert!(stats.cpu_usage >= 0.0);
    }
}
