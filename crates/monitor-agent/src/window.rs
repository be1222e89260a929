//! Окно усреднения замеров между отправками heartbeat.

use monitor_types::{round2, LoadStats};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct LoadWindow {
    samples: Vec<LoadStats>,
}

impl LoadWindow {
    pub fn push(&mut self, sample: LoadStats) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Пора ли отправлять: замеры покрыли период отчёта.
    /// Переполнение длительности считается покрытием.
    pub fn is_due(&self, sample_interval: Duration, report_interval: Duration) -> bool {
        if self.is_empty() {
            return false;
        }
        u32::try_from(self.len())
            .ok()
            .and_then(|n| sample_interval.checked_mul(n))
            .is_none_or(|covered| covered >= report_interval)
    }

    /// Среднее по окну, округлённое до двух знаков. Пустое окно даёт нули.
    pub fn average(&self) -> LoadStats {
        if self.is_empty() {
            return LoadStats::default();
        }
        let n = self.samples.len() as f64;
        let sum = self.samples.iter().fold(LoadStats::default(), |acc, s| LoadStats {
            cpu: acc.cpu + s.cpu,
            ram: acc.ram + s.ram,
            net: acc.net + s.net,
        });

        LoadStats {
            cpu: round2(sum.cpu / n),
            ram: round2(sum.ram / n),
            net: round2(sum.net / n),
        }
    }

    /// Забрать среднее и начать новое окно.
    pub fn drain(&mut self) -> LoadStats {
        let average = self.average();
        self.samples.clear();
        average
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(cpu: f64, ram: f64, net: f64) -> LoadStats {
        LoadStats { cpu, ram, net }
    }

    #[test]
    fn test_average_and_drain() {
        let mut window = LoadWindow::default();
        window.push(load(10.0, 50.0, 1.0));
        window.push(load(20.0, 51.0, 2.0));
        window.push(load(30.0, 52.0, 2.5));

        assert_eq!(window.drain(), load(20.0, 51.0, 1.83));
        assert!(window.is_empty());
        assert_eq!(window.average(), LoadStats::default());
    }

    #[test]
    fn test_is_due_after_report_interval() {
        let sample = Duration::from_secs(30);
        let report = Duration::from_secs(120);
        let mut window = LoadWindow::default();

        assert!(!window.is_due(sample, report));
        for _ in 0..3 {
            window.push(LoadStats::default());
        }
        assert!(!window.is_due(sample, report));
        window.push(LoadStats::default());
        assert!(window.is_due(sample, report));
    }

    #[test]
    fn test_huge_sample_interval_is_due_without_overflow() {
        let sample = Duration::from_secs(u64::MAX / 2);
        let mut window = LoadWindow::default();
        for _ in 0..3 {
            window.push(LoadStats::default());
        }
        assert!(window.is_due(sample, Duration::from_secs(120)));
    }
}
