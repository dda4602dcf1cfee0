//! 编队运行指标
//!
//! 原子计数器，可以在遥测线程与控制线程中无锁更新和读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 编队实时指标
///
/// # 使用示例
///
/// ```rust
/// use sphero_driver::FleetMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = FleetMetrics::new();
/// metrics.odometry_samples.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.odometry_samples, 1);
/// ```
#[derive(Debug, Default)]
pub struct FleetMetrics {
    /// 收到的里程计采样数
    pub odometry_samples: AtomicU64,

    /// 成功下发的 roll 指令数
    pub rolls_issued: AtomicU64,

    /// 下发失败的 roll 指令数
    pub roll_failures: AtomicU64,

    /// 稳态运行中上报的碰撞数
    pub collisions_reported: AtomicU64,

    /// 准备阶段被忽略的碰撞数
    pub collisions_ignored: AtomicU64,

    /// 电量低警告次数
    pub low_power_warnings: AtomicU64,

    /// 完成的同步周期数
    pub ticks: AtomicU64,

    /// 被拒绝的指令行数
    pub rejected_lines: AtomicU64,
}

impl FleetMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别以 `Relaxed` 读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> FleetMetricsSnapshot {
        FleetMetricsSnapshot {
            odometry_samples: self.odometry_samples.load(Ordering::Relaxed),
            rolls_issued: self.rolls_issued.load(Ordering::Relaxed),
            roll_failures: self.roll_failures.load(Ordering::Relaxed),
            collisions_reported: self.collisions_reported.load(Ordering::Relaxed),
            collisions_ignored: self.collisions_ignored.load(Ordering::Relaxed),
            low_power_warnings: self.low_power_warnings.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            rejected_lines: self.rejected_lines.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.odometry_samples.store(0, Ordering::Relaxed);
        self.rolls_issued.store(0, Ordering::Relaxed);
        self.roll_failures.store(0, Ordering::Relaxed);
        self.collisions_reported.store(0, Ordering::Relaxed);
        self.collisions_ignored.store(0, Ordering::Relaxed);
        self.low_power_warnings.store(0, Ordering::Relaxed);
        self.ticks.store(0, Ordering::Relaxed);
        self.rejected_lines.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FleetMetricsSnapshot {
    pub odometry_samples: u64,
    pub rolls_issued: u64,
    pub roll_failures: u64,
    pub collisions_reported: u64,
    pub collisions_ignored: u64,
    pub low_power_warnings: u64,
    pub ticks: u64,
    pub rejected_lines: u64,
}

impl FleetMetricsSnapshot {
    /// roll 失败率（百分比）
    ///
    /// 没有任何 roll 时返回 0.0。
    pub fn roll_failure_rate(&self) -> f64 {
        let total = self.rolls_issued + self.roll_failures;
        if total == 0 {
            return 0.0;
        }
        self.roll_failures as f64 / total as f64 * 100.0
    }
}
