//! 遥测接入
//!
//! 每个机器人一个 [`RobotTelemetry`]，同时注册为电量、碰撞、里程计三类回调。
//! 回调只做原子写入和计数，不阻塞设备通知线程。

use crate::metrics::FleetMetrics;
use crate::state::RobotContext;
use sphero_device::{CollisionEvent, PowerState, TelemetryCallback, TelemetryEvent};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, trace, warn};

/// 判断系统是否处于稳态同步循环
///
/// 碰撞只在稳态循环中上报，准备阶段（定向、等待配置）的碰撞被忽略。
pub type SteadyStateProbe = Arc<dyn Fn() -> bool + Send + Sync>;

/// 单个机器人的遥测处理器
pub struct RobotTelemetry {
    label: String,
    context: Arc<RobotContext>,
    metrics: Arc<FleetMetrics>,
    steady_state: SteadyStateProbe,
}

impl RobotTelemetry {
    pub fn new(
        label: impl Into<String>,
        context: Arc<RobotContext>,
        metrics: Arc<FleetMetrics>,
        steady_state: SteadyStateProbe,
    ) -> Self {
        Self {
            label: label.into(),
            context,
            metrics,
            steady_state,
        }
    }

    fn on_power(&self, state: PowerState) {
        if state.is_low() {
            self.metrics.low_power_warnings.fetch_add(1, Ordering::Relaxed);
            warn!(robot = %self.label, "Battery of {} is low", self.label);
        } else {
            trace!(robot = %self.label, ?state, "Power notification");
        }
    }

    fn on_collision(&self, event: CollisionEvent) {
        if event.speed > 0.0 && (self.steady_state)() {
            self.metrics.collisions_reported.fetch_add(1, Ordering::Relaxed);
            warn!(
                robot = %self.label,
                speed = event.speed,
                "{} collided at speed {}",
                self.label,
                event.speed
            );
        } else {
            self.metrics.collisions_ignored.fetch_add(1, Ordering::Relaxed);
            debug!(robot = %self.label, speed = event.speed, "Collision ignored outside steady state");
        }
    }
}

impl TelemetryCallback for RobotTelemetry {
    fn on_telemetry(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Odometry(sample) => {
                self.metrics.odometry_samples.fetch_add(1, Ordering::Relaxed);
                if self.context.record_sample(sample) {
                    debug!(
                        robot = %self.label,
                        "Anchor latched at ({:.2}, {:.2})",
                        sample.odom_x,
                        sample.odom_y
                    );
                }
            },
            TelemetryEvent::Power(state) => self.on_power(*state),
            TelemetryEvent::Collision(collision) => self.on_collision(*collision),
        }
    }
}

impl std::fmt::Debug for RobotTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotTelemetry").field("label", &self.label).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphero_device::OdometrySample;
    use std::sync::atomic::AtomicBool;

    fn telemetry(steady: bool) -> (RobotTelemetry, Arc<RobotContext>, Arc<FleetMetrics>) {
        let context = Arc::new(RobotContext::new());
        let metrics = Arc::new(FleetMetrics::new());
        let handler = RobotTelemetry::new(
            "Sphero 1",
            context.clone(),
            metrics.clone(),
            Arc::new(move || steady),
        );
        (handler, context, metrics)
    }

    #[test]
    fn test_odometry_updates_context() {
        let (handler, context, metrics) = telemetry(false);
        handler.on_telemetry(&TelemetryEvent::Odometry(OdometrySample {
            odom_x: 2.0,
            odom_y: 0.0,
            velocity_x: 0.0,
            velocity_y: 120.0,
        }));

        let motion = context.motion();
        assert_eq!(motion.position, [2.0, 0.0]);
        assert!((motion.speed - 12.0).abs() < 1e-9);
        assert_eq!(metrics.snapshot().odometry_samples, 1);
    }

    #[test]
    fn test_low_power_warning_counted() {
        let (handler, _, metrics) = telemetry(false);
        handler.on_telemetry(&TelemetryEvent::Power(PowerState::Ok));
        handler.on_telemetry(&TelemetryEvent::Power(PowerState::from_code(3)));
        assert_eq!(metrics.snapshot().low_power_warnings, 1);
    }

    #[test]
    fn test_collision_ignored_without_command_artifact() {
        // 碰撞速度 5，指令文件不存在 → 不告警
        let (handler, _, metrics) = telemetry(false);
        handler.on_telemetry(&TelemetryEvent::Collision(CollisionEvent::new(5.0)));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.collisions_reported, 0);
        assert_eq!(snapshot.collisions_ignored, 1);
    }

    #[test]
    fn test_collision_reported_in_steady_state() {
        // 碰撞速度 5，指令文件存在 → 告警
        let (handler, _, metrics) = telemetry(true);
        handler.on_telemetry(&TelemetryEvent::Collision(CollisionEvent::new(5.0)));
        // 速度 0 的碰撞不告警
        handler.on_telemetry(&TelemetryEvent::Collision(CollisionEvent::new(0.0)));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.collisions_reported, 1);
        assert_eq!(snapshot.collisions_ignored, 1);
    }

    #[test]
    fn test_steady_state_checked_per_event() {
        let steady = Arc::new(AtomicBool::new(false));
        let flag = steady.clone();
        let metrics = Arc::new(FleetMetrics::new());
        let handler = RobotTelemetry::new(
            "RRO",
            Arc::new(RobotContext::new()),
            metrics.clone(),
            Arc::new(move || flag.load(Ordering::Relaxed)),
        );

        handler.on_telemetry(&TelemetryEvent::Collision(CollisionEvent::new(5.0)));
        steady.store(true, Ordering::Relaxed);
        handler.on_telemetry(&TelemetryEvent::Collision(CollisionEvent::new(5.0)));

        assert_eq!(metrics.snapshot().collisions_reported, 1);
    }
}
