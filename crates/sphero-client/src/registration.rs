//! 坐标系注册
//!
//! 仿真配置就绪后，为每个机器人等待锚点（注册后第一条真实遥测），
//! 再结合已确认的内部航向基准计算 [`FrameTransform`]。

use crate::error::{BridgeError, Result};
use crate::frame::FrameTransform;
use crate::watcher::PollWatcher;
use sphero_driver::Fleet;
use sphero_protocol::SimulatorConfig;
use tracing::{debug, info};

/// 检查仿真配置与本地编队是否一致
///
/// 超出本地编队的初始位置被忽略，机器人数量由 `number_of_spheros_in_netlogo` 决定。
pub fn check_config(config: &SimulatorConfig, fleet_len: usize) -> Result<()> {
    if config.fleet_size != fleet_len {
        return Err(BridgeError::FleetSizeMismatch {
            declared: config.fleet_size,
            local: fleet_len,
        });
    }

    if let Some(robot) = (0..fleet_len).find(|i| config.initial_position(*i).is_none()) {
        return Err(BridgeError::MissingInitialPosition { robot });
    }

    Ok(())
}

/// 为整个编队计算坐标变换
///
/// 调用前锚点必须已经 arm（见 `RobotContext::arm_anchor`），
/// 这里阻塞直到每个机器人都锚定到真实采样。
pub fn register_frames(
    fleet: &Fleet,
    config: &SimulatorConfig,
    watcher: &PollWatcher,
) -> Result<Vec<FrameTransform>> {
    check_config(config, fleet.len())?;

    let mut transforms = Vec::with_capacity(fleet.len());
    for robot in fleet.iter() {
        let context = robot.context();
        let what = format!("first sample from {}", robot.label());
        let anchor = watcher.wait_for(&what, || Ok(context.anchor()))?;

        let initial = config
            .initial_position(robot.index())
            .ok_or(BridgeError::MissingInitialPosition {
                robot: robot.index(),
            })?;
        let transform =
            FrameTransform::register(context.internal_heading(), config.scale, anchor, initial)?;

        debug!(
            "{} anchored at {:?}, offset {:?}",
            robot.label(),
            anchor,
            transform.offset()
        );
        transforms.push(transform);
    }

    info!("Registered {} robot frames (scale {})", transforms.len(), config.scale);
    Ok(transforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::InterruptFlag;
    use sphero_device::{MockSphero, OdometrySample, SpheroDevice, TelemetryEvent};
    use sphero_protocol::Deg;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(fleet_size: usize, positions: &[[f64; 2]]) -> SimulatorConfig {
        SimulatorConfig {
            fleet_size,
            scale: 1.0,
            initial_positions: positions.iter().copied().enumerate().collect::<BTreeMap<_, _>>(),
        }
    }

    fn odometry(x: f64, y: f64) -> TelemetryEvent {
        TelemetryEvent::Odometry(OdometrySample {
            odom_x: x,
            odom_y: y,
            velocity_x: 0.0,
            velocity_y: 0.0,
        })
    }

    #[test]
    fn test_check_config() {
        assert!(check_config(&config(2, &[[5.0, 5.0], [-3.0, 2.0]]), 2).is_ok());

        let err = check_config(&config(3, &[[0.0, 0.0]; 3]), 2).unwrap_err();
        assert!(matches!(err, BridgeError::FleetSizeMismatch { declared: 3, local: 2 }));
        assert!(err.is_recoverable());

        let err = check_config(&config(2, &[[0.0, 0.0]]), 2).unwrap_err();
        assert!(matches!(err, BridgeError::MissingInitialPosition { robot: 1 }));

        // 多余的初始位置被忽略
        assert!(check_config(&config(1, &[[0.0, 0.0], [1.0, 1.0]]), 1).is_ok());
    }

    #[test]
    fn test_register_two_robots() {
        let mocks: Vec<Arc<MockSphero>> =
            (0..2).map(|i| Arc::new(MockSphero::new(format!("mock-{}", i)))).collect();
        let fleet = Fleet::from_devices(
            mocks.iter().map(|m| (None, m.clone() as Arc<dyn SpheroDevice>)),
        );
        for mock in &mocks {
            mock.connect().unwrap();
        }
        fleet.attach_telemetry(Arc::new(|| false)).unwrap();

        fleet.robots()[0].context().set_internal_heading(Deg(0.0));
        fleet.robots()[1].context().set_internal_heading(Deg(90.0));

        // 注册前的采样不作为锚点
        mocks[0].emit(odometry(42.0, 42.0));
        for robot in fleet.iter() {
            robot.context().arm_anchor();
        }

        let emitter = {
            let mocks = mocks.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                for mock in &mocks {
                    mock.emit(odometry(0.0, 0.0));
                    mock.emit(odometry(9.0, 9.0));
                }
            })
        };

        let watcher = PollWatcher::new(Duration::from_millis(5), InterruptFlag::new())
            .with_deadline(Some(Duration::from_secs(5)));
        let transforms =
            register_frames(&fleet, &config(2, &[[5.0, 5.0], [-3.0, 2.0]]), &watcher).unwrap();
        emitter.join().unwrap();

        assert_eq!(transforms[0].offset(), [5.0, 5.0]);
        let t1 = transforms[1].to_sim([2.0, 0.0]);
        assert!((t1[0] + 3.0).abs() < 1e-9 && (t1[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_first_sample_times_out() {
        let fleet = Fleet::from_devices([(
            None,
            Arc::new(MockSphero::new("mock-0")) as Arc<dyn SpheroDevice>,
        )]);
        fleet.robots()[0].context().arm_anchor();

        let watcher = PollWatcher::new(Duration::from_millis(5), InterruptFlag::new())
            .with_deadline(Some(Duration::from_millis(30)));
        let err = register_frames(&fleet, &config(1, &[[0.0, 0.0]]), &watcher).unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { .. }));
    }
}
