//! 编队注册表与并行指令下发

use crate::error::DriverError;
use crate::ingest::{RobotTelemetry, SteadyStateProbe};
use crate::metrics::FleetMetrics;
use crate::state::RobotContext;
use sphero_device::{RollCommand, SpheroDevice, TelemetryKind};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, warn};

/// 编队中的一个机器人
#[derive(Clone)]
pub struct Robot {
    index: usize,
    name: Option<String>,
    device: Arc<dyn SpheroDevice>,
    context: Arc<RobotContext>,
}

impl Robot {
    pub fn new(index: usize, name: Option<String>, device: Arc<dyn SpheroDevice>) -> Self {
        Self {
            index,
            name,
            device,
            context: Arc::new(RobotContext::new()),
        }
    }

    /// 编队下标（0 起）
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 日志/提示中使用的名称：配置名，否则 `Sphero <n>`（1 起）
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Sphero {}", self.index + 1),
        }
    }

    pub fn address(&self) -> &str {
        self.device.address()
    }

    pub fn device(&self) -> &dyn SpheroDevice {
        self.device.as_ref()
    }

    pub fn context(&self) -> &Arc<RobotContext> {
        &self.context
    }

    /// 注册三类遥测回调
    pub fn attach_telemetry(
        &self,
        metrics: Arc<FleetMetrics>,
        steady_state: SteadyStateProbe,
    ) -> Result<(), DriverError> {
        let handler = Arc::new(RobotTelemetry::new(
            self.label(),
            self.context.clone(),
            metrics,
            steady_state,
        ));
        for kind in TelemetryKind::ALL {
            self.device
                .subscribe(kind, handler.clone())
                .map_err(|e| DriverError::device(self.index, e))?;
        }
        Ok(())
    }

    /// 取消三类遥测回调
    ///
    /// 每一类都会尝试，返回遇到的错误。
    pub fn detach_telemetry(&self) -> Vec<DriverError> {
        TelemetryKind::ALL
            .into_iter()
            .filter_map(|kind| {
                self.device
                    .unsubscribe(kind)
                    .err()
                    .map(|e| DriverError::device(self.index, e))
            })
            .collect()
    }

    pub fn roll(&self, command: RollCommand) -> Result<(), DriverError> {
        self.device
            .roll(command)
            .map_err(|e| DriverError::device(self.index, e))
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("address", &self.address())
            .finish()
    }
}

/// 机器人注册表，按编队下标索引
#[derive(Debug, Default)]
pub struct Fleet {
    robots: Vec<Robot>,
    metrics: Arc<FleetMetrics>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 (名称, 设备) 列表构建，顺序即编队下标
    pub fn from_devices<I>(devices: I) -> Self
    where
        I: IntoIterator<Item = (Option<String>, Arc<dyn SpheroDevice>)>,
    {
        let mut fleet = Self::new();
        for (name, device) in devices {
            fleet.push(name, device);
        }
        fleet
    }

    /// 追加一个机器人，返回其下标
    pub fn push(&mut self, name: Option<String>, device: Arc<dyn SpheroDevice>) -> usize {
        let index = self.robots.len();
        self.robots.push(Robot::new(index, name, device));
        index
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Robot> {
        self.robots.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Robot, DriverError> {
        self.robots.get(index).ok_or(DriverError::IndexOutOfRange {
            index,
            len: self.robots.len(),
        })
    }

    pub fn metrics(&self) -> &Arc<FleetMetrics> {
        &self.metrics
    }

    /// 清空所有机器人的运行时状态（航向基准、锚点、运动状态）
    ///
    /// 用于整体重启：编队成员与设备句柄保留。
    pub fn reset_state(&self) {
        for robot in &self.robots {
            robot.context.reset();
        }
    }

    /// 为所有机器人注册遥测回调
    pub fn attach_telemetry(&self, steady_state: SteadyStateProbe) -> Result<(), DriverError> {
        for robot in &self.robots {
            robot.attach_telemetry(self.metrics.clone(), steady_state.clone())?;
        }
        Ok(())
    }

    /// 并行下发一批 roll 指令，等待全部完成
    ///
    /// 每个机器人一个短生命周期线程，线程只访问自己的指令。所有线程
    /// join 之后才返回；如有失败，返回下标最小的那个错误。
    pub fn roll_all(&self, commands: &[RollCommand]) -> Result<(), DriverError> {
        if commands.len() != self.robots.len() {
            return Err(DriverError::BatchSize {
                expected: self.robots.len(),
                actual: commands.len(),
            });
        }

        let results: Vec<Result<(), DriverError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .robots
                .iter()
                .zip(commands)
                .map(|(robot, command)| {
                    let spawned = std::thread::Builder::new()
                        .name(format!("roll-{}", robot.index))
                        .spawn_scoped(scope, move || robot.roll(*command));
                    (robot.index, spawned)
                })
                .collect();

            handles
                .into_iter()
                .map(|(index, spawned)| match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or(Err(DriverError::WorkerPanicked { robot: index })),
                    Err(e) => Err(DriverError::Spawn {
                        robot: index,
                        reason: e.to_string(),
                    }),
                })
                .collect()
        });

        let mut first_error = None;
        for result in results {
            match result {
                Ok(()) => {
                    self.metrics.rolls_issued.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    self.metrics.roll_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Roll failed: {}", e);
                    first_error.get_or_insert(e);
                },
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 尽力停车：对每个机器人下发 roll(0, 0)
    ///
    /// 未连接或从未初始化的设备产生的错误被收集并记录，不会中断其它机器人。
    pub fn stop_all(&self) -> Vec<DriverError> {
        let errors: Vec<DriverError> = self
            .robots
            .iter()
            .filter_map(|robot| robot.roll(RollCommand::stop()).err())
            .collect();
        for e in &errors {
            debug!("Stop skipped: {}", e);
        }
        errors
    }

    /// 尽力取消所有遥测订阅
    pub fn detach_all(&self) -> Vec<DriverError> {
        let errors: Vec<DriverError> = self
            .robots
            .iter()
            .flat_map(|robot| robot.detach_telemetry())
            .collect();
        for e in &errors {
            debug!("Unsubscribe failed: {}", e);
        }
        errors
    }

    /// 尽力断开所有设备
    pub fn disconnect_all(&self) -> Vec<DriverError> {
        let mut errors = Vec::new();
        for robot in &self.robots {
            if let Err(e) = robot.device.disconnect() {
                error!("Failed to disconnect {}: {}", robot.label(), e);
                errors.push(DriverError::device(robot.index, e));
            }
        }
        errors
    }
}
