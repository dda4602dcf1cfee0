//! Type State 会话 - 编译期保证阶段顺序
//!
//! ```text
//! Disconnected → (Connecting) → AwaitingConfirmation → Orienting → StreamingSetup
//!   → AwaitingConfig → AwaitingFirstPositions → SteadyState → Stopped
//! ```
//!
//! 每个阶段是一个状态类型，转换方法消费旧会话返回新会话。
//! 操作员在连接确认时报告蓝牙异常会回到 `Disconnected`。

use crate::artifacts::ArtifactPaths;
use crate::error::{BridgeError, Result};
use crate::frame::FrameTransform;
use crate::operator::Operator;
use crate::orientation::{Adjustment, HeadingCalibrator, wants_test_roll};
use crate::registration::{check_config, register_frames};
use crate::sync::{StepSynchronizer, StopReason};
use crate::watcher::{InterruptFlag, PollWatcher};
use sphero_device::{CollisionDetectConfig, DataStreamConfig, DeviceError, Rgb, RollCommand};
use sphero_driver::{DriverError, Fleet, Robot, SteadyStateProbe};
use sphero_protocol::{SimulatorConfig, speed_percent_to_byte};
use sphero_tools::{BridgeConfig, CollisionSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ==================== 阶段 ====================

/// 运行阶段（日志与状态查询用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    AwaitingOperatorConfirmation,
    Orienting,
    StreamingSetup,
    AwaitingConfig,
    AwaitingFirstPositions,
    SteadyStateLoop,
    Stopped,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Disconnected => "Disconnected",
            Phase::Connecting => "Connecting",
            Phase::AwaitingOperatorConfirmation => "AwaitingOperatorConfirmation",
            Phase::Orienting => "Orienting",
            Phase::StreamingSetup => "StreamingSetup",
            Phase::AwaitingConfig => "AwaitingConfig",
            Phase::AwaitingFirstPositions => "AwaitingFirstPositions",
            Phase::SteadyStateLoop => "SteadyStateLoop",
            Phase::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

// ==================== 状态类型 ====================

/// 状态类型与阶段的对应
pub trait SessionState {
    const PHASE: Phase;
}

/// 未连接
pub struct Disconnected;

/// 已连接，等待操作员确认蓝牙状态
pub struct AwaitingConfirmation;

/// 逐个校准朝向
pub struct Orienting;

/// 朝向已确认，准备开启数据流
pub struct StreamingSetup;

/// 数据流已开启，等待仿真配置文件
pub struct AwaitingConfig;

/// 配置已接受，等待每个机器人的第一条采样
pub struct AwaitingFirstPositions {
    config: SimulatorConfig,
}

/// 坐标系已注册，可以进入稳态循环
pub struct SteadyState {
    transforms: Vec<FrameTransform>,
}

/// 稳态循环结束
pub struct Stopped {
    reason: StopReason,
}

impl SessionState for Disconnected {
    const PHASE: Phase = Phase::Disconnected;
}
impl SessionState for AwaitingConfirmation {
    const PHASE: Phase = Phase::AwaitingOperatorConfirmation;
}
impl SessionState for Orienting {
    const PHASE: Phase = Phase::Orienting;
}
impl SessionState for StreamingSetup {
    const PHASE: Phase = Phase::StreamingSetup;
}
impl SessionState for AwaitingConfig {
    const PHASE: Phase = Phase::AwaitingConfig;
}
impl SessionState for AwaitingFirstPositions {
    const PHASE: Phase = Phase::AwaitingFirstPositions;
}
impl SessionState for SteadyState {
    const PHASE: Phase = Phase::SteadyStateLoop;
}
impl SessionState for Stopped {
    const PHASE: Phase = Phase::Stopped;
}

// ==================== 会话 ====================

/// 各阶段共享的上下文
#[derive(Debug, Clone)]
pub struct SessionContext {
    fleet: Arc<Fleet>,
    config: Arc<BridgeConfig>,
    paths: ArtifactPaths,
    interrupt: InterruptFlag,
}

impl SessionContext {
    fn watcher(&self, deadline: Option<Duration>) -> PollWatcher {
        PollWatcher::new(self.config.timing.poll_interval(), self.interrupt.clone())
            .with_deadline(deadline)
    }
}

/// 一次运行尝试
pub struct Session<State = Disconnected> {
    ctx: SessionContext,
    state: State,
}

/// 连接确认的结果
pub enum ConnectionCheck {
    /// 操作员确认，进入朝向校准
    Confirmed(Session<Orienting>),
    /// 操作员报告蓝牙异常，已断开，需要整体重启
    Rejected(Session<Disconnected>),
}

impl<S: SessionState> Session<S> {
    pub fn phase(&self) -> Phase {
        S::PHASE
    }

    pub fn fleet(&self) -> &Arc<Fleet> {
        &self.ctx.fleet
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.ctx.paths
    }

    fn transition<T: SessionState>(self, state: T) -> Session<T> {
        info!("Phase {} -> {}", S::PHASE, T::PHASE);
        Session {
            ctx: self.ctx,
            state,
        }
    }
}

/// 设备错误附上机器人下标
fn robot_error(robot: &Robot) -> impl Fn(DeviceError) -> BridgeError {
    let index = robot.index();
    move |source| BridgeError::Driver(DriverError::Device {
        robot: index,
        source,
    })
}

// ==================== Disconnected ====================

impl Session<Disconnected> {
    pub fn new(fleet: Arc<Fleet>, config: Arc<BridgeConfig>, interrupt: InterruptFlag) -> Self {
        let paths = ArtifactPaths::from_settings(&config.artifacts);
        Self {
            ctx: SessionContext {
                fleet,
                config,
                paths,
                interrupt,
            },
            state: Disconnected,
        }
    }

    /// 逐个连接机器人
    ///
    /// 连接失败无限重试（间隔 `connect_retry_ms`），只有人工中断能打断。
    /// 连上后点亮尾灯、指示灯置白，并转到航向 0。
    ///
    /// # 错误
    ///
    /// - `BridgeError::Interrupted`: 重试期间收到中断
    /// - `BridgeError::Driver`: 连接后的设置指令失败
    pub fn connect(self) -> Result<Session<AwaitingConfirmation>> {
        info!("Phase {} -> {}", Phase::Disconnected, Phase::Connecting);
        let watcher = self.ctx.watcher(None);
        let retry = self.ctx.config.timing.connect_retry();

        for robot in self.ctx.fleet.iter() {
            let mut attempts = 0u32;
            loop {
                watcher.interrupt().check()?;
                attempts += 1;
                match robot.device().connect() {
                    Ok(()) => break,
                    Err(e) if e.is_connect_failure() => {
                        debug!("Connect attempt {} to {} failed: {}", attempts, robot.label(), e);
                        watcher.sleep(retry)?;
                    },
                    Err(e) => return Err(robot_error(robot)(e)),
                }
            }
            info!(
                "Connected {} ({}) after {} attempt(s)",
                robot.label(),
                robot.address(),
                attempts
            );

            let device = robot.device();
            device.set_tail_light(u8::MAX, false).map_err(robot_error(robot))?;
            device.set_indicator_color(Rgb::WHITE, false).map_err(robot_error(robot))?;
            robot.roll(RollCommand::new(0, 0))?;
        }

        info!("Phase {} -> {}", Phase::Connecting, AwaitingConfirmation::PHASE);
        Ok(Session {
            ctx: self.ctx,
            state: AwaitingConfirmation,
        })
    }
}

// ==================== AwaitingConfirmation ====================

impl Session<AwaitingConfirmation> {
    /// 询问操作员所有机器人是否正常（常亮白灯）
    ///
    /// 否定回答时断开全部设备并清空运行时状态。
    pub fn confirm<O: Operator + ?Sized>(self, operator: &mut O) -> Result<ConnectionCheck> {
        let labels: Vec<String> = self.ctx.fleet.iter().map(Robot::label).collect();
        if operator.confirm_connection(&labels)? {
            return Ok(ConnectionCheck::Confirmed(self.transition(Orienting)));
        }

        warn!("Operator reported a Bluetooth anomaly, restarting connection setup");
        teardown(&self.ctx.fleet);
        self.ctx.fleet.reset_state();
        Ok(ConnectionCheck::Rejected(self.transition(Disconnected)))
    }
}

// ==================== Orienting ====================

impl Session<Orienting> {
    /// 逐个校准朝向，然后等待操作员摆放到位
    ///
    /// 当前机器人亮红灯并开启自稳；输入整数累加旋转，小幅调整时试跑一段；
    /// 空输入接受，把累计航向作为内部航向基准。
    pub fn orient<O: Operator + ?Sized>(self, operator: &mut O) -> Result<Session<StreamingSetup>> {
        let settings = &self.ctx.config.orientation;
        let watcher = self.ctx.watcher(None);
        operator.notify("Orient the robots along the baseline using the tail lights");

        for robot in self.ctx.fleet.iter() {
            let device = robot.device();
            device.set_indicator_color(Rgb::RED, true).map_err(robot_error(robot))?;
            device.set_stabilization(true, true).map_err(robot_error(robot))?;

            let mut calibrator = HeadingCalibrator::new();
            loop {
                watcher.interrupt().check()?;
                let input = operator.heading_adjustment(&robot.label(), calibrator.absolute())?;
                match Adjustment::parse(&input) {
                    Adjustment::Accept => break,
                    Adjustment::Rotate(delta) => {
                        let heading = calibrator.rotate(delta);
                        debug!("{} rotated by {} to {}", robot.label(), delta, heading);
                        robot.roll(RollCommand::new(0, heading))?;

                        if wants_test_roll(delta, settings.test_roll_threshold_deg) {
                            let speed = speed_percent_to_byte(settings.test_roll_speed_percent);
                            robot.roll(RollCommand::new(speed, heading))?;
                            watcher.sleep(settings.test_roll_duration())?;
                            robot.roll(RollCommand::new(0, heading))?;
                        }
                    },
                    Adjustment::Invalid(text) => {
                        warn!("Rejected heading adjustment {:?} for {}", text, robot.label());
                        operator.notify(
                            "Enter a whole number of degrees (positive = clockwise) or press Enter to accept",
                        );
                    },
                }
            }

            robot.context().set_internal_heading(calibrator.heading());
            device.set_indicator_color(Rgb::WHITE, false).map_err(robot_error(robot))?;
            info!("{} heading reference set to {}", robot.label(), calibrator.heading());
        }

        while !operator.confirm_placement()? {
            watcher.interrupt().check()?;
            operator.notify("Place the robots at their matching NetLogo positions");
        }

        Ok(self.transition(StreamingSetup))
    }
}

// ==================== StreamingSetup ====================

fn collision_config(settings: &CollisionSettings) -> CollisionDetectConfig {
    CollisionDetectConfig {
        method: settings.method,
        x_threshold: settings.x_threshold,
        x_speed: settings.x_speed,
        y_threshold: settings.y_threshold,
        y_speed: settings.y_speed,
        dead_time: settings.dead_time,
    }
}

impl Session<StreamingSetup> {
    /// 清理遗留文件，配置并开启遥测
    ///
    /// 碰撞只在指令文件存在（稳态循环）时上报。
    pub fn start_streaming<O: Operator + ?Sized>(
        self,
        operator: &mut O,
    ) -> Result<Session<AwaitingConfig>> {
        self.ctx.paths.clear_stale()?;

        let config = &self.ctx.config;
        let collision = collision_config(&config.collision);
        let stream = DataStreamConfig::with_divisor(config.streaming.sample_divisor);
        for robot in self.ctx.fleet.iter() {
            let device = robot.device();
            device.set_power_notifications(true, true).map_err(robot_error(robot))?;
            device
                .configure_collision_detection(collision, true)
                .map_err(robot_error(robot))?;
            device.configure_data_stream(stream, true).map_err(robot_error(robot))?;
        }

        let command_path = self.ctx.paths.command.clone();
        let probe: SteadyStateProbe = Arc::new(move || command_path.exists());
        self.ctx.fleet.attach_telemetry(probe)?;

        for robot in self.ctx.fleet.iter() {
            robot.device().start_streaming().map_err(robot_error(robot))?;
        }
        info!("Telemetry streaming at {:.1} Hz", stream.rate_hz());

        operator.notify("Go to NetLogo, adapt the model parameters if necessary and press 'setup'");
        Ok(self.transition(AwaitingConfig))
    }
}

// ==================== AwaitingConfig ====================

impl Session<AwaitingConfig> {
    /// 等待并解析仿真配置文件
    ///
    /// 格式错误或机器人数量不一致时提示重新 setup，等待文件内容变化后重试，
    /// 不需要重新连接。配置接受后允许锚点锁存。
    pub fn await_config<O: Operator + ?Sized>(
        self,
        operator: &mut O,
    ) -> Result<Session<AwaitingFirstPositions>> {
        let watcher = self.ctx.watcher(self.ctx.config.timing.config_deadline());
        let paths = &self.ctx.paths;
        let mut rejected: Option<String> = None;

        let config = loop {
            let text = watcher.wait_for("config file", || {
                Ok(paths
                    .read_config()?
                    .filter(|text| rejected.as_deref() != Some(text.as_str())))
            })?;

            let parsed = SimulatorConfig::parse(&text)
                .map_err(BridgeError::from)
                .and_then(|config| check_config(&config, self.ctx.fleet.len()).map(|()| config));
            match parsed {
                Ok(config) => break config,
                Err(e) if e.is_recoverable() => {
                    warn!("Config file rejected: {}", e);
                    operator.notify("Config file creation failed. Please press 'setup' in NetLogo again");
                    rejected = Some(text);
                },
                Err(e) => return Err(e),
            }
        };

        info!(
            "Config accepted: {} robots, scale {}",
            config.fleet_size, config.scale
        );
        for robot in self.ctx.fleet.iter() {
            robot.context().arm_anchor();
        }
        Ok(self.transition(AwaitingFirstPositions { config }))
    }
}

// ==================== AwaitingFirstPositions ====================

impl Session<AwaitingFirstPositions> {
    pub fn simulator_config(&self) -> &SimulatorConfig {
        &self.state.config
    }

    /// 等待锚点并计算每个机器人的坐标变换
    pub fn register<O: Operator + ?Sized>(self, operator: &mut O) -> Result<Session<SteadyState>> {
        let watcher = self.ctx.watcher(self.ctx.config.timing.first_sample_deadline());
        let transforms = register_frames(&self.ctx.fleet, &self.state.config, &watcher)?;

        operator.notify("Frames registered. You can press 'start' in NetLogo now");
        Ok(self.transition(SteadyState { transforms }))
    }
}

// ==================== SteadyState ====================

impl Session<SteadyState> {
    pub fn transforms(&self) -> &[FrameTransform] {
        &self.state.transforms
    }

    /// 等待指令文件出现，运行稳态循环直到仿真结束
    pub fn run(self) -> Result<Session<Stopped>> {
        self.ctx
            .watcher(self.ctx.config.timing.command_deadline())
            .wait_for_file(&self.ctx.paths.command)?;
        info!("Command file found");

        let mut synchronizer = StepSynchronizer::new(
            self.ctx.fleet.clone(),
            self.state.transforms.clone(),
            self.ctx.paths.clone(),
            self.ctx.config.report.precision,
        );
        let reason = synchronizer.run(&self.ctx.watcher(None))?;
        Ok(self.transition(Stopped { reason }))
    }
}

// ==================== Stopped ====================

impl Session<Stopped> {
    pub fn reason(&self) -> StopReason {
        self.state.reason
    }
}

/// 尽力停车、取消订阅、断开
///
/// 从未连接或从未订阅的设备产生的错误只记录，不影响其它机器人。
pub fn teardown(fleet: &Fleet) {
    let stop_errors = fleet.stop_all().len();
    let detach_errors = fleet.detach_all().len();
    let disconnect_errors = fleet.disconnect_all().len();
    info!(
        "Fleet torn down ({} stop, {} unsubscribe, {} disconnect errors)",
        stop_errors, detach_errors, disconnect_errors
    );
}

/// 收尾守卫
///
/// 持有期间如果发生 panic，`Drop` 时仍会停车、取消订阅并断开全部设备；
/// 正常路径调用 [`finish`](Self::finish) 显式收尾。
pub struct TeardownGuard {
    fleet: Option<Arc<Fleet>>,
}

impl TeardownGuard {
    pub fn new(fleet: Arc<Fleet>) -> Self {
        Self { fleet: Some(fleet) }
    }

    /// 立即收尾并解除守卫
    pub fn finish(mut self) {
        if let Some(fleet) = self.fleet.take() {
            teardown(&fleet);
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(fleet) = self.fleet.take() {
            warn!("Session unwound without finishing, tearing down fleet");
            teardown(&fleet);
        }
    }
}
