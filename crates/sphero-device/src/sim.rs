//! 运动学仿真后端
//!
//! 每台 `SimSphero` 在连接后启动一个物理线程，按固定步长积分位置，
//! 并在开启数据流后以 [`DataStreamConfig::rate_hz`] 的频率推送里程计。
//!
//! 设备坐标系与真实 Sphero 一致：航向 0 指向 +y，顺时针为正；
//! 位置单位 cm，速度分量单位 mm/s。

use crate::command::{CollisionDetectConfig, DataStreamConfig, Rgb, RollCommand, RollState};
use crate::telemetry::{
    CallbackRegistry, CollisionEvent, OdometrySample, PowerState, TelemetryCallback,
    TelemetryEvent, TelemetryKind,
};
use crate::{DeviceError, SpheroDevice};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 仿真参数
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// 速度字节 255 对应的速度（cm/s）
    pub max_speed_cm_s: f64,
    /// 物理积分步长
    pub tick: Duration,
    /// 前 N 次连接尝试失败（模拟蓝牙不稳定）
    pub connect_failures: u32,
    /// 上电时的里程计位置（cm）
    pub start_position: [f64; 2],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_speed_cm_s: 100.0,
            tick: Duration::from_millis(10),
            connect_failures: 0,
            start_position: [0.0, 0.0],
        }
    }
}

enum SimCommand {
    Roll(RollCommand),
    Shutdown,
}

#[derive(Debug, Clone, Copy, Default)]
struct Kinematics {
    x_cm: f64,
    y_cm: f64,
    heading_deg: f64,
    speed_cm_s: f64,
}

impl Kinematics {
    fn advance(&mut self, dt: Duration) {
        let rad = self.heading_deg.to_radians();
        let dt = dt.as_secs_f64();
        self.x_cm += self.speed_cm_s * rad.sin() * dt;
        self.y_cm += self.speed_cm_s * rad.cos() * dt;
    }

    fn sample(&self) -> OdometrySample {
        let rad = self.heading_deg.to_radians();
        let speed_mm_s = self.speed_cm_s * 10.0;
        OdometrySample {
            odom_x: self.x_cm,
            odom_y: self.y_cm,
            velocity_x: speed_mm_s * rad.sin(),
            velocity_y: speed_mm_s * rad.cos(),
        }
    }
}

/// 物理线程与控制线程共享的状态
struct SimShared {
    connected: AtomicBool,
    streaming: AtomicBool,
    power_notify: AtomicBool,
    stabilization: AtomicBool,
    tail_light: AtomicU8,
    rolls: AtomicU64,
    callbacks: CallbackRegistry,
    kinematics: Mutex<Kinematics>,
    stream: Mutex<DataStreamConfig>,
    collision: Mutex<Option<CollisionDetectConfig>>,
    indicator: Mutex<Rgb>,
}

/// 仿真 Sphero
pub struct SimSphero {
    address: String,
    config: SimConfig,
    shared: Arc<SimShared>,
    attempts: AtomicU32,
    worker: Mutex<Option<(Sender<SimCommand>, JoinHandle<()>)>>,
}

impl SimSphero {
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, SimConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: SimConfig) -> Self {
        let kinematics = Kinematics {
            x_cm: config.start_position[0],
            y_cm: config.start_position[1],
            ..Kinematics::default()
        };

        Self {
            address: address.into(),
            shared: Arc::new(SimShared {
                connected: AtomicBool::new(false),
                streaming: AtomicBool::new(false),
                power_notify: AtomicBool::new(false),
                stabilization: AtomicBool::new(true),
                tail_light: AtomicU8::new(0),
                rolls: AtomicU64::new(0),
                callbacks: CallbackRegistry::new(),
                kinematics: Mutex::new(kinematics),
                stream: Mutex::new(DataStreamConfig::default()),
                collision: Mutex::new(None),
                indicator: Mutex::new(Rgb::OFF),
            }),
            config,
            attempts: AtomicU32::new(0),
            worker: Mutex::new(None),
        }
    }

    /// 当前里程计位置（cm）
    pub fn position(&self) -> [f64; 2] {
        let k = self.shared.kinematics.lock();
        [k.x_cm, k.y_cm]
    }

    /// 当前设备航向（度）
    pub fn heading(&self) -> f64 {
        self.shared.kinematics.lock().heading_deg
    }

    /// 当前速度（cm/s）
    pub fn speed(&self) -> f64 {
        self.shared.kinematics.lock().speed_cm_s
    }

    pub fn indicator_color(&self) -> Rgb {
        *self.shared.indicator.lock()
    }

    pub fn tail_light(&self) -> u8 {
        self.shared.tail_light.load(Ordering::Relaxed)
    }

    pub fn stabilization(&self) -> bool {
        self.shared.stabilization.load(Ordering::Relaxed)
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.streaming.load(Ordering::Acquire)
    }

    /// 已接收的 roll 指令数
    pub fn rolls_received(&self) -> u64 {
        self.shared.rolls.load(Ordering::Relaxed)
    }

    /// 连接尝试次数（含失败）
    pub fn connect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// 是否订阅了某类遥测
    pub fn is_subscribed(&self, kind: TelemetryKind) -> bool {
        self.shared.callbacks.contains(kind)
    }

    /// 注入一次碰撞
    ///
    /// 仅当已连接且碰撞检测已启用时投递，返回是否被回调接收。
    pub fn inject_collision(&self, speed: f64) -> bool {
        let enabled = matches!(*self.shared.collision.lock(), Some(c) if c.method != 0);
        if !self.is_connected() || !enabled {
            return false;
        }
        self.shared
            .callbacks
            .dispatch(&TelemetryEvent::Collision(CollisionEvent::new(speed)))
    }

    /// 注入一次电量通知
    pub fn inject_power(&self, state: PowerState) -> bool {
        if !self.is_connected() || !self.shared.power_notify.load(Ordering::Relaxed) {
            return false;
        }
        self.shared.callbacks.dispatch(&TelemetryEvent::Power(state))
    }

    /// 立即推送一次里程计（不等待流周期）
    pub fn emit_odometry_now(&self) -> bool {
        if !self.is_streaming() {
            return false;
        }
        let sample = self.shared.kinematics.lock().sample();
        self.shared.callbacks.dispatch(&TelemetryEvent::Odometry(sample))
    }

    fn ensure_connected(&self) -> Result<(), DeviceError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DeviceError::NotConnected {
                address: self.address.clone(),
            })
        }
    }

    fn shutdown_worker(&self) {
        let Some((tx, handle)) = self.worker.lock().take() else {
            return;
        };
        let _ = tx.send(SimCommand::Shutdown);
        drop(tx);
        if handle.join().is_err() {
            warn!("Simulated device {} physics thread panicked", self.address);
        }
    }
}

impl SpheroDevice for SimSphero {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    fn connect(&self) -> Result<(), DeviceError> {
        if self.is_connected() {
            return Ok(());
        }

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        if attempt < self.config.connect_failures {
            debug!(
                "Simulated connect failure for {} (attempt {})",
                self.address,
                attempt + 1
            );
            return Err(DeviceError::ConnectFailed {
                address: self.address.clone(),
                reason: "simulated radio failure".to_string(),
            });
        }

        let (tx, rx) = crossbeam_channel::bounded(16);
        let shared = self.shared.clone();
        let config = self.config.clone();
        let handle = std::thread::Builder::new()
            .name(format!("sim-sphero-{}", self.address))
            .spawn(move || physics_loop(shared, rx, config))
            .map_err(|e| DeviceError::ConnectFailed {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        *self.worker.lock() = Some((tx, handle));
        self.shared.connected.store(true, Ordering::Release);
        debug!("Simulated device {} connected", self.address);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), DeviceError> {
        self.shared.streaming.store(false, Ordering::Release);
        self.shared.connected.store(false, Ordering::Release);
        self.shutdown_worker();
        Ok(())
    }

    fn roll(&self, command: RollCommand) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        let guard = self.worker.lock();
        let Some((tx, _)) = guard.as_ref() else {
            return Err(DeviceError::NotConnected {
                address: self.address.clone(),
            });
        };
        tx.send(SimCommand::Roll(command))
            .map_err(|_| DeviceError::Backend {
                address: self.address.clone(),
                reason: "physics thread exited".to_string(),
            })?;
        self.shared.rolls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn set_indicator_color(&self, color: Rgb, _wait_for_response: bool) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        *self.shared.indicator.lock() = color;
        Ok(())
    }

    fn set_tail_light(&self, brightness: u8, _wait_for_response: bool) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.shared.tail_light.store(brightness, Ordering::Relaxed);
        Ok(())
    }

    fn set_stabilization(
        &self,
        enabled: bool,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.shared.stabilization.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    fn configure_collision_detection(
        &self,
        config: CollisionDetectConfig,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        *self.shared.collision.lock() = Some(config);
        Ok(())
    }

    fn set_power_notifications(
        &self,
        enabled: bool,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.shared.power_notify.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    fn configure_data_stream(
        &self,
        config: DataStreamConfig,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        *self.shared.stream.lock() = config;
        Ok(())
    }

    fn subscribe(
        &self,
        kind: TelemetryKind,
        callback: Arc<dyn TelemetryCallback>,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        if self.shared.callbacks.insert(kind, callback) {
            trace!("{}: replaced {:?} subscription", self.address, kind);
        }
        Ok(())
    }

    fn unsubscribe(&self, kind: TelemetryKind) -> Result<(), DeviceError> {
        self.shared.callbacks.remove(kind);
        Ok(())
    }

    fn start_streaming(&self) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.shared.streaming.store(true, Ordering::Release);
        Ok(())
    }
}

impl Drop for SimSphero {
    fn drop(&mut self) {
        self.shared.connected.store(false, Ordering::Release);
        self.shutdown_worker();
    }
}

impl std::fmt::Debug for SimSphero {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimSphero")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn physics_loop(shared: Arc<SimShared>, rx: Receiver<SimCommand>, config: SimConfig) {
    let mut last_tick = Instant::now();
    let mut last_emit = Instant::now();

    loop {
        match rx.recv_timeout(config.tick) {
            Ok(SimCommand::Roll(command)) => {
                let mut k = shared.kinematics.lock();
                k.heading_deg = f64::from(command.heading % 360);
                k.speed_cm_s = match command.state {
                    RollState::Stop => 0.0,
                    _ => f64::from(command.speed) / 255.0 * config.max_speed_cm_s,
                };
            },
            Ok(SimCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {},
        }

        let now = Instant::now();
        let sample = {
            let mut k = shared.kinematics.lock();
            k.advance(now - last_tick);
            k.sample()
        };
        last_tick = now;

        if shared.streaming.load(Ordering::Acquire) {
            let period = Duration::from_secs_f64(1.0 / shared.stream.lock().rate_hz());
            if now - last_emit >= period {
                shared.callbacks.dispatch(&TelemetryEvent::Odometry(sample));
                last_emit = now;
            }
        }
    }
}
