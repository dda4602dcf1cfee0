//! Mock 设备（无硬件依赖）
//!
//! 记录每次调用，遥测由测试通过 [`MockSphero::emit`] 手动推送。

use crate::command::{CollisionDetectConfig, DataStreamConfig, Rgb, RollCommand};
use crate::telemetry::{CallbackRegistry, TelemetryCallback, TelemetryEvent, TelemetryKind};
use crate::{DeviceError, SpheroDevice};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// 一次记录下来的设备调用
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Connect,
    Disconnect,
    Roll(RollCommand),
    IndicatorColor(Rgb),
    TailLight(u8),
    Stabilization(bool),
    CollisionDetection(CollisionDetectConfig),
    PowerNotifications(bool),
    DataStream(DataStreamConfig),
    Subscribe(TelemetryKind),
    Unsubscribe(TelemetryKind),
    StartStreaming,
}

/// Mock Sphero
#[derive(Debug, Default)]
pub struct MockSphero {
    address: String,
    connected: AtomicBool,
    connect_failures: AtomicU32,
    fail_rolls: AtomicBool,
    fail_unsubscribe: AtomicBool,
    roll_delay: Mutex<Duration>,
    calls: Mutex<Vec<DeviceCall>>,
    callbacks: CallbackRegistry,
}

impl MockSphero {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// 接下来 N 次连接尝试失败
    pub fn fail_next_connects(&self, count: u32) {
        self.connect_failures.store(count, Ordering::Relaxed);
    }

    /// 之后的 roll 全部失败
    pub fn fail_rolls(&self, fail: bool) {
        self.fail_rolls.store(fail, Ordering::Relaxed);
    }

    pub fn fail_unsubscribe(&self, fail: bool) {
        self.fail_unsubscribe.store(fail, Ordering::Relaxed);
    }

    /// 每次 roll 阻塞指定时长（用于验证并行下发）
    pub fn set_roll_delay(&self, delay: Duration) {
        *self.roll_delay.lock() = delay;
    }

    /// 推送一条遥测，返回是否有回调接收
    pub fn emit(&self, event: TelemetryEvent) -> bool {
        self.callbacks.dispatch(&event)
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// 已下发的 roll 指令
    pub fn rolls(&self) -> Vec<RollCommand> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Roll(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    pub fn is_subscribed(&self, kind: TelemetryKind) -> bool {
        self.callbacks.contains(kind)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
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
}

impl SpheroDevice for MockSphero {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn connect(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Connect);
        let remaining = self.connect_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.connect_failures.store(remaining - 1, Ordering::Relaxed);
            return Err(DeviceError::ConnectFailed {
                address: self.address.clone(),
                reason: "mock connect failure".to_string(),
            });
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), DeviceError> {
        self.record(DeviceCall::Disconnect);
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn roll(&self, command: RollCommand) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        let delay = *self.roll_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.fail_rolls.load(Ordering::Relaxed) {
            return Err(DeviceError::Backend {
                address: self.address.clone(),
                reason: "mock roll failure".to_string(),
            });
        }
        self.record(DeviceCall::Roll(command));
        Ok(())
    }

    fn set_indicator_color(&self, color: Rgb, _wait_for_response: bool) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::IndicatorColor(color));
        Ok(())
    }

    fn set_tail_light(&self, brightness: u8, _wait_for_response: bool) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::TailLight(brightness));
        Ok(())
    }

    fn set_stabilization(
        &self,
        enabled: bool,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::Stabilization(enabled));
        Ok(())
    }

    fn configure_collision_detection(
        &self,
        config: CollisionDetectConfig,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::CollisionDetection(config));
        Ok(())
    }

    fn set_power_notifications(
        &self,
        enabled: bool,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::PowerNotifications(enabled));
        Ok(())
    }

    fn configure_data_stream(
        &self,
        config: DataStreamConfig,
        _wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::DataStream(config));
        Ok(())
    }

    fn subscribe(
        &self,
        kind: TelemetryKind,
        callback: Arc<dyn TelemetryCallback>,
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::Subscribe(kind));
        self.callbacks.insert(kind, callback);
        Ok(())
    }

    fn unsubscribe(&self, kind: TelemetryKind) -> Result<(), DeviceError> {
        self.record(DeviceCall::Unsubscribe(kind));
        if self.fail_unsubscribe.load(Ordering::Relaxed) {
            return Err(DeviceError::Timeout {
                address: self.address.clone(),
            });
        }
        self.callbacks.remove(kind);
        Ok(())
    }

    fn start_streaming(&self) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.record(DeviceCall::StartStreaming);
        Ok(())
    }
}
