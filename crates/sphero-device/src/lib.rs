//! # Sphero Device Layer
//!
//! 设备抽象层，为单个 Sphero 球形机器人提供统一接口。
//!
//! 所有方法都以 `&self` 调用：同一台设备会被同步循环（下发 roll）
//! 与遥测回调线程同时访问，实现方负责内部同步。
//!
//! 后端：
//! - [`SimSphero`]: 运动学仿真后端，无需蓝牙硬件
//! - `MockSphero`（`mock` feature）: 记录所有指令，供上层单元测试使用

use std::sync::Arc;
use thiserror::Error;

pub mod command;
pub mod sim;
pub mod telemetry;

#[cfg(feature = "mock")]
pub mod mock;

pub use command::{CollisionDetectConfig, DataStreamConfig, Rgb, RollCommand, RollState};
pub use sim::{SimConfig, SimSphero};
pub use telemetry::{
    CallbackRegistry, CollisionEvent, OdometrySample, POWER_STATE_LOW, PowerState,
    TelemetryCallback, TelemetryEvent, TelemetryKind,
};

#[cfg(feature = "mock")]
pub use mock::{DeviceCall, MockSphero};

/// 设备层统一错误类型
#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    #[error("Device {address} is not connected")]
    NotConnected { address: String },
    #[error("Connection to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },
    #[error("Device {address} did not respond")]
    Timeout { address: String },
    /// 后端内部故障（仿真线程退出、无线电异常等）
    #[error("Device backend error on {address}: {reason}")]
    Backend { address: String, reason: String },
}

impl DeviceError {
    /// 连接建立阶段的错误（可重试）
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            DeviceError::ConnectFailed { .. } | DeviceError::Timeout { .. }
        )
    }
}

/// 单台 Sphero 的设备接口
///
/// `wait_for_response` 为 `false` 时指令为单发（不等待设备应答），
/// 同步循环中的 roll 指令总是单发。
pub trait SpheroDevice: Send + Sync {
    /// 蓝牙地址
    fn address(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// 建立连接
    ///
    /// 单次尝试；重试策略由上层决定。
    fn connect(&self) -> Result<(), DeviceError>;

    /// 断开连接（已断开时为 no-op）
    fn disconnect(&self) -> Result<(), DeviceError>;

    /// 下发运动指令
    fn roll(&self, command: RollCommand) -> Result<(), DeviceError>;

    /// 设置主 LED 颜色
    fn set_indicator_color(&self, color: Rgb, wait_for_response: bool) -> Result<(), DeviceError>;

    /// 设置尾灯亮度（0-255），用于人工校准朝向
    fn set_tail_light(&self, brightness: u8, wait_for_response: bool) -> Result<(), DeviceError>;

    /// 开关姿态稳定
    ///
    /// 关闭后可以手动转动机器人而不被电机抵抗。
    fn set_stabilization(&self, enabled: bool, wait_for_response: bool)
    -> Result<(), DeviceError>;

    /// 配置碰撞检测
    fn configure_collision_detection(
        &self,
        config: CollisionDetectConfig,
        wait_for_response: bool,
    ) -> Result<(), DeviceError>;

    /// 开关电量通知
    fn set_power_notifications(&self, enabled: bool, wait_for_response: bool)
    -> Result<(), DeviceError>;

    /// 配置里程计数据流
    fn configure_data_stream(
        &self,
        config: DataStreamConfig,
        wait_for_response: bool,
    ) -> Result<(), DeviceError>;

    /// 订阅遥测
    ///
    /// 同一类型重复订阅时替换旧回调。回调在设备的通知线程中执行，
    /// 必须是非阻塞的。
    fn subscribe(
        &self,
        kind: TelemetryKind,
        callback: Arc<dyn TelemetryCallback>,
    ) -> Result<(), DeviceError>;

    /// 取消订阅（未订阅时为 no-op）
    fn unsubscribe(&self, kind: TelemetryKind) -> Result<(), DeviceError>;

    /// 开始推送已订阅的遥测
    fn start_streaming(&self) -> Result<(), DeviceError>;
}

impl<D: SpheroDevice + ?Sized> SpheroDevice for Arc<D> {
    fn address(&self) -> &str {
        (**self).address()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn connect(&self) -> Result<(), DeviceError> {
        (**self).connect()
    }

    fn disconnect(&self) -> Result<(), DeviceError> {
        (**self).disconnect()
    }

    fn roll(&self, command: RollCommand) -> Result<(), DeviceError> {
        (**self).roll(command)
    }

    fn set_indicator_color(&self, color: Rgb, wait_for_response: bool) -> Result<(), DeviceError> {
        (**self).set_indicator_color(color, wait_for_response)
    }

    fn set_tail_light(&self, brightness: u8, wait_for_response: bool) -> Result<(), DeviceError> {
        (**self).set_tail_light(brightness, wait_for_response)
    }

    fn set_stabilization(
        &self,
        enabled: bool,
        wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        (**self).set_stabilization(enabled, wait_for_response)
    }

    fn configure_collision_detection(
        &self,
        config: CollisionDetectConfig,
        wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        (**self).configure_collision_detection(config, wait_for_response)
    }

    fn set_power_notifications(
        &self,
        enabled: bool,
        wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        (**self).set_power_notifications(enabled, wait_for_response)
    }

    fn configure_data_stream(
        &self,
        config: DataStreamConfig,
        wait_for_response: bool,
    ) -> Result<(), DeviceError> {
        (**self).configure_data_stream(config, wait_for_response)
    }

    fn subscribe(
        &self,
        kind: TelemetryKind,
        callback: Arc<dyn TelemetryCallback>,
    ) -> Result<(), DeviceError> {
        (**self).subscribe(kind, callback)
    }

    fn unsubscribe(&self, kind: TelemetryKind) -> Result<(), DeviceError> {
        (**self).unsubscribe(kind)
    }

    fn start_streaming(&self) -> Result<(), DeviceError> {
        (**self).start_streaming()
    }
}
