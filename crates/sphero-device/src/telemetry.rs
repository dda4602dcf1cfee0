//! 遥测事件与回调注册表
//!
//! 设备在自己的通知线程中推送三类遥测：电量、碰撞、里程计。
//! 上层按类型注册回调，每个类型最多一个回调。
//!
//! # 性能要求
//!
//! 回调在通知线程中同步执行，必须快速返回（只做原子写入或计数），
//! 否则会拖慢该设备后续遥测的投递。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 电量通知中的"电量低"状态码
pub const POWER_STATE_LOW: u8 = 3;

/// 遥测类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TelemetryKind {
    Power,
    Collision,
    Odometry,
}

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 3] = [
        TelemetryKind::Power,
        TelemetryKind::Collision,
        TelemetryKind::Odometry,
    ];
}

/// 电量状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerState {
    Charging,
    Ok,
    Low,
    Critical,
    Unknown(u8),
}

impl PowerState {
    /// 从设备状态码解析
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => PowerState::Charging,
            2 => PowerState::Ok,
            POWER_STATE_LOW => PowerState::Low,
            4 => PowerState::Critical,
            other => PowerState::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            PowerState::Charging => 1,
            PowerState::Ok => 2,
            PowerState::Low => POWER_STATE_LOW,
            PowerState::Critical => 4,
            PowerState::Unknown(code) => *code,
        }
    }

    /// 是否为"电量低"状态
    pub fn is_low(&self) -> bool {
        self.code() == POWER_STATE_LOW
    }
}

/// 碰撞事件
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionEvent {
    /// 碰撞时的速度（设备原始单位）
    pub speed: f64,
    /// 碰撞轴向分量
    pub x_magnitude: i16,
    pub y_magnitude: i16,
}

impl CollisionEvent {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            x_magnitude: 0,
            y_magnitude: 0,
        }
    }
}

/// 里程计采样
///
/// 设备坐标系：航向 0 指向 +y，顺时针为正。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OdometrySample {
    /// 里程计位置（cm）
    pub odom_x: f64,
    pub odom_y: f64,
    /// 速度分量（mm/s）
    pub velocity_x: f64,
    pub velocity_y: f64,
}

/// 遥测事件
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TelemetryEvent {
    Power(PowerState),
    Collision(CollisionEvent),
    Odometry(OdometrySample),
}

impl TelemetryEvent {
    pub fn kind(&self) -> TelemetryKind {
        match self {
            TelemetryEvent::Power(_) => TelemetryKind::Power,
            TelemetryEvent::Collision(_) => TelemetryKind::Collision,
            TelemetryEvent::Odometry(_) => TelemetryKind::Odometry,
        }
    }
}

/// 遥测回调
///
/// 闭包 `Fn(&TelemetryEvent)` 自动实现此 trait。
pub trait TelemetryCallback: Send + Sync {
    fn on_telemetry(&self, event: &TelemetryEvent);
}

impl<F> TelemetryCallback for F
where
    F: Fn(&TelemetryEvent) + Send + Sync,
{
    fn on_telemetry(&self, event: &TelemetryEvent) {
        self(event)
    }
}

/// 按遥测类型索引的回调注册表
///
/// 设备后端共享此实现：订阅/取消订阅在控制线程，分发在通知线程。
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: RwLock<HashMap<TelemetryKind, Arc<dyn TelemetryCallback>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册回调，返回是否替换了旧回调
    pub fn insert(&self, kind: TelemetryKind, callback: Arc<dyn TelemetryCallback>) -> bool {
        self.callbacks.write().insert(kind, callback).is_some()
    }

    /// 移除回调，返回是否存在
    pub fn remove(&self, kind: TelemetryKind) -> bool {
        self.callbacks.write().remove(&kind).is_some()
    }

    pub fn contains(&self, kind: TelemetryKind) -> bool {
        self.callbacks.read().contains_key(&kind)
    }

    /// 分发事件到对应类型的回调
    ///
    /// 回调在读锁释放后执行，回调内部可以安全地再次订阅/取消订阅。
    /// 返回是否有回调接收了该事件。
    pub fn dispatch(&self, event: &TelemetryEvent) -> bool {
        let callback = self.callbacks.read().get(&event.kind()).cloned();
        match callback {
            Some(callback) => {
                callback.on_telemetry(event);
                true
            },
            None => false,
        }
    }

    pub fn clear(&self) {
        self.callbacks.write().clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<TelemetryKind> = self.callbacks.read().keys().copied().collect();
        f.debug_struct("CallbackRegistry").field("kinds", &kinds).finish()
    }
}
