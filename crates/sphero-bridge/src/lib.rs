//! Sphero Bridge - Sphero 编队与 NetLogo 仿真同步
//!
//! 仿真端通过文件与桥接端交换数据：配置文件（`setup` 时写出）、
//! 只追加的指令文件（`start` 之后）、以及每个周期被整体覆盖的报告文件。
//!
//! # 架构设计
//!
//! 分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 白名单行格式、配置/指令解析、报告渲染
//! - **设备层** (`device`): `SpheroDevice` trait、遥测类型、仿真后端
//! - **驱动层** (`driver`): 编队注册表、遥测接入、并行 roll
//! - **客户端层** (`client`): 坐标系注册、步进同步、会话状态机、运行生命周期
//! - **配置** (`tools`): TOML 桥接配置
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use sphero_bridge::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), BridgeError> {
//! let config = BridgeConfig::default();
//! let fleet = simulated_fleet(&config.fleet.robots, SimConfig::default());
//! let mut lifecycle = RunLifecycle::new(
//!     Arc::new(fleet),
//!     Arc::new(config),
//!     ScriptedOperator::accept_all(),
//!     InterruptFlag::new(),
//! );
//! let summary = lifecycle.run()?;
//! println!("{} ticks", summary.metrics.ticks);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod logging;
pub mod prelude;

// 各层模块
pub use sphero_client as client;
pub use sphero_device as device;
pub use sphero_driver as driver;
pub use sphero_protocol as protocol;
pub use sphero_tools as tools;

// --- 常用类型 ---

pub use backend::simulated_fleet;
pub use logging::init_tracing;

pub use sphero_client::{
    BridgeError, FrameTransform, InterruptFlag, Operator, Phase, RunLifecycle, RunOutcome,
    RunSummary, ScriptedOperator, Session, StepSynchronizer, StopReason,
};
pub use sphero_device::{DeviceError, SimConfig, SimSphero, SpheroDevice};
pub use sphero_driver::{DriverError, Fleet, FleetMetricsSnapshot};
pub use sphero_protocol::ProtocolError;
pub use sphero_tools::BridgeConfig;
