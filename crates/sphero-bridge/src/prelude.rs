//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use sphero_bridge::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{
    ConnectionCheck, InterruptFlag, Operator, Phase, RunLifecycle, RunOutcome, RunSummary,
    ScriptedOperator, Session, StopReason,
};

// 设备层
pub use crate::device::{SimConfig, SimSphero, SpheroDevice};

// 驱动层
pub use crate::driver::{Fleet, Robot};

// 配置
pub use crate::tools::{BridgeConfig, RobotEntry};

// 后端与日志
pub use crate::backend::simulated_fleet;
pub use crate::logging::init_tracing;

// 错误类型
pub use crate::client::BridgeError;
pub use crate::device::DeviceError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
