//! 驱动层模块
//!
//! 本模块管理一组 Sphero 机器人，包括：
//! - 编队注册表（按编队下标索引）
//! - 每个机器人的共享状态（ArcSwap 无锁读取，锚点一次性锁存）
//! - 遥测接入（里程计、电量、碰撞）
//! - 并行 roll 下发（每个机器人一个线程，全部 join 后返回）
//! - 运行指标
//!
//! # 使用场景
//!
//! 大多数用户应该使用 `sphero-client` 提供的会话与同步循环，
//! 本层只在需要直接操作编队时使用。

mod error;
pub mod fleet;
pub mod ingest;
pub mod metrics;
pub mod state;

pub use error::DriverError;
pub use fleet::{Fleet, Robot};
pub use ingest::{RobotTelemetry, SteadyStateProbe};
pub use metrics::{FleetMetrics, FleetMetricsSnapshot};
pub use state::{MotionState, RobotContext};

/// 驱动层 Result 类型别名
pub type Result<T> = std::result::Result<T, DriverError>;
