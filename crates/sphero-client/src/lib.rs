//! # Sphero Client - 桥接会话层
//!
//! 把一组 Sphero 机器人与 NetLogo 仿真通过文件同步起来：
//!
//! - **坐标系注册**：操作员确认的内部航向基准 + 锚点 + 仿真初始位置 → 仿射变换
//! - **步进同步**：增量读取指令、并行下发 roll、原子覆盖写报告
//! - **会话状态机**：Type State 保证阶段顺序，不可能跳过朝向校准或注册
//! - **运行生命周期**：蓝牙异常整体重启，人工中断干净退出
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use sphero_client::{InterruptFlag, RunLifecycle, ScriptedOperator};
//!
//! let mut lifecycle = RunLifecycle::new(fleet, config, ScriptedOperator::accept_all(), InterruptFlag::new());
//! let summary = lifecycle.run()?;
//! println!("ticks: {}", summary.metrics.ticks);
//! ```

pub mod artifacts;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod operator;
pub mod orientation;
pub mod registration;
pub mod session;
pub mod sync;
pub mod watcher;

pub use artifacts::{ArtifactPaths, CommandBatch, CommandReader, ReportWriter};
pub use error::{BridgeError, Result};
pub use frame::FrameTransform;
pub use lifecycle::{RunLifecycle, RunOutcome, RunSummary};
pub use operator::{Operator, ScriptedOperator};
pub use orientation::{Adjustment, HeadingCalibrator};
pub use registration::{check_config, register_frames};
pub use session::{ConnectionCheck, Phase, Session, SessionState, TeardownGuard, teardown};
pub use sync::{StepSynchronizer, StopReason, TickOutcome};
pub use watcher::{InterruptFlag, PollWatcher};
