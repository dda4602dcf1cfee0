//! # Sphero Tools - 共享配置结构
//!
//! **依赖原则**: 只依赖 `sphero-protocol`，避免依赖 `sphero-client`
//!
//! ## 包含模块
//!
//! - `config` - 桥接配置（TOML，纯数据结构 + 校验）

// ⚠️ 禁止引入 sphero-client
// use sphero_client::*;  // ❌ 禁止

pub mod config;

// 重新导出常用类型
pub use config::{
    ArtifactSettings, BridgeConfig, CollisionSettings, FleetSettings, MAX_REPORT_PRECISION,
    OrientationSettings, ReportSettings, RobotEntry, StreamingSettings, TimingSettings,
};
