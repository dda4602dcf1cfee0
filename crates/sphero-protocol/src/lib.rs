//! # Sphero Protocol
//!
//! 机器人编队与 NetLogo 仿真之间的文件交换格式（无硬件依赖）
//!
//! ## 模块
//!
//! - `statement`: 白名单赋值语句的词法/语法解析
//! - `config`: 仿真配置文件（`config.txt`）解析
//! - `command`: 仿真指令文件（`commandsToRobots.txt`）解析与速度/航向换算
//! - `report`: 回写报告（`proceed.txt`）渲染
//! - `units`: 角度单位
//! - `constants`: 协议常量
//!
//! ## 安全性
//!
//! 仿真端写出的每一行都只按固定语法解析为类型化字段，未知键直接拒绝，
//! 不存在执行任意语句的路径。

pub mod command;
pub mod config;
pub mod constants;
pub mod report;
pub mod statement;
pub mod units;

// 重新导出常用类型
pub use command::{CommandUpdate, RollTarget, TargetField, absolute_heading, speed_percent_to_byte};
pub use config::SimulatorConfig;
pub use constants::*;
pub use report::{ProceedReport, round_to};
pub use statement::{Statement, Value, parse_statement};
pub use units::{Deg, wrap_degrees};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed statement '{line}': {reason}")]
    Malformed { line: String, reason: String },

    #[error("Unknown key '{key}'")]
    UnknownKey { key: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl ProtocolError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ProtocolError>;
