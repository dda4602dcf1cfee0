//! 配置文件定位与加载

use anyhow::{Context, Result};
use sphero_bridge::BridgeConfig;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 配置来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// 从文件加载
    File(PathBuf),
    /// 默认路径下没有文件，使用内置默认值
    Builtin,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Builtin => write!(f, "(内置默认配置)"),
        }
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    BridgeConfig::default_path().context("无法确定配置目录")
}

/// 加载配置
///
/// 显式指定的路径必须存在；默认路径不存在时退回内置默认值（一个仿真机器人）。
pub fn load_config(explicit: Option<&Path>) -> Result<(BridgeConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = BridgeConfig::load(path)?;
        return Ok((config, ConfigSource::File(path.to_path_buf())));
    }

    let path = default_config_path()?;
    if path.exists() {
        let config = BridgeConfig::load(&path)?;
        return Ok((config, ConfigSource::File(path)));
    }

    warn!(
        "No config file at {}, using built-in defaults (run `sphero-cli config init` to create one)",
        path.display()
    );
    Ok((BridgeConfig::default(), ConfigSource::Builtin))
}
