//! # 桥接配置
//!
//! 编队成员、文件位置、轮询节奏与设备参数，TOML 格式：
//!
//! ```toml
//! [[fleet.robots]]
//! name = "RRO"
//! address = "68:86:E7:0A:03:F4"
//!
//! [artifacts]
//! directory = "/path/to/netlogo/model"
//!
//! [timing]
//! poll_interval_ms = 50
//! ```
//!
//! 未出现的字段取默认值，默认值与 NetLogo 模型约定的文件名和参数一致。

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use sphero_protocol::DEFAULT_REPORT_PRECISION;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 报告精度上限（小数位）
pub const MAX_REPORT_PRECISION: u32 = 6;

/// 桥接配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub fleet: FleetSettings,
    pub artifacts: ArtifactSettings,
    pub timing: TimingSettings,
    pub orientation: OrientationSettings,
    pub streaming: StreamingSettings,
    pub collision: CollisionSettings,
    pub report: ReportSettings,
}

impl BridgeConfig {
    /// 默认配置文件路径
    ///
    /// - Linux: `~/.config/sphero-bridge/bridge.toml`
    /// - macOS: `~/Library/Application Support/sphero-bridge/bridge.toml`
    /// - Windows: `%APPDATA%\sphero-bridge\bridge.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sphero-bridge").join("bridge.toml"))
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse bridge config")?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize bridge config")
    }

    /// 保存到文件（自动创建父目录）
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.fleet.robots.is_empty(), "fleet.robots must not be empty");

        let mut seen = HashSet::new();
        for robot in &self.fleet.robots {
            ensure!(!robot.address.trim().is_empty(), "robot address must not be empty");
            if !seen.insert(robot.address.to_ascii_uppercase()) {
                bail!("duplicate robot address {}", robot.address);
            }
        }

        ensure!(self.timing.poll_interval_ms > 0, "timing.poll_interval_ms must be positive");
        ensure!(
            (0.0..=100.0).contains(&self.orientation.test_roll_speed_percent),
            "orientation.test_roll_speed_percent must be within 0-100, got {}",
            self.orientation.test_roll_speed_percent
        );
        ensure!(
            self.orientation.test_roll_threshold_deg >= 0.0,
            "orientation.test_roll_threshold_deg must not be negative"
        );
        ensure!(self.streaming.sample_divisor > 0, "streaming.sample_divisor must be positive");
        ensure!(
            self.report.precision <= MAX_REPORT_PRECISION,
            "report.precision must be at most {}, got {}",
            MAX_REPORT_PRECISION,
            self.report.precision
        );

        for (name, file) in [
            ("config_file", &self.artifacts.config_file),
            ("command_file", &self.artifacts.command_file),
            ("report_file", &self.artifacts.report_file),
        ] {
            ensure!(!file.trim().is_empty(), "artifacts.{} must not be empty", name);
        }

        Ok(())
    }
}

/// 编队成员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSettings {
    /// 顺序即编队下标，必须与 NetLogo 中的顺序一致
    pub robots: Vec<RobotEntry>,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            robots: vec![RobotEntry::new("sim-0")],
        }
    }
}

/// 单个机器人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotEntry {
    /// 显示名（如机身颜色编码 "RRO"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 蓝牙地址
    pub address: String,
}

impl RobotEntry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    pub fn named(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

/// 与 NetLogo 交换的文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// 文件所在目录（通常是 NetLogo 模型目录）
    pub directory: PathBuf,
    pub config_file: String,
    pub command_file: String,
    pub report_file: String,
}

impl ArtifactSettings {
    pub fn config_path(&self) -> PathBuf {
        self.directory.join(&self.config_file)
    }

    pub fn command_path(&self) -> PathBuf {
        self.directory.join(&self.command_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.directory.join(&self.report_file)
    }
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            config_file: "config.txt".to_string(),
            command_file: "commandsToRobots.txt".to_string(),
            report_file: "proceed.txt".to_string(),
        }
    }
}

/// 轮询与等待
///
/// 各 `*_deadline_ms` 缺省表示无限等待。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_sample_deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_deadline_ms: Option<u64>,
    /// 两次连接尝试之间的间隔
    pub connect_retry_ms: u64,
}

impl TimingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn config_deadline(&self) -> Option<Duration> {
        self.config_deadline_ms.map(Duration::from_millis)
    }

    pub fn first_sample_deadline(&self) -> Option<Duration> {
        self.first_sample_deadline_ms.map(Duration::from_millis)
    }

    pub fn command_deadline(&self) -> Option<Duration> {
        self.command_deadline_ms.map(Duration::from_millis)
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            config_deadline_ms: None,
            first_sample_deadline_ms: None,
            command_deadline_ms: None,
            connect_retry_ms: 500,
        }
    }
}

/// 朝向校准
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationSettings {
    /// 试跑速度（最大速度百分比）
    pub test_roll_speed_percent: f64,
    /// 调整量绝对值不超过此值时试跑（度）
    pub test_roll_threshold_deg: f64,
    pub test_roll_duration_ms: u64,
}

impl OrientationSettings {
    pub fn test_roll_duration(&self) -> Duration {
        Duration::from_millis(self.test_roll_duration_ms)
    }
}

impl Default for OrientationSettings {
    fn default() -> Self {
        Self {
            test_roll_speed_percent: 20.0,
            test_roll_threshold_deg: 1.0,
            test_roll_duration_ms: 1000,
        }
    }
}

/// 里程计数据流
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// 采样分频，推荐 20-50
    pub sample_divisor: u16,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self { sample_divisor: 40 }
    }
}

/// 碰撞检测阈值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionSettings {
    pub method: u8,
    pub x_threshold: u8,
    pub x_speed: u8,
    pub y_threshold: u8,
    pub y_speed: u8,
    /// 静默时间（10ms 为单位）
    pub dead_time: u8,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            method: 1,
            x_threshold: 45,
            x_speed: 110,
            y_threshold: 45,
            y_speed: 110,
            dead_time: 100,
        }
    }
}

/// 回写报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// 小数位数
    pub precision: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            precision: DEFAULT_REPORT_PRECISION,
        }
    }
}
