//! 错误类型体系
//!
//! 分层错误处理，区分致命错误、可恢复错误和人工中断。
//!
//! | 场景 | 处理 |
//! |---|---|
//! | 设备尚未连上 | `Connecting` 阶段内部无限重试，不产生错误 |
//! | 操作员报告蓝牙异常 | `RunOutcome::Restart`，不是错误 |
//! | 仿真配置不匹配 | [`BridgeError::is_recoverable`]，等待重新 setup |
//! | 文件读取竞争 | 同步循环正常停止（`StopReason`） |
//! | 其它 | 致命：记录、尽力停车断开、终止 |
//! | Ctrl-C | [`BridgeError::Interrupted`]，干净退出 |

use sphero_device::DeviceError;
use sphero_driver::DriverError;
use sphero_protocol::ProtocolError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 桥接层错误类型
#[derive(Debug, Error)]
pub enum BridgeError {
    // ==================== Fatal Errors ====================
    /// 驱动层错误（roll 失败等）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 设备错误（连接后的设置指令失败）
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// 文件读写失败
    #[error("Artifact I/O error on {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 等待超时
    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// 操作员输入失败（终端关闭等）
    #[error("Operator input failed: {0}")]
    Operator(String),

    // ==================== Recoverable Errors ====================
    /// 仿真文件格式错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 仿真端机器人数量与本地编队不一致
    #[error("Simulator declares {declared} robots, local fleet has {local}")]
    FleetSizeMismatch { declared: usize, local: usize },

    /// 仿真配置缺少某个机器人的初始位置
    #[error("Simulator config has no initial position for robot {robot}")]
    MissingInitialPosition { robot: usize },

    // ==================== Interrupt ====================
    /// 人工中断（Ctrl-C）
    #[error("Interrupted by operator")]
    Interrupted,
}

impl BridgeError {
    /// 是否为致命错误
    ///
    /// 致命错误会终止整个运行（先尽力停车、断开）。
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable() && !self.is_interrupt()
    }

    /// 是否可恢复
    ///
    /// 可恢复错误只出现在读取仿真配置时：提示重新 setup，不需要重连。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::FleetSizeMismatch { .. } | Self::MissingInitialPosition { .. }
        )
    }

    /// 是否为人工中断
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// 创建文件读写错误
    pub fn artifact(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.into(),
            source,
        }
    }

    /// 创建超时错误
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            waited,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let mismatch = BridgeError::FleetSizeMismatch {
            declared: 3,
            local: 2,
        };
        assert!(mismatch.is_recoverable());
        assert!(!mismatch.is_fatal());

        let protocol = BridgeError::from(ProtocolError::MissingField("scale"));
        assert!(protocol.is_recoverable());

        let interrupted = BridgeError::Interrupted;
        assert!(interrupted.is_interrupt());
        assert!(!interrupted.is_fatal());
        assert!(!interrupted.is_recoverable());

        let timeout = BridgeError::timeout("config file", Duration::from_secs(1));
        assert!(timeout.is_fatal());

        let io = BridgeError::artifact(
            "proceed.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(io.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::FleetSizeMismatch {
            declared: 3,
            local: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 robots"));
        assert!(msg.contains("has 2"));

        let err = BridgeError::artifact(
            "/tmp/proceed.txt",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(err.to_string().contains("/tmp/proceed.txt"));
    }
}
