//! 驱动层错误类型定义

use sphero_device::DeviceError;
use sphero_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// 设备错误（附带编队下标）
    #[error("Robot {robot}: {source}")]
    Device {
        robot: usize,
        #[source]
        source: DeviceError,
    },

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 编队下标越界
    #[error("Robot index {index} out of range (fleet size: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// 指令批次与编队大小不一致
    #[error("Command batch has {actual} entries, fleet has {expected} robots")]
    BatchSize { expected: usize, actual: usize },

    /// 工作线程创建失败
    #[error("Failed to spawn worker for robot {robot}: {reason}")]
    Spawn { robot: usize, reason: String },

    /// 工作线程 panic
    #[error("Worker for robot {robot} panicked")]
    WorkerPanicked { robot: usize },
}

impl DriverError {
    pub(crate) fn device(robot: usize, source: DeviceError) -> Self {
        DriverError::Device { robot, source }
    }

    /// 出错的机器人下标（如果有）
    pub fn robot(&self) -> Option<usize> {
        match self {
            DriverError::Device { robot, .. }
            | DriverError::Spawn { robot, .. }
            | DriverError::WorkerPanicked { robot } => Some(*robot),
            DriverError::IndexOutOfRange { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use sphero_device::DeviceError;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::device(
            1,
            DeviceError::NotConnected {
                address: "sim-1".to_string(),
            },
        );
        assert_eq!(err.to_string(), "Robot 1: Device sim-1 is not connected");
        assert_eq!(err.robot(), Some(1));

        let err = DriverError::BatchSize {
            expected: 2,
            actual: 3,
        };
        assert!(err.to_string().contains("3 entries"));
        assert_eq!(err.robot(), None);
    }
}
