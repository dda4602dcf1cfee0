//! 下发到设备的指令参数

/// roll 指令的运动状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RollState {
    /// 制动
    Stop = 0,
    /// 正常行驶
    #[default]
    Normal = 1,
    /// 快速转向
    Fast = 2,
}

/// 运动指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollCommand {
    /// 速度字节（0-255）
    pub speed: u8,
    /// 设备绝对航向（0-359 度）
    pub heading: u16,
    pub state: RollState,
    /// 是否等待设备应答
    pub wait_for_response: bool,
}

impl RollCommand {
    /// 单发行驶指令
    pub fn new(speed: u8, heading: u16) -> Self {
        Self {
            speed,
            heading,
            state: RollState::Normal,
            wait_for_response: false,
        }
    }

    /// 停车指令：速度 0、航向 0
    pub fn stop() -> Self {
        Self::new(0, 0)
    }

    /// 指定是否等待应答
    pub fn with_response(mut self, wait_for_response: bool) -> Self {
        self.wait_for_response = wait_for_response;
        self
    }

    pub fn is_stop(&self) -> bool {
        self.speed == 0
    }
}

/// LED 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// 碰撞检测参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionDetectConfig {
    /// 检测算法编号（0 为关闭）
    pub method: u8,
    pub x_threshold: u8,
    pub x_speed: u8,
    pub y_threshold: u8,
    pub y_speed: u8,
    /// 两次上报之间的静默时间（10ms 为单位）
    pub dead_time: u8,
}

impl Default for CollisionDetectConfig {
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

/// 里程计数据流参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataStreamConfig {
    /// 采样分频（相对设备 400Hz 基准）
    pub sample_divisor: u16,
    pub frames_per_packet: u8,
    /// 包数量，0 表示持续推送
    pub packet_count: u8,
}

impl DataStreamConfig {
    /// 设备内部采样基准频率
    pub const BASE_RATE_HZ: f64 = 400.0;

    pub fn with_divisor(sample_divisor: u16) -> Self {
        Self {
            sample_divisor,
            ..Self::default()
        }
    }

    /// 实际推送频率
    pub fn rate_hz(&self) -> f64 {
        let frames = f64::from(self.frames_per_packet.max(1));
        Self::BASE_RATE_HZ / f64::from(self.sample_divisor.max(1)) / frames
    }
}

impl Default for DataStreamConfig {
    fn default() -> Self {
        Self {
            sample_divisor: 40,
            frames_per_packet: 1,
            packet_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_command_defaults() {
        let cmd = RollCommand::new(128, 40);
        assert_eq!(cmd.state, RollState::Normal);
        assert!(!cmd.wait_for_response);
        assert!(!cmd.is_stop());

        let stop = RollCommand::stop();
        assert_eq!((stop.speed, stop.heading), (0, 0));
        assert!(stop.is_stop());
        assert!(stop.with_response(true).wait_for_response);
    }

    #[test]
    fn test_stream_rate() {
        assert_eq!(DataStreamConfig::default().rate_hz(), 10.0);
        assert_eq!(DataStreamConfig::with_divisor(4).rate_hz(), 100.0);
        // 分频 0 视为 1
        assert_eq!(DataStreamConfig::with_divisor(0).rate_hz(), 400.0);
    }
}
