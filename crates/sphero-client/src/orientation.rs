//! 朝向校准
//!
//! 操作员借助尾灯把每个机器人对准仿真基准方向：反复输入相对调整量
//! （正数为顺时针），调整量累加后对 360 取模；直接回车接受当前朝向。

use sphero_protocol::Deg;

/// 一次操作员输入的解释结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adjustment {
    /// 接受当前朝向
    Accept,
    /// 相对旋转（度）
    Rotate(i32),
    /// 无法识别，需要重新输入
    Invalid(String),
}

impl Adjustment {
    /// 解析输入：空白 → 接受，整数 → 旋转，其它 → 无效
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Adjustment::Accept;
        }
        match trimmed.parse::<i32>() {
            Ok(delta) => Adjustment::Rotate(delta),
            Err(_) => Adjustment::Invalid(trimmed.to_string()),
        }
    }
}

/// 单个机器人的累计朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadingCalibrator {
    absolute: u16,
}

impl HeadingCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一次调整，返回新的设备绝对航向（0-359）
    pub fn rotate(&mut self, delta: i32) -> u16 {
        let next = (i64::from(self.absolute) + i64::from(delta)).rem_euclid(360);
        self.absolute = next as u16;
        self.absolute
    }

    /// 当前绝对航向
    pub fn absolute(&self) -> u16 {
        self.absolute
    }

    /// 作为内部航向基准
    pub fn heading(&self) -> Deg {
        Deg(f64::from(self.absolute))
    }
}

/// 小幅调整（含 0）时试跑，让操作员确认朝向
pub fn wants_test_roll(delta: i32, threshold_deg: f64) -> bool {
    f64::from(delta.unsigned_abs()) <= threshold_deg
}
