//! 仿真指令解析与运动换算
//!
//! 指令文件在仿真运行期间只追加，每行更新一个机器人的目标速度或目标航向：
//!
//! ```text
//! sphero_target_speeds[0] = 50
//! sphero_target_headings[0] = 30
//! ```

use crate::constants::{
    KEY_TARGET_HEADING, KEY_TARGET_SPEED, SPEED_BYTE_MAX, SPEED_PERCENT_MAX,
};
use crate::statement::parse_statement;
use crate::units::{Deg, wrap_degrees};
use crate::{ProtocolError, Result};

/// 指令更新的目标字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetField {
    /// 目标速度（0-100 百分比）
    Speed,
    /// 目标航向（度，相对仿真基准方向）
    Heading,
}

/// 单条指令更新
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandUpdate {
    /// 机器人编队下标
    pub robot: usize,
    /// 更新字段
    pub field: TargetField,
    /// 新值
    pub value: f64,
}

impl CommandUpdate {
    /// 解析一行指令
    ///
    /// 空行/注释返回 `Ok(None)`；未知键返回 `ProtocolError::UnknownKey`。
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let Some(stmt) = parse_statement(line)? else {
            return Ok(None);
        };

        let field = match stmt.key.as_str() {
            KEY_TARGET_SPEED => TargetField::Speed,
            KEY_TARGET_HEADING => TargetField::Heading,
            other => {
                return Err(ProtocolError::UnknownKey {
                    key: other.to_string(),
                });
            },
        };

        let robot = stmt.require_index()?;
        let value = stmt.value.as_scalar(&stmt.key)?;

        Ok(Some(Self {
            robot,
            field,
            value,
        }))
    }
}

/// 某个机器人当前的目标速度与航向
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollTarget {
    /// 目标速度（0-100 百分比）
    pub speed_percent: f64,
    /// 目标航向（相对仿真基准方向）
    pub heading: Deg,
}

impl RollTarget {
    /// 应用一条指令更新
    pub fn apply(&mut self, update: &CommandUpdate) {
        match update.field {
            TargetField::Speed => self.speed_percent = update.value,
            TargetField::Heading => self.heading = Deg(update.value),
        }
    }

    /// 设备原生速度字节
    pub fn speed_byte(&self) -> u8 {
        speed_percent_to_byte(self.speed_percent)
    }

    /// 结合机器人内部航向基准得到设备绝对航向
    pub fn device_heading(&self, internal_heading: Deg) -> u16 {
        absolute_heading(internal_heading, self.heading)
    }
}

/// 速度百分比 → 设备速度字节（0-255）
///
/// 超出 0-100 的输入被截断。
pub fn speed_percent_to_byte(percent: f64) -> u8 {
    let clamped = percent.clamp(0.0, SPEED_PERCENT_MAX);
    (clamped * f64::from(SPEED_BYTE_MAX) / SPEED_PERCENT_MAX).round() as u8
}

/// 内部航向基准 + 仿真目标航向 → 设备绝对航向（0-359 整数度）
pub fn absolute_heading(internal_heading: Deg, target: Deg) -> u16 {
    wrap_degrees((internal_heading.0 + target.0).round()) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_speed_and_heading() {
        let update = CommandUpdate::parse("sphero_target_speeds[1] = 50").unwrap().unwrap();
        assert_eq!(
            update,
            CommandUpdate {
                robot: 1,
                field: TargetField::Speed,
                value: 50.0
            }
        );

        let update = CommandUpdate::parse("sphero_target_headings[0] = -45.5")
            .unwrap()
            .unwrap();
        assert_eq!(update.field, TargetField::Heading);
        assert_eq!(update.value, -45.5);
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            CommandUpdate::parse("scale = 2"),
            Err(ProtocolError::UnknownKey { .. })
        ));
        // 必须带下标
        assert!(CommandUpdate::parse("sphero_target_speeds = 50").is_err());
        // 必须是标量
        assert!(CommandUpdate::parse("sphero_target_speeds[0] = [1, 2]").is_err());
        assert_eq!(CommandUpdate::parse("# nothing").unwrap(), None);
    }

    #[test]
    fn test_scenario_speed_and_heading_conversion() {
        // 速度 50%，航向 30°，内部基准 10° → 航向 40°，速度字节 128
        let mut target = RollTarget::default();
        target.apply(&CommandUpdate::parse("sphero_target_speeds[0] = 50").unwrap().unwrap());
        target.apply(&CommandUpdate::parse("sphero_target_headings[0] = 30").unwrap().unwrap());

        assert_eq!(target.speed_byte(), 128);
        assert_eq!(target.device_heading(Deg(10.0)), 40);
    }

    #[test]
    fn test_speed_byte_bounds() {
        assert_eq!(speed_percent_to_byte(0.0), 0);
        assert_eq!(speed_percent_to_byte(100.0), 255);
        assert_eq!(speed_percent_to_byte(20.0), 51);
        assert_eq!(speed_percent_to_byte(-5.0), 0);
        assert_eq!(speed_percent_to_byte(250.0), 255);
    }

    #[test]
    fn test_absolute_heading_wraps() {
        assert_eq!(absolute_heading(Deg(350.0), Deg(20.0)), 10);
        assert_eq!(absolute_heading(Deg(0.0), Deg(-90.0)), 270);
        assert_eq!(absolute_heading(Deg(180.0), Deg(180.0)), 0);
        assert_eq!(absolute_heading(Deg(0.0), Deg(359.6)), 0);
    }

    proptest! {
        /// 设备航向总在 0-359
        #[test]
        fn device_heading_range(internal in 0.0..360.0f64, target in -10_000.0..10_000.0f64) {
            let heading = absolute_heading(Deg(internal), Deg(target));
            prop_assert!(heading < 360);
        }
    }
}
