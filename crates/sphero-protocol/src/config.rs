//! 仿真配置文件解析
//!
//! NetLogo 按下 `setup` 时写出配置文件，例如：
//!
//! ```text
//! number_of_spheros_in_netlogo = 2
//! scale = 0.5
//! first_netlogo_pos[0][:] = [5, 5]
//! first_netlogo_pos[1][:] = [-3, 2]
//! ```

use crate::constants::{KEY_FLEET_SIZE, KEY_INITIAL_POSITION, KEY_SCALE};
use crate::statement::parse_statement;
use crate::{ProtocolError, Result};
use std::collections::BTreeMap;

/// 仿真配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulatorConfig {
    /// 仿真端声明的机器人数量
    pub fleet_size: usize,
    /// 缩放系数（仿真单位 / 机器人单位）
    pub scale: f64,
    /// 每个机器人的初始仿真坐标（按编队下标）
    pub initial_positions: BTreeMap<usize, [f64; 2]>,
}

impl SimulatorConfig {
    /// 解析整个配置文件
    ///
    /// 任意一行不在白名单内或格式错误都会使整个文件被拒绝；
    /// 同一下标重复出现时以最后一次为准。
    pub fn parse(text: &str) -> Result<Self> {
        let mut fleet_size = None;
        let mut scale = None;
        let mut initial_positions = BTreeMap::new();

        for line in text.lines() {
            let Some(stmt) = parse_statement(line)? else {
                continue;
            };

            match stmt.key.as_str() {
                KEY_FLEET_SIZE => {
                    stmt.require_no_index()?;
                    let value = stmt.value.as_scalar(KEY_FLEET_SIZE)?;
                    if value < 0.0 || value.fract() != 0.0 {
                        return Err(ProtocolError::invalid_value(
                            KEY_FLEET_SIZE,
                            format!("expected a non-negative integer, got {}", value),
                        ));
                    }
                    fleet_size = Some(value as usize);
                },
                KEY_SCALE => {
                    stmt.require_no_index()?;
                    let value = stmt.value.as_scalar(KEY_SCALE)?;
                    if value <= 0.0 {
                        return Err(ProtocolError::invalid_value(
                            KEY_SCALE,
                            format!("must be positive, got {}", value),
                        ));
                    }
                    scale = Some(value);
                },
                KEY_INITIAL_POSITION => {
                    let index = stmt.require_index()?;
                    let position = stmt.value.as_pair(KEY_INITIAL_POSITION)?;
                    initial_positions.insert(index, position);
                },
                other => {
                    return Err(ProtocolError::UnknownKey {
                        key: other.to_string(),
                    });
                },
            }
        }

        Ok(Self {
            fleet_size: fleet_size.ok_or(ProtocolError::MissingField(KEY_FLEET_SIZE))?,
            scale: scale.ok_or(ProtocolError::MissingField(KEY_SCALE))?,
            initial_positions,
        })
    }

    /// 获取某个机器人的初始仿真坐标
    pub fn initial_position(&self, index: usize) -> Option<[f64; 2]> {
        self.initial_positions.get(&index).copied()
    }
}
