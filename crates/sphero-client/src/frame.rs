//! 坐标系配准
//!
//! 机器人本地坐标（里程计，cm）与仿真坐标之间的仿射变换：
//!
//! ```text
//! sim   = offset + R(h) / scale · local
//! local = scale · R(-h) · (sim - offset)
//! ```
//!
//! 其中 `h` 为机器人的内部航向基准，`R` 为标准逆时针旋转矩阵，
//! `offset = sim0 - R(h) / scale · local0` 由锚点与仿真初始位置确定。

use crate::error::{BridgeError, Result};
use nalgebra::{Matrix2, Rotation2, Vector2};
use sphero_protocol::{Deg, KEY_SCALE, ProtocolError};

/// 单个机器人的坐标变换（注册后在整个运行期间不变）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    heading: Deg,
    scale: f64,
    forward: Matrix2<f64>,
    inverse: Matrix2<f64>,
    offset: Vector2<f64>,
}

impl FrameTransform {
    /// 由航向基准、缩放系数、锚点和仿真初始位置计算
    ///
    /// # 错误
    ///
    /// `scale` 不是正的有限数时返回 `ProtocolError::InvalidValue`。
    pub fn register(
        internal_heading: Deg,
        scale: f64,
        anchor_local: [f64; 2],
        initial_sim: [f64; 2],
    ) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(BridgeError::Protocol(ProtocolError::InvalidValue {
                key: KEY_SCALE.to_string(),
                reason: format!("must be positive, got {}", scale),
            }));
        }

        let radians = internal_heading.to_radians();
        let forward = Rotation2::new(radians).into_inner() / scale;
        let inverse = Rotation2::new(-radians).into_inner() * scale;
        let offset = Vector2::from(initial_sim) - forward * Vector2::from(anchor_local);

        Ok(Self {
            heading: internal_heading,
            scale,
            forward,
            inverse,
            offset,
        })
    }

    /// 本地坐标 → 仿真坐标
    pub fn to_sim(&self, local: [f64; 2]) -> [f64; 2] {
        let sim = self.offset + self.forward * Vector2::from(local);
        [sim.x, sim.y]
    }

    /// 仿真坐标 → 本地坐标
    pub fn to_local(&self, sim: [f64; 2]) -> [f64; 2] {
        let local = self.inverse * (Vector2::from(sim) - self.offset);
        [local.x, local.y]
    }

    pub fn offset(&self) -> [f64; 2] {
        [self.offset.x, self.offset.y]
    }

    pub fn heading(&self) -> Deg {
        self.heading
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}
