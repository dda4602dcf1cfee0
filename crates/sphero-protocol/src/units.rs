//! 角度单位
//!
//! 机器人内部航向、仿真航向、指令航向全部以"度"为单位流转，
//! 使用 NewType 防止与弧度混用。

use crate::constants::FULL_TURN_DEG;
use std::fmt;
use std::ops::{Add, Sub};

/// 角度（NewType）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Deg(pub f64);

impl Deg {
    /// 零角度常量
    pub const ZERO: Self = Deg(0.0);

    /// 创建新的角度值
    #[inline]
    pub const fn new(value: f64) -> Self {
        Deg(value)
    }

    /// 获取原始值
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// 转换为弧度
    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// 归一化到 [0, 360) 范围
    pub fn wrap(self) -> Self {
        Deg(wrap_degrees(self.0))
    }
}

/// 归一化到 [0, 360)
///
/// `rem_euclid` 对极小的负数可能因舍入返回 360.0，这里折回 0。
pub fn wrap_degrees(value: f64) -> f64 {
    let wrapped = value.rem_euclid(FULL_TURN_DEG);
    if wrapped >= FULL_TURN_DEG { 0.0 } else { wrapped }
}

impl Add for Deg {
    type Output = Deg;

    fn add(self, rhs: Deg) -> Deg {
        Deg(self.0 + rhs.0)
    }
}

impl Sub for Deg {
    type Output = Deg;

    fn sub(self, rhs: Deg) -> Deg {
        Deg(self.0 - rhs.0)
    }
}

impl fmt::Display for Deg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_basic() {
        assert_eq!(Deg(370.0).wrap(), Deg(10.0));
        assert_eq!(Deg(-10.0).wrap(), Deg(350.0));
        assert_eq!(Deg(360.0).wrap(), Deg(0.0));
        assert_eq!(Deg(0.0).wrap(), Deg(0.0));
    }

    #[test]
    fn test_wrap_tiny_negative() {
        // 舍入边界：不能返回 360
        let wrapped = wrap_degrees(-1e-20);
        assert!((0.0..360.0).contains(&wrapped));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Deg(10.0) + Deg(30.0), Deg(40.0));
        assert_eq!(Deg(10.0) - Deg(30.0), Deg(-20.0));
        assert_eq!(format!("{}", Deg(90.0)), "90°");
    }

    proptest! {
        /// 归一化结果总在 [0, 360)
        #[test]
        fn wrap_range(deg in -1.0e7..1.0e7f64) {
            let w = wrap_degrees(deg);
            prop_assert!((0.0..360.0).contains(&w));
        }

        /// 归一化幂等
        #[test]
        fn wrap_idempotent(deg in -3600.0..3600.0f64) {
            let once = Deg(deg).wrap();
            prop_assert_eq!(once, once.wrap());
        }
    }
}
