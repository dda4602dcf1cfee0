//! 单个机器人的共享状态
//!
//! 遥测回调线程写入、同步循环读取。运动状态整体替换（`ArcSwap`），
//! 读到的可能是旧值，但不会是半更新的值。

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use sphero_device::OdometrySample;
use sphero_protocol::{Deg, MM_PER_CM, wrap_degrees};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// 最近一次测得的运动状态（机器人本地坐标系）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    /// 里程计位置（cm）
    pub position: [f64; 2],
    /// 设备航向（度，[0, 360)）
    pub heading: Deg,
    /// 速度（cm/s）
    pub speed: f64,
}

impl MotionState {
    /// 由里程计采样计算
    ///
    /// 航向为 `atan2(vx, vy)`（0 指向 +y，顺时针），速度由 mm/s 换算为 cm/s。
    pub fn from_sample(sample: &OdometrySample) -> Self {
        let heading = sample.velocity_x.atan2(sample.velocity_y).to_degrees();
        Self {
            position: [sample.odom_x, sample.odom_y],
            heading: Deg(wrap_degrees(heading)),
            speed: sample.velocity_x.hypot(sample.velocity_y) / MM_PER_CM,
        }
    }
}

/// 单个机器人的共享上下文
#[derive(Debug)]
pub struct RobotContext {
    motion: ArcSwap<MotionState>,
    internal_heading: ArcSwap<Deg>,
    anchor_armed: AtomicBool,
    anchor: Mutex<Option<[f64; 2]>>,
    samples: AtomicU64,
}

impl RobotContext {
    pub fn new() -> Self {
        Self {
            motion: ArcSwap::from_pointee(MotionState::default()),
            internal_heading: ArcSwap::from_pointee(Deg::ZERO),
            anchor_armed: AtomicBool::new(false),
            anchor: Mutex::new(None),
            samples: AtomicU64::new(0),
        }
    }

    /// 最近一次运动状态
    pub fn motion(&self) -> MotionState {
        **self.motion.load()
    }

    /// 记录一次里程计采样
    ///
    /// 锚点已就绪（[`arm_anchor`](Self::arm_anchor)）且尚未锁存时，
    /// 本次位置成为锚点。返回本次是否锁存了锚点。
    pub fn record_sample(&self, sample: &OdometrySample) -> bool {
        let state = MotionState::from_sample(sample);
        self.motion.store(Arc::new(state));
        self.samples.fetch_add(1, Ordering::Relaxed);

        if !self.anchor_armed.load(Ordering::Acquire) {
            return false;
        }
        let mut anchor = self.anchor.lock();
        if anchor.is_some() {
            return false;
        }
        *anchor = Some(state.position);
        true
    }

    /// 收到的采样数
    pub fn sample_count(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// 内部航向基准（设备航向 = 基准 + 仿真航向）
    pub fn internal_heading(&self) -> Deg {
        **self.internal_heading.load()
    }

    pub fn set_internal_heading(&self, heading: Deg) {
        self.internal_heading.store(Arc::new(heading.wrap()));
    }

    /// 允许下一次采样锁存锚点
    pub fn arm_anchor(&self) {
        self.anchor_armed.store(true, Ordering::Release);
    }

    pub fn is_anchor_armed(&self) -> bool {
        self.anchor_armed.load(Ordering::Acquire)
    }

    /// 锚点（注册完成后的第一次采样位置）
    pub fn anchor(&self) -> Option<[f64; 2]> {
        *self.anchor.lock()
    }

    /// 清空运行时状态（整体重启时使用）
    pub fn reset(&self) {
        self.anchor_armed.store(false, Ordering::Release);
        *self.anchor.lock() = None;
        self.internal_heading.store(Arc::new(Deg::ZERO));
        self.motion.store(Arc::new(MotionState::default()));
        self.samples.store(0, Ordering::Relaxed);
    }
}

impl Default for RobotContext {
    fn default() -> Self {
        Self::new()
    }
}
