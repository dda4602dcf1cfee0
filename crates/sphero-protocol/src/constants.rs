//! 协议常量定义

/// 速度字节上限（设备原生 0-255）
pub const SPEED_BYTE_MAX: u8 = 255;

/// 速度百分比上限（仿真端 0-100）
pub const SPEED_PERCENT_MAX: f64 = 100.0;

/// 一整圈（度）
pub const FULL_TURN_DEG: f64 = 360.0;

/// 速度换算：设备上报 mm/s，仿真使用 cm/s
pub const MM_PER_CM: f64 = 10.0;

/// 报告默认小数位数
pub const DEFAULT_REPORT_PRECISION: u32 = 2;

// === 配置文件白名单键 ===

/// 仿真端机器人数量
pub const KEY_FLEET_SIZE: &str = "number_of_spheros_in_netlogo";
/// 仿真单位 / 机器人单位
pub const KEY_SCALE: &str = "scale";
/// 每个机器人的初始仿真坐标
pub const KEY_INITIAL_POSITION: &str = "first_netlogo_pos";

// === 指令文件白名单键 ===

/// 目标速度（百分比）
pub const KEY_TARGET_SPEED: &str = "sphero_target_speeds";
/// 目标航向（度，相对仿真基准方向）
pub const KEY_TARGET_HEADING: &str = "sphero_target_headings";
