//! 设备后端装配

use sphero_device::{SimConfig, SimSphero, SpheroDevice};
use sphero_driver::Fleet;
use sphero_tools::RobotEntry;
use std::sync::Arc;

/// 按配置的机器人列表创建仿真编队
///
/// 列表顺序即编队下标；每个机器人使用同一组仿真参数。
pub fn simulated_fleet(robots: &[RobotEntry], sim: SimConfig) -> Fleet {
    Fleet::from_devices(robots.iter().map(|entry| {
        let device: Arc<dyn SpheroDevice> =
            Arc::new(SimSphero::with_config(entry.address.clone(), sim.clone()));
        (entry.name.clone(), device)
    }))
}
