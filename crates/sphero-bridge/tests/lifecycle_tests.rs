//! 完整生命周期集成测试
//!
//! 仿真后端 + 脚本化的 NetLogo 对端线程，走完
//! 连接 → 朝向校准 → 数据流 → 配置 → 注册 → 稳态循环 → 停止。

use sphero_bridge::prelude::*;
use sphero_bridge::device::PowerState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

struct Rig {
    dir: tempfile::TempDir,
    sims: Vec<Arc<SimSphero>>,
    fleet: Arc<Fleet>,
    config: Arc<BridgeConfig>,
}

impl Rig {
    fn new(count: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BridgeConfig::default();
        config.artifacts.directory = dir.path().to_path_buf();
        config.timing.poll_interval_ms = 5;
        config.timing.connect_retry_ms = 5;
        config.streaming.sample_divisor = 8;
        config.fleet.robots = (0..count)
            .map(|i| RobotEntry::new(format!("68:86:E7:00:00:{:02X}", i + 1)))
            .collect();

        let sim = SimConfig {
            connect_failures: 2,
            ..SimConfig::default()
        };
        let sims: Vec<Arc<SimSphero>> = config
            .fleet
            .robots
            .iter()
            .map(|entry| Arc::new(SimSphero::with_config(entry.address.clone(), sim.clone())))
            .collect();
        let fleet = Fleet::from_devices(
            sims.iter().map(|s| (None, s.clone() as Arc<dyn SpheroDevice>)),
        );

        Self {
            dir,
            sims,
            fleet: Arc::new(fleet),
            config: Arc::new(config),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn lifecycle(&self, operator: ScriptedOperator, interrupt: InterruptFlag) -> RunLifecycle<ScriptedOperator> {
        RunLifecycle::new(self.fleet.clone(), self.config.clone(), operator, interrupt)
    }
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < WAIT, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(5));
    }
}

/// 报告行中的数值列表（跳过 NetLogo lambda）
fn number_lists(line: &str) -> Vec<Vec<f64>> {
    let mut lists = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in line.chars() {
        match ch {
            '[' => {
                depth += 1;
                if depth == 1 {
                    current.clear();
                    continue;
                }
            },
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let parsed: Result<Vec<f64>, _> =
                        current.split_whitespace().map(str::parse::<f64>).collect();
                    if let Ok(values) = parsed {
                        lists.push(values);
                    }
                    continue;
                }
            },
            _ => {},
        }
        if depth >= 1 {
            current.push(ch);
        }
    }
    lists
}

struct Report {
    xs: Vec<f64>,
    ys: Vec<f64>,
    headings: Vec<f64>,
    speeds: Vec<f64>,
}

fn read_report(path: &Path) -> Option<Report> {
    let text = std::fs::read_to_string(path).ok()?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "report must have three lines: {text:?}");
    let positions = number_lists(lines[0]);
    Some(Report {
        xs: positions[0].clone(),
        ys: positions[1].clone(),
        headings: number_lists(lines[1])[0].clone(),
        speeds: number_lists(lines[2])[0].clone(),
    })
}

const TWO_ROBOT_CONFIG: &str = "number_of_spheros_in_netlogo = 2\n\
                                scale = 1\n\
                                first_netlogo_pos[0][:] = [5, 5]\n\
                                first_netlogo_pos[1][:] = [-3, 2]\n";

#[test]
fn test_full_run_with_netlogo_peer() {
    let rig = Rig::new(2);
    // 机器人 1 接受 0°；机器人 2 旋转 90° 后接受
    let operator = ScriptedOperator::new().with_adjustments(["", "90", ""]);
    let mut lifecycle = rig.lifecycle(operator, InterruptFlag::new());

    let sims = rig.sims.clone();
    let config_path = rig.path("config.txt");
    let command_path = rig.path("commandsToRobots.txt");
    let report_path = rig.path("proceed.txt");

    let peer = thread::spawn(move || {
        // setup：数据流开启后写配置
        wait_until("streaming", || sims.iter().all(|s| s.is_streaming()));
        std::fs::write(&config_path, TWO_ROBOT_CONFIG).unwrap();

        // start：写入指令
        thread::sleep(Duration::from_millis(200));
        std::fs::write(
            &command_path,
            "sphero_target_speeds[0] = 50\nsphero_target_headings[0] = 90\n",
        )
        .unwrap();

        // 等机器人 1 在仿真坐标系里向 +x 走出一段
        let mut last = None;
        wait_until("robot 1 to move", || {
            last = read_report(&report_path);
            last.as_ref().is_some_and(|r| r.xs[0] > 6.0)
        });
        let report = last.unwrap();

        std::fs::remove_file(&command_path).unwrap();
        report
    });

    let summary = lifecycle.run().unwrap();
    let report = peer.join().unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::CommandArtifactRemoved));
    assert!(!summary.interrupted);
    assert_eq!(summary.restarts, 0);
    assert!(summary.metrics.ticks > 0);
    assert!(summary.metrics.odometry_samples > 0);
    assert_eq!(summary.metrics.rolls_issued, summary.metrics.ticks * 2);

    // 机器人 1：从 (5, 5) 沿 +x 前进，航向 90，速度约 50 cm/s
    assert!((report.ys[0] - 5.0).abs() < 0.5);
    assert!((report.headings[0] - 90.0).abs() < 1.0);
    assert!((report.speeds[0] - 50.2).abs() < 1.0);
    // 机器人 2：停在 (-3, 2)
    assert!((report.xs[1] + 3.0).abs() < 0.01);
    assert!((report.ys[1] - 2.0).abs() < 0.01);
    assert_eq!(report.speeds[1], 0.0);

    for sim in &rig.sims {
        assert!(!sim.is_connected());
        assert_eq!(sim.speed(), 0.0);
    }
}

#[test]
fn test_config_removed_is_forced_stop() {
    let rig = Rig::new(1);
    let mut lifecycle = rig.lifecycle(ScriptedOperator::accept_all(), InterruptFlag::new());

    let sims = rig.sims.clone();
    let config_path = rig.path("config.txt");
    let command_path = rig.path("commandsToRobots.txt");
    let report_path = rig.path("proceed.txt");

    let peer = thread::spawn(move || {
        wait_until("streaming", || sims[0].is_streaming());
        // 先写一个数量不匹配的配置，再重新 setup
        std::fs::write(&config_path, TWO_ROBOT_CONFIG).unwrap();
        thread::sleep(Duration::from_millis(50));
        std::fs::write(
            &config_path,
            "number_of_spheros_in_netlogo = 1\nscale = 0.5\nfirst_netlogo_pos[0][:] = [0, 0]\n",
        )
        .unwrap();

        thread::sleep(Duration::from_millis(200));
        std::fs::write(&command_path, "sphero_target_speeds[0] = 0\n").unwrap();
        wait_until("first report", || report_path.exists());

        // 准备阶段之外的碰撞会被上报
        sims[0].inject_collision(5.0);
        sims[0].inject_power(PowerState::Low);
        std::fs::remove_file(&config_path).unwrap();
    });

    let summary = lifecycle.run().unwrap();
    peer.join().unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::ConfigArtifactRemoved));
    assert_eq!(summary.metrics.collisions_reported, 1);
    assert_eq!(summary.metrics.low_power_warnings, 1);
    // 强制停止时指令文件仍在
    assert!(rig.path("commandsToRobots.txt").exists());
}

#[test]
fn test_collision_during_setup_is_ignored() {
    let rig = Rig::new(1);
    let interrupt = InterruptFlag::new();
    let mut lifecycle = rig.lifecycle(ScriptedOperator::accept_all(), interrupt.clone());

    let sims = rig.sims.clone();
    let peer = thread::spawn(move || {
        wait_until("streaming", || sims[0].is_streaming());
        assert!(sims[0].inject_collision(5.0));
        interrupt.trigger();
    });

    let summary = lifecycle.run().unwrap();
    peer.join().unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.metrics.collisions_reported, 0);
    assert_eq!(summary.metrics.collisions_ignored, 1);
    assert!(!rig.sims[0].is_connected());
}

#[test]
fn test_restart_keeps_fleet() {
    let rig = Rig::new(1);
    let interrupt = InterruptFlag::new();
    let operator = ScriptedOperator::new().with_connections([false]);
    let mut lifecycle = rig.lifecycle(operator, interrupt.clone());

    let sims = rig.sims.clone();
    let peer = thread::spawn(move || {
        wait_until("streaming", || sims[0].is_streaming());
        interrupt.trigger();
    });

    let summary = lifecycle.run().unwrap();
    peer.join().unwrap();

    assert_eq!(summary.restarts, 1);
    assert!(summary.interrupted);
    assert_eq!(lifecycle.fleet().len(), 1);
    // 第一轮前两次失败，重启后直接连上
    assert_eq!(rig.sims[0].connect_attempts(), 4);
}
