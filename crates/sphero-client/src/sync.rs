//! 步进同步
//!
//! 稳态循环的一个周期：
//!
//! 1. 读取指令文件中游标之后的新行；配置文件消失则停止
//! 2. 逐行更新各机器人的目标速度/航向
//! 3. 并行下发 roll，等待全部完成
//! 4. 把遥测换算到仿真坐标系
//! 5. 原子覆盖写报告，提交游标

use crate::artifacts::{ArtifactPaths, CommandBatch, CommandReader, ReportWriter};
use crate::error::Result;
use crate::frame::FrameTransform;
use crate::watcher::PollWatcher;
use sphero_device::RollCommand;
use sphero_driver::Fleet;
use sphero_protocol::{CommandUpdate, Deg, ProceedReport, RollTarget, round_to};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace, warn};

/// 稳态循环停止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 指令文件消失（仿真正常结束）
    CommandArtifactRemoved,
    /// 配置文件消失（仿真强制停止）
    ConfigArtifactRemoved,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::CommandArtifactRemoved => write!(f, "command file removed"),
            StopReason::ConfigArtifactRemoved => write!(f, "config file removed"),
        }
    }
}

/// 单个周期的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 周期完成，`new_lines` 为本周期消费的新行数
    Continued { new_lines: usize },
    Stopped(StopReason),
}

/// 步进同步器
pub struct StepSynchronizer {
    fleet: Arc<Fleet>,
    transforms: Vec<FrameTransform>,
    paths: ArtifactPaths,
    reader: CommandReader,
    writer: ReportWriter,
    targets: Vec<RollTarget>,
    precision: u32,
}

impl StepSynchronizer {
    /// `transforms` 按编队下标一一对应
    pub fn new(
        fleet: Arc<Fleet>,
        transforms: Vec<FrameTransform>,
        paths: ArtifactPaths,
        precision: u32,
    ) -> Self {
        let targets = vec![RollTarget::default(); fleet.len()];
        Self {
            reader: CommandReader::new(paths.command.clone()),
            writer: ReportWriter::new(paths.report.clone(), precision),
            fleet,
            transforms,
            paths,
            targets,
            precision,
        }
    }

    pub fn targets(&self) -> &[RollTarget] {
        &self.targets
    }

    /// 已消费的指令行数
    pub fn cursor(&self) -> usize {
        self.reader.consumed()
    }

    /// 执行一个周期
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let Some(batch) = self.reader.read_new()? else {
            return Ok(TickOutcome::Stopped(StopReason::CommandArtifactRemoved));
        };
        if !self.paths.config_exists() {
            return Ok(TickOutcome::Stopped(StopReason::ConfigArtifactRemoved));
        }

        self.apply(&batch);

        let commands: Vec<RollCommand> = self
            .fleet
            .iter()
            .zip(&self.targets)
            .map(|(robot, target)| {
                RollCommand::new(
                    target.speed_byte(),
                    target.device_heading(robot.context().internal_heading()),
                )
            })
            .collect();
        self.fleet.roll_all(&commands)?;

        let report = self.measure();
        self.writer.write(&report)?;
        self.reader.commit(&batch);
        self.fleet.metrics().ticks.fetch_add(1, Ordering::Relaxed);

        trace!("Tick done: {} new lines, cursor {}", batch.len(), self.reader.consumed());
        Ok(TickOutcome::Continued {
            new_lines: batch.len(),
        })
    }

    /// 指令文件存在期间循环执行周期
    ///
    /// 某个周期没有新行时空闲一个轮询间隔。
    pub fn run(&mut self, watcher: &PollWatcher) -> Result<StopReason> {
        info!("Entering steady-state loop ({} robots)", self.fleet.len());
        loop {
            watcher.interrupt().check()?;
            match self.tick()? {
                TickOutcome::Continued { new_lines: 0 } => watcher.pause()?,
                TickOutcome::Continued { new_lines } => {
                    debug!("Applied {} command lines", new_lines);
                },
                TickOutcome::Stopped(reason) => {
                    info!("Steady-state loop stopped: {}", reason);
                    return Ok(reason);
                },
            }
        }
    }

    fn apply(&mut self, batch: &CommandBatch) {
        let fleet_len = self.targets.len();
        for (offset, line) in batch.lines.iter().enumerate() {
            let line_no = batch.start + offset + 1;
            match CommandUpdate::parse(line) {
                Ok(Some(update)) => match self.targets.get_mut(update.robot) {
                    Some(target) => target.apply(&update),
                    None => reject(
                        &self.fleet,
                        line_no,
                        &format!("robot index {} outside fleet of {}", update.robot, fleet_len),
                    ),
                },
                Ok(None) => {},
                Err(e) => reject(&self.fleet, line_no, &e.to_string()),
            }
        }
    }

    fn measure(&self) -> ProceedReport {
        let mut report = ProceedReport::with_capacity(self.fleet.len());
        for (robot, transform) in self.fleet.iter().zip(&self.transforms) {
            let motion = robot.context().motion();
            let relative = (motion.heading - robot.context().internal_heading()).wrap();
            let heading = Deg(round_to(relative.value(), self.precision)).wrap();
            report.push(transform.to_sim(motion.position), heading.value(), motion.speed);
        }
        report
    }
}

fn reject(fleet: &Fleet, line_no: usize, reason: &str) {
    fleet.metrics().rejected_lines.fetch_add(1, Ordering::Relaxed);
    warn!("Rejected command line {}: {}", line_no, reason);
}

impl std::fmt::Debug for StepSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSynchronizer")
            .field("robots", &self.fleet.len())
            .field("cursor", &self.reader.consumed())
            .field("targets", &self.targets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::InterruptFlag;
    use sphero_device::{MockSphero, OdometrySample, SpheroDevice, TelemetryEvent};
    use sphero_tools::ArtifactSettings;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        mocks: Vec<Arc<MockSphero>>,
        sync: StepSynchronizer,
    }

    fn harness(headings: &[f64]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let settings = ArtifactSettings {
            directory: dir.path().to_path_buf(),
            ..ArtifactSettings::default()
        };
        let paths = ArtifactPaths::from_settings(&settings);

        let mocks: Vec<Arc<MockSphero>> = (0..headings.len())
            .map(|i| Arc::new(MockSphero::new(format!("mock-{}", i))))
            .collect();
        let fleet = Arc::new(Fleet::from_devices(
            mocks.iter().map(|m| (None, m.clone() as Arc<dyn SpheroDevice>)),
        ));
        let mut transforms = Vec::new();
        for (robot, heading) in fleet.iter().zip(headings) {
            robot.device().connect().unwrap();
            robot.context().set_internal_heading(Deg(*heading));
            transforms.push(
                FrameTransform::register(Deg(*heading), 1.0, [0.0, 0.0], [0.0, 0.0]).unwrap(),
            );
        }
        fleet.attach_telemetry(Arc::new(|| true)).unwrap();

        std::fs::write(&paths.config, "number_of_spheros_in_netlogo = 1\nscale = 1\n").unwrap();
        std::fs::write(&paths.command, "").unwrap();

        Harness {
            dir,
            mocks,
            sync: StepSynchronizer::new(fleet, transforms, paths, 2),
        }
    }

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn command_path(h: &Harness) -> std::path::PathBuf {
        h.dir.path().join("commandsToRobots.txt")
    }

    fn report(h: &Harness) -> String {
        std::fs::read_to_string(h.dir.path().join("proceed.txt")).unwrap()
    }

    #[test]
    fn test_speed_and_heading_scenario() {
        // 速度 50、航向 30、内部基准 10° → 设备航向 40°、速度字节 128
        let mut h = harness(&[10.0]);
        append(
            &command_path(&h),
            "sphero_target_speeds[0] = 50\nsphero_target_headings[0] = 30\n",
        );

        assert_eq!(h.sync.tick().unwrap(), TickOutcome::Continued { new_lines: 2 });
        let rolls = h.mocks[0].rolls();
        assert_eq!(rolls.len(), 1);
        assert_eq!(rolls[0].speed, 128);
        assert_eq!(rolls[0].heading, 40);
        assert_eq!(h.sync.cursor(), 2);
    }

    #[test]
    fn test_zero_new_lines_reissues_same_targets() {
        let mut h = harness(&[0.0]);
        append(&command_path(&h), "sphero_target_speeds[0] = 100\n");
        h.sync.tick().unwrap();

        assert_eq!(h.sync.tick().unwrap(), TickOutcome::Continued { new_lines: 0 });
        assert_eq!(h.sync.cursor(), 1);

        let rolls = h.mocks[0].rolls();
        assert_eq!(rolls.len(), 2);
        assert_eq!(rolls[0], rolls[1]);
        assert_eq!(rolls[1].speed, 255);
    }

    #[test]
    fn test_report_uses_sim_frame_and_relative_heading() {
        let mut h = harness(&[90.0]);
        h.mocks[0].emit(TelemetryEvent::Odometry(OdometrySample {
            odom_x: 2.0,
            odom_y: 0.0,
            velocity_x: 0.0,
            velocity_y: 125.0,
        }));

        h.sync.tick().unwrap();
        let text = report(&h);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        // R(90°)·(2, 0) = (0, 2)
        assert!(lines[0].starts_with("(foreach (sort spheros) [0] [2] "));
        // 航向 0° 相对基准 90° → 270°
        assert!(lines[1].starts_with("(foreach (sort spheros) [270] "));
        assert!(lines[2].starts_with("(foreach (sort spheros) [12.5] "));
    }

    #[test]
    fn test_rejected_lines_are_consumed() {
        let mut h = harness(&[0.0, 0.0]);
        append(
            &command_path(&h),
            "scale = 3\nsphero_target_speeds[5] = 10\nsphero_target_speeds[1] = 20\n",
        );

        assert_eq!(h.sync.tick().unwrap(), TickOutcome::Continued { new_lines: 3 });
        assert_eq!(h.sync.cursor(), 3);
        assert_eq!(h.sync.targets()[1].speed_percent, 20.0);
        assert_eq!(h.sync.targets()[0].speed_percent, 0.0);
        assert_eq!(h.sync.fleet.metrics().snapshot().rejected_lines, 2);
    }

    #[test]
    fn test_lines_never_executed_twice() {
        let mut h = harness(&[0.0]);
        append(&command_path(&h), "sphero_target_speeds[0] = 40\n");
        h.sync.tick().unwrap();

        // 仿真端改写目标后又追加：只有新行生效
        append(&command_path(&h), "sphero_target_headings[0] = 90\n");
        h.sync.tick().unwrap();
        h.sync.targets[0].speed_percent = 0.0;
        h.sync.tick().unwrap();
        assert_eq!(h.sync.targets()[0].speed_percent, 0.0);
        assert_eq!(h.sync.targets()[0].heading, Deg(90.0));
        assert_eq!(h.sync.cursor(), 2);
    }

    #[test]
    fn test_stop_on_missing_artifacts() {
        let mut h = harness(&[0.0]);
        std::fs::remove_file(h.dir.path().join("config.txt")).unwrap();
        append(&command_path(&h), "sphero_target_speeds[0] = 40\n");
        assert_eq!(
            h.sync.tick().unwrap(),
            TickOutcome::Stopped(StopReason::ConfigArtifactRemoved)
        );
        // 强制停止时不提交游标，也不下发指令
        assert_eq!(h.sync.cursor(), 0);
        assert!(h.mocks[0].rolls().is_empty());

        std::fs::remove_file(command_path(&h)).unwrap();
        assert_eq!(
            h.sync.tick().unwrap(),
            TickOutcome::Stopped(StopReason::CommandArtifactRemoved)
        );
    }

    #[test]
    fn test_roll_failure_is_fatal() {
        let mut h = harness(&[0.0]);
        h.mocks[0].fail_rolls(true);
        let err = h.sync.tick().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(h.sync.cursor(), 0);
    }

    #[test]
    fn test_run_until_command_removed() {
        let mut h = harness(&[0.0]);
        let command = command_path(&h);
        let remover = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(40));
            std::fs::remove_file(command).unwrap();
        });

        let watcher = PollWatcher::new(Duration::from_millis(5), InterruptFlag::new());
        let reason = h.sync.run(&watcher).unwrap();
        remover.join().unwrap();

        assert_eq!(reason, StopReason::CommandArtifactRemoved);
        assert!(h.sync.fleet.metrics().snapshot().ticks > 0);
    }
}
