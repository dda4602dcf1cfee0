//! 轮询等待
//!
//! 仿真端通过文件的出现/消失发信号，桥接端以固定间隔轮询。
//! 每次等待都可以设置截止时间（缺省无限等待），并且随时响应人工中断。

use crate::error::{BridgeError, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// 人工中断标志（Ctrl-C 处理器置位，控制线程轮询）
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// 已置位时返回 `BridgeError::Interrupted`
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(BridgeError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// 轮询器
#[derive(Debug, Clone)]
pub struct PollWatcher {
    interval: Duration,
    deadline: Option<Duration>,
    interrupt: InterruptFlag,
}

impl PollWatcher {
    pub fn new(interval: Duration, interrupt: InterruptFlag) -> Self {
        Self {
            interval,
            deadline: None,
            interrupt,
        }
    }

    /// 设置截止时间（`None` 为无限等待）
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// 轮询直到 `check` 返回 `Some`
    ///
    /// # 错误
    ///
    /// - `check` 返回的错误原样传播
    /// - `BridgeError::Interrupted`: 等待期间收到中断
    /// - `BridgeError::Timeout`: 超过截止时间
    pub fn wait_for<T, F>(&self, what: &str, mut check: F) -> Result<T>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        let start = Instant::now();
        loop {
            self.interrupt.check()?;
            if let Some(value) = check()? {
                return Ok(value);
            }

            let waited = start.elapsed();
            if let Some(deadline) = self.deadline
                && waited >= deadline
            {
                return Err(BridgeError::timeout(what, waited));
            }
            trace!("Waiting for {} ({:?})", what, waited);
            std::thread::sleep(self.interval);
        }
    }

    /// 轮询直到条件成立
    pub fn wait_until<F>(&self, what: &str, mut condition: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        self.wait_for(what, || Ok(condition().then_some(())))
    }

    /// 等待文件出现
    pub fn wait_for_file(&self, path: &Path) -> Result<()> {
        let what = format!("{}", path.display());
        self.wait_until(&what, || path.exists())
    }

    /// 可中断的睡眠
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let end = Instant::now() + duration;
        loop {
            self.interrupt.check()?;
            let now = Instant::now();
            if now >= end {
                return Ok(());
            }
            std::thread::sleep(self.interval.min(end - now));
        }
    }

    /// 空闲一个轮询间隔
    pub fn pause(&self) -> Result<()> {
        self.sleep(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn watcher() -> PollWatcher {
        PollWatcher::new(Duration::from_millis(5), InterruptFlag::new())
    }

    #[test]
    fn test_wait_for_value() {
        let calls = Cell::new(0);
        let value = watcher()
            .wait_for("counter", || {
                calls.set(calls.get() + 1);
                Ok((calls.get() >= 3).then_some(calls.get()))
            })
            .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_deadline_surfaces_timeout() {
        let watcher = watcher().with_deadline(Some(Duration::from_millis(30)));
        let err = watcher.wait_until("nothing", || false).unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { ref what, .. } if what == "nothing"));
    }

    #[test]
    fn test_interrupt_stops_wait() {
        let interrupt = InterruptFlag::new();
        let watcher = PollWatcher::new(Duration::from_millis(5), interrupt.clone());

        let trigger = interrupt.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });

        let err = watcher.wait_until("forever", || false).unwrap_err();
        assert!(err.is_interrupt());
        handle.join().unwrap();

        assert!(watcher.sleep(Duration::from_secs(10)).unwrap_err().is_interrupt());
    }

    #[test]
    fn test_check_error_propagates() {
        let err = watcher()
            .wait_for::<(), _>("failing", || Err(BridgeError::Operator("closed".to_string())))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Operator(_)));
    }

    #[test]
    fn test_wait_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        let target = path.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            std::fs::write(target, "scale = 1\n").unwrap();
        });

        watcher()
            .with_deadline(Some(Duration::from_secs(5)))
            .wait_for_file(&path)
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_duration() {
        let start = Instant::now();
        watcher().sleep(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
