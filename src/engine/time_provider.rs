// ==========================================
// 智能传送带分拣系统 - 时钟抽象
// ==========================================
// 用途: 巡检判定与活动刷新统一从这里取当前时间
// 测试: ManualTimeProvider 手动推进，无需真实等待超时窗口
// ==========================================

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// 当前时间来源
pub trait TimeProvider: Send + Sync + 'static {
    fn utc_now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Clone, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟（测试用，clone 后共享同一时间）
#[derive(Clone, Debug)]
pub struct ManualTimeProvider {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTimeProvider {
    pub fn new_at(start_time: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start_time)),
        }
    }

    /// 向前推进
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += duration;
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = time;
        }
    }
}

impl Default for ManualTimeProvider {
    fn default() -> Self {
        Self::new_at(Utc::now())
    }
}

impl TimeProvider for ManualTimeProvider {
    fn utc_now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_provider_advances() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let clock = ManualTimeProvider::new_at(start);
        assert_eq!(clock.utc_now(), start);

        clock.advance(Duration::seconds(16));
        assert_eq!(clock.utc_now(), start + Duration::seconds(16));

        // clone 共享同一时钟
        let shared = clock.clone();
        shared.advance(Duration::seconds(4));
        assert_eq!(clock.utc_now(), start + Duration::seconds(20));
    }
}
