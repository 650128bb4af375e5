use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 限流窗口：15 分钟
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// 简单的滑动窗口限流器（基于内存，按 key 计数）。
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, Vec<Instant>>>,
    sweep_threshold: usize,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
            sweep_threshold: 1024,
        }
    }

    /// 检查并记录一次访问；超限返回 false（超限的请求不计数）。
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let entry = buckets.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        let allowed = entry.len() < self.limit;
        if allowed {
            entry.push(now);
        }
        self.sweep(&mut buckets, now);
        allowed
    }

    /// 检查是否超限（不记录）
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let buckets = self.buckets.lock().await;
        match buckets.get(key) {
            Some(entry) => {
                entry
                    .iter()
                    .filter(|t| now.duration_since(**t) < self.window)
                    .count()
                    < self.limit
            }
            None => true,
        }
    }

    /// 记录一次访问（不检查限制），用于只统计失败请求的场景
    pub async fn record(&self, key: &str) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let entry = buckets.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        entry.push(now);
        self.sweep(&mut buckets, now);
    }

    /// bucket 过多时全量清理过期记录
    fn sweep(&self, buckets: &mut HashMap<String, Vec<Instant>>, now: Instant) {
        if buckets.len() > self.sweep_threshold {
            buckets.retain(|_, times| {
                times.retain(|t| now.duration_since(*t) < self.window);
                !times.is_empty()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allow_stops_at_limit_per_key() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("1.1.1.1").await);
        assert!(limiter.allow("1.1.1.1").await);
        assert!(!limiter.allow("1.1.1.1").await);
        assert!(limiter.allow("2.2.2.2").await);
    }

    #[tokio::test]
    async fn check_does_not_consume() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("k").await);
        assert!(limiter.check("k").await);
        limiter.record("k").await;
        assert!(!limiter.check("k").await);
    }

    #[tokio::test]
    async fn window_expiry_frees_slots() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.allow("k").await);
        assert!(!limiter.allow("k").await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.allow("k").await);
    }
}
