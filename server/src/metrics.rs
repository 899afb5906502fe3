// Metrics collection and tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tts_core::CacheStats;

/// Latency samples kept for percentiles
const MAX_SAMPLES: usize = 1000;

/// Per-endpoint metrics
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub total_latency_ms: Arc<AtomicU64>,
    pub max_latency_ms: Arc<AtomicU64>,
    pub latency_samples: Arc<Mutex<Vec<u64>>>,
}

impl EndpointMetrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record_request(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.latency_samples.lock() {
            samples.push(latency_ms);
            if samples.len() > MAX_SAMPLES {
                samples.remove(0);
            }
        }
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    fn percentile(&self, p: u8) -> u64 {
        let Ok(samples) = self.latency_samples.lock() else {
            return 0;
        };
        if samples.is_empty() {
            return 0;
        }
        let mut sorted = samples.clone();
        sorted.sort_unstable();
        let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
        sorted[index]
    }

    pub fn stats(&self) -> EndpointStats {
        EndpointStats {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms(),
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
            p99_latency_ms: self.percentile(99),
        }
    }
}

impl Default for EndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthesis-specific metrics
#[derive(Debug, Clone)]
pub struct SynthesisMetrics {
    pub synthesis_count: Arc<AtomicU64>,
    pub total_synthesis_time_ms: Arc<AtomicU64>,
    pub total_samples: Arc<AtomicU64>,
}

impl SynthesisMetrics {
    pub fn new() -> Self {
        Self {
            synthesis_count: Arc::new(AtomicU64::new(0)),
            total_synthesis_time_ms: Arc::new(AtomicU64::new(0)),
            total_samples: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_synthesis(&self, time_ms: u64, samples: usize) {
        self.synthesis_count.fetch_add(1, Ordering::Relaxed);
        self.total_synthesis_time_ms.fetch_add(time_ms, Ordering::Relaxed);
        self.total_samples.fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub fn avg_synthesis_time_ms(&self) -> f64 {
        let count = self.synthesis_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_synthesis_time_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }
}

impl Default for SynthesisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub tts: EndpointMetrics,
    pub synthesis: SynthesisMetrics,
    pub started_at: Instant,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            tts: EndpointMetrics::new(),
            synthesis: SynthesisMetrics::new(),
            started_at: Instant::now(),
        }
    }

    pub fn snapshot(&self, cache: CacheStats) -> MetricsResponse {
        let mut system = sysinfo::System::new();
        system.refresh_cpu();
        system.refresh_memory();

        let memory_used = system.used_memory();
        let memory_total = system.total_memory();
        let memory_usage_percent = if memory_total > 0 {
            (memory_used as f64 / memory_total as f64 * 100.0) as f32
        } else {
            0.0
        };

        let hit_total = cache.hits + cache.misses;
        MetricsResponse {
            timestamp: Utc::now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            system: SystemMetrics {
                cpu_usage_percent: system.global_cpu_info().cpu_usage(),
                memory_used_mb: memory_used / 1024 / 1024,
                memory_total_mb: memory_total / 1024 / 1024,
                memory_usage_percent,
            },
            tts: self.tts.stats(),
            synthesis: SynthesisStats {
                synthesis_count: self.synthesis.synthesis_count.load(Ordering::Relaxed),
                avg_synthesis_time_ms: self.synthesis.avg_synthesis_time_ms(),
                total_samples: self.synthesis.total_samples.load(Ordering::Relaxed),
            },
            model_cache: CacheMetrics {
                loads: cache.loads,
                hits: cache.hits,
                misses: cache.misses,
                hit_rate: if hit_total == 0 {
                    0.0
                } else {
                    cache.hits as f64 / hit_total as f64 * 100.0
                },
            },
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub system: SystemMetrics,
    pub tts: EndpointStats,
    pub synthesis: SynthesisStats,
    pub model_cache: CacheMetrics,
}

#[derive(Serialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
}

#[derive(Serialize)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
}

#[derive(Serialize)]
pub struct SynthesisStats {
    pub synthesis_count: u64,
    pub avg_synthesis_time_ms: f64,
    pub total_samples: u64,
}

#[derive(Serialize)]
pub struct CacheMetrics {
    pub loads: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
