//! 一次分配任务的参数

use super::rubric::{PerformanceType, RubricCriterion};
use super::settings::AppSettings;
use crate::config::Config;
use std::time::Duration;

/// 分配任务参数（细则、粒度、批次与节奏）
#[derive(Debug, Clone)]
pub struct DistributionJob {
    pub rubrics_p1: Vec<RubricCriterion>,
    pub rubrics_p2: Vec<RubricCriterion>,
    pub rounding_rule: u32,
    /// 每批学生数
    pub batch_size: usize,
    /// 第一次请求之后，每次请求前的等待时间
    pub request_delay: Duration,
    /// 单次 oracle 请求超时
    pub request_timeout: Duration,
    /// 每个批次最多尝试次数
    pub max_attempts: usize,
    pub fallback_class_name: String,
    pub fallback_lesson_name: String,
    /// 固定随机种子（测试用）；`None` 时使用系统熵
    pub seed: Option<u64>,
}

impl DistributionJob {
    pub fn new(settings: &AppSettings, config: &Config) -> Self {
        Self {
            rubrics_p1: settings.rubrics_p1.clone(),
            rubrics_p2: settings.rubrics_p2.clone(),
            rounding_rule: settings.rounding_rule,
            batch_size: config.batch_size,
            request_delay: config.request_delay(),
            request_timeout: config.request_timeout(),
            max_attempts: config.chunk_max_attempts,
            fallback_class_name: config.fallback_class_name.clone(),
            fallback_lesson_name: config.fallback_lesson_name.clone(),
            seed: None,
        }
    }

    pub fn rubrics(&self, perf: PerformanceType) -> &[RubricCriterion] {
        match perf {
            PerformanceType::P1 => &self.rubrics_p1,
            PerformanceType::P2 => &self.rubrics_p2,
        }
    }
}
