//! 分数修正引擎 - 业务能力层
//!
//! 把 oracle 给出的（不可信的）细则得分修正为满足硬约束的分布：
//!
//! 1. 合计严格等于目标分
//! 2. 每条细则得分在 `[0, 满分]` 之间
//! 3. 尽量保持为取整粒度的倍数，尽量贴近原始提议
//!
//! 纯函数，无副作用；随机源由调用方注入，固定种子即可得到确定结果。

use crate::models::distribution::{RepairOutcome, RepairStatus};
use crate::models::rubric::{max_score_of, RubricCriterion, ScoreEntry};
use fastrand::Rng;
use std::collections::HashSet;

/// 收敛阶段的最大迭代次数
pub const MAX_REPAIR_ITERATIONS: usize = 100;

#[derive(Debug)]
struct Slot {
    criterion_id: String,
    score: i64,
    max: i64,
}

/// 修正一组细则得分
///
/// # 参数
/// - `proposed`: oracle 提议的得分
/// - `rubrics`: 该表现类型的细则集合
/// - `target_total`: 目标合计；`None` 或非正数表示不分配
/// - `rounding_rule`: 取整粒度
/// - `rng`: 随机源（在候选细则中均匀选择）
///
/// 得分在整数域内修正：非整数满分向下取整，非整数目标分收敛到最接近的整数，
/// 并以 [`RepairStatus::FractionalTarget`] 标记。
pub fn repair(
    proposed: &[ScoreEntry],
    rubrics: &[RubricCriterion],
    target_total: Option<f64>,
    rounding_rule: u32,
    rng: &mut Rng,
) -> RepairOutcome {
    let (target, fractional) = match target_total {
        Some(t) if t.is_finite() && t.round() > 0.0 => (t.round() as i64, t.fract() != 0.0),
        _ => return pass_through(proposed),
    };
    if proposed.is_empty() {
        return pass_through(proposed);
    }

    let rule = i64::from(rounding_rule.max(1));
    let mut slots = normalize(&complete(proposed, rubrics), rubrics, rule);

    let mut diff = target - sum_of(&slots);
    let mut saturated = false;
    let mut iterations = 0;

    while diff != 0 && iterations < MAX_REPAIR_ITERATIONS {
        iterations += 1;

        // 差值小于粒度时允许一条细则打破倍数约束，以保证合计精确
        let step = if diff.abs() < rule { diff.abs() } else { rule };

        let candidates: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                if diff > 0 {
                    s.score.checked_add(step).is_some_and(|v| v <= s.max)
                } else {
                    s.score - step >= 0
                }
            })
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            saturated = true;
            break;
        }

        let picked = candidates[rng.usize(..candidates.len())];
        if diff > 0 {
            slots[picked].score += step;
        } else {
            slots[picked].score -= step;
        }

        diff = target - sum_of(&slots);
    }

    let achieved = sum_of(&slots);
    let status = if diff == 0 && fractional {
        RepairStatus::FractionalTarget { achieved }
    } else if diff == 0 {
        RepairStatus::Exact
    } else if saturated {
        RepairStatus::Unreachable { target, achieved }
    } else {
        RepairStatus::BudgetExhausted { target, achieved }
    };

    RepairOutcome {
        scores: slots
            .into_iter()
            .map(|s| ScoreEntry::new(s.criterion_id, s.score as f64))
            .collect(),
        status,
    }
}

fn pass_through(proposed: &[ScoreEntry]) -> RepairOutcome {
    RepairOutcome {
        scores: proposed.to_vec(),
        status: RepairStatus::NotRequested,
    }
}

/// 去掉重复细则（保留第一条），补齐遗漏的细则（得分 0）
fn complete(proposed: &[ScoreEntry], rubrics: &[RubricCriterion]) -> Vec<ScoreEntry> {
    let mut seen = HashSet::new();
    let mut entries: Vec<ScoreEntry> = proposed
        .iter()
        .filter(|e| seen.insert(e.criterion_id.as_str()))
        .cloned()
        .collect();

    for rubric in rubrics {
        if !seen.contains(rubric.id.as_str()) {
            entries.push(ScoreEntry::new(rubric.id.clone(), 0.0));
        }
    }
    entries
}

/// 第一遍：按粒度四舍五入，再夹到 `[0, 满分]`
fn normalize(entries: &[ScoreEntry], rubrics: &[RubricCriterion], rule: i64) -> Vec<Slot> {
    entries
        .iter()
        .map(|entry| {
            let max = max_score_of(rubrics, &entry.criterion_id).floor().max(0.0) as i64;
            let raw = if entry.score.is_finite() { entry.score } else { 0.0 };
            // 先收进 [-rule, max + rule]：结果与直接取整后夹取相同，但不会溢出
            let raw = raw.clamp(-(rule as f64), max as f64 + rule as f64);
            let rounded = round_half_up(raw / rule as f64).saturating_mul(rule);
            Slot {
                criterion_id: entry.criterion_id.clone(),
                score: rounded.clamp(0, max),
                max,
            }
        })
        .collect()
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn sum_of(slots: &[Slot]) -> i64 {
    slots.iter().fold(0, |acc, s| acc.saturating_add(s.score))
}
