//! 请求记录统计
//!
//! 百分位采用线性插值：第 p 百分位位于排序后样本的 `p/100 * (n-1)` 处，
//! 在相邻两个顺序统计量之间插值

use super::model::RequestRecord;
use super::types::{QuantilePack, StatsResponse};

/// 计算样本的均值和 p50/p95/p99，样本为空时返回 None
pub fn quantile_pack<I>(values: I) -> Option<QuantilePack>
where
    I: IntoIterator<Item = f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    Some(QuantilePack {
        mean,
        p50: percentile(&sorted, 50.0),
        p95: percentile(&sorted, 95.0),
        p99: percentile(&sorted, 99.0),
    })
}

/// 线性插值百分位，`sorted` 必须已升序且非空
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// 汇总一个窗口内的记录
pub fn summarize(rows: &[RequestRecord]) -> StatsResponse {
    let ok_rows: Vec<&RequestRecord> = rows.iter().filter(|r| r.status_code == 200).collect();

    StatsResponse {
        count_total: rows.len(),
        count_ok: ok_rows.len(),
        latency_ms: quantile_pack(ok_rows.iter().map(|r| r.duration_ms)),
        prompt_len_chars: quantile_pack(rows.iter().map(|r| r.prompt_len as f64)),
        token_count: quantile_pack(rows.iter().map(|r| r.token_count as f64)),
        image_w: quantile_pack(rows.iter().filter_map(|r| r.image_w).map(|w| w as f64)),
        image_h: quantile_pack(rows.iter().filter_map(|r| r.image_h).map(|h| h as f64)),
    }
}
