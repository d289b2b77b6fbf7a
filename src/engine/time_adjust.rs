// ==========================================
// 贸易 EDI 核心 - 时间冲突规避（GTN time adjust）
// ==========================================
// 背景: 外部消费方部分依赖"当日第几分钟"区分里程碑事件;
//       同实体同日两个事件落在同一分钟时必须错开，且不得改变日期
// 状态: 已占用分钟持久化在 SyncRecord 上下文（日期串 -> 分钟列表），
//       与指纹同一次写入 —— 崩溃重放对相同持久状态必须得到相同分钟
// ==========================================

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// 一天的分钟数
pub const MINUTES_PER_DAY: u32 = 1440;

/// 对候选时间做冲突规避，返回（可能调整过的）时间
///
/// # 算法
/// - total = 小时*60 + 分钟，按日期串在 used 中登记
/// - 未占用: 原样使用并登记
/// - 已占用: offset 从 1 向外搜索，依次尝试 total+offset / total-offset，
///   取首个落在 [0, 1439] 且未占用的候选
/// - 当日已满（>= 1440 个条目）: 放弃调整，原样返回且不登记（接受冲突，避免死循环）
///
/// # 性质
/// - 对相同的 used 状态与相同输入，结果确定且幂等
pub fn adjust_collision(used: &mut BTreeMap<String, Vec<u32>>, date: DateTime<Tz>) -> DateTime<Tz> {
    let day_used = used.entry(day_key(&date)).or_default();
    let total = date.hour() * 60 + date.minute();

    if day_used.len() >= MINUTES_PER_DAY as usize {
        return date;
    }

    if !day_used.contains(&total) {
        day_used.push(total);
        return date;
    }

    for offset in 1..MINUTES_PER_DAY {
        let forward = total.checked_add(offset).filter(|m| *m < MINUTES_PER_DAY);
        let backward = total.checked_sub(offset);
        for candidate in [forward, backward].into_iter().flatten() {
            if !day_used.contains(&candidate) {
                day_used.push(candidate);
                return with_minute_of_day(&date, candidate);
            }
        }
    }

    // 理论不可达（len < 1440 时必有空位）；保守返回原值
    date
}

/// 冲突规避状态的日期串键
pub fn day_key(date: &DateTime<Tz>) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// 保持日期与时区，替换当日分钟
pub fn with_minute_of_day(date: &DateTime<Tz>, minute_of_day: u32) -> DateTime<Tz> {
    date.timezone()
        .with_ymd_and_hms(
            date.year(),
            date.month(),
            date.day(),
            minute_of_day / 60,
            minute_of_day % 60,
            0,
        )
        .single()
        .unwrap_or(*date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2020, 3, 15, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_first_use_passes_through() {
        let mut used = BTreeMap::new();
        let adjusted = adjust_collision(&mut used, at(8, 30));
        assert_eq!(adjusted, at(8, 30));
        assert_eq!(used["2020-03-15"], vec![510]);
    }

    #[test]
    fn test_collision_shifts_one_minute() {
        // 场景: 同实体同日两个里程碑都规范化到 08:30
        let mut used = BTreeMap::new();
        let first = adjust_collision(&mut used, at(8, 30));
        let second = adjust_collision(&mut used, at(8, 30));

        assert_eq!(first, at(8, 30));
        assert_eq!(second, at(8, 31));
        assert_eq!(used["2020-03-15"], vec![510, 511]);
    }

    #[test]
    fn test_outward_search_prefers_forward_then_backward() {
        let mut used = BTreeMap::new();
        used.insert("2020-03-15".to_string(), vec![510, 511]);
        // +1 已占用 → -1
        let adjusted = adjust_collision(&mut used, at(8, 30));
        assert_eq!(adjusted, at(8, 29));
    }

    #[test]
    fn test_day_boundary_clamped() {
        // 23:59 冲突时 +1 越界，只能向回找
        let mut used = BTreeMap::new();
        used.insert("2020-03-15".to_string(), vec![1439]);
        let adjusted = adjust_collision(&mut used, at(23, 59));
        assert_eq!(adjusted, at(23, 58));
    }

    #[test]
    fn test_no_collision_within_day() {
        // 性质 4: 当日未满时，任意提交序列的返回分钟互不相等
        let mut used = BTreeMap::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..20 {
            let adjusted = adjust_collision(&mut used, at(8, 30));
            let minute = adjusted.hour() * 60 + adjusted.minute();
            assert!(seen.insert(minute), "分钟 {minute} 重复分配");
        }
    }

    #[test]
    fn test_exhausted_day_returns_original() {
        let mut used = BTreeMap::new();
        used.insert("2020-03-15".to_string(), (0..1440).collect());
        let adjusted = adjust_collision(&mut used, at(8, 30));
        assert_eq!(adjusted, at(8, 30));
        // 已满的当日不再追加登记
        assert_eq!(used["2020-03-15"].len(), 1440);
    }

    #[test]
    fn test_deterministic_for_same_state() {
        let mut state_a = BTreeMap::new();
        state_a.insert("2020-03-15".to_string(), vec![510]);
        let mut state_b = state_a.clone();

        assert_eq!(
            adjust_collision(&mut state_a, at(8, 30)),
            adjust_collision(&mut state_b, at(8, 30))
        );
        assert_eq!(state_a, state_b);
    }

    #[test]
    fn test_days_are_independent() {
        let mut used = BTreeMap::new();
        let day1 = adjust_collision(&mut used, at(8, 30));
        let day2 = adjust_collision(
            &mut used,
            chrono_tz::America::New_York
                .with_ymd_and_hms(2020, 3, 16, 8, 30, 0)
                .unwrap(),
        );
        assert_eq!(day1.minute(), 30);
        assert_eq!(day2.minute(), 30);
        assert_eq!(used.len(), 2);
    }
}
