// ==========================================
// 贸易 EDI 核心 - 限定符取值与日期解析
// ==========================================
// 职责: 段列表上的纯函数查找（首个/全部/限定符配对/REF/日期）
// 红线: 全部为纯函数，无共享可变状态，可在不同事务上并发调用
// 红线: 缺失的限定符返回 None，绝不抛错；只有"值存在但格式损坏"才是结构错误
// ==========================================

use crate::domain::segment::Segment;
use crate::parser::error::{ParseError, ParseResult};
use chrono::{NaiveDate, NaiveDateTime};

/// 首个指定类型的段（保留文档顺序）
pub fn find_segment<'a>(segments: &'a [Segment], segment_type: &str) -> Option<&'a Segment> {
    segments.iter().find(|s| s.segment_type() == segment_type)
}

/// 全部指定类型的段（保留文档顺序）
pub fn find_segments<'a>(segments: &'a [Segment], segment_type: &str) -> Vec<&'a Segment> {
    segments
        .iter()
        .filter(|s| s.segment_type() == segment_type)
        .collect()
}

/// 扫描段内 (限定符, 值) 配对，返回匹配限定符的值
///
/// # 参数
/// - start_offset: 配对起始字段下标（LIN/SLN 类段为 2，PO1 类段为 6 —— 接入方格式决定）
///
/// # 返回
/// - Some(value): 找到限定符且值非空
/// - None: 限定符不存在或值为空 —— 不是错误
pub fn find_segment_qualified_value<'a>(
    segment: &'a Segment,
    qualifier: &str,
    start_offset: usize,
) -> Option<&'a str> {
    let mut index = start_offset;
    while index < segment.field_count() {
        if segment.value(index) == Some(qualifier) {
            return segment.non_blank_value(index + 1);
        }
        index += 2;
    }
    None
}

/// 查找 REF 段: 限定符字段（1）匹配时返回值字段（2）
///
/// # 返回
/// - None: 无匹配限定符的 REF 段 —— 不是错误
pub fn find_ref_value<'a>(segments: &'a [Segment], qualifier_code: &str) -> Option<&'a str> {
    find_segments(segments, "REF")
        .into_iter()
        .find(|s| s.value(1) == Some(qualifier_code))
        .and_then(|s| s.non_blank_value(2))
}

/// 按指定字段下标的限定符值过滤段（PER/PID 类段）
pub fn find_segments_by_qualifier<'a>(
    segments: &'a [Segment],
    segment_type: &str,
    field_index: usize,
    qualifier_value: &str,
) -> Vec<&'a Segment> {
    segments
        .iter()
        .filter(|s| s.segment_type() == segment_type && s.value(field_index) == Some(qualifier_value))
        .collect()
}

// ==========================================
// 紧凑数字日期解析
// ==========================================

/// 6 位年份展开: YYMMDD -> 20YYMMDD
fn expand_compact_date(date: &str) -> String {
    if date.len() == 6 {
        format!("20{date}")
    } else {
        date.to_string()
    }
}

/// 解析紧凑日期（YYMMDD / YYYYMMDD）
///
/// # 错误
/// - InvalidCompactDate: 组合串不是合法日期；有段上下文的调用方
///   （segment_date_value / envelope_timestamp）换成带诊断上下文的变体
pub fn parse_compact_date(value: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(&expand_compact_date(value), "%Y%m%d").map_err(|_| {
        ParseError::InvalidCompactDate {
            value: value.to_string(),
        }
    })
}

/// 解析紧凑日期时间对（YYMMDD/YYYYMMDD + HHMM）
pub fn parse_compact_datetime(date: &str, time: &str) -> ParseResult<NaiveDateTime> {
    let combined = format!("{}{}", expand_compact_date(date), time);
    NaiveDateTime::parse_from_str(&combined, "%Y%m%d%H%M").map_err(|_| {
        ParseError::InvalidCompactDate { value: combined }
    })
}

/// 段字段上的日期解析（带诊断上下文的结构错误）
///
/// # 返回
/// - Ok(Some(date)): 字段存在且解析成功
/// - Ok(None): 字段缺失或为空 —— 不是错误
/// - Err(InvalidDate): 字段存在但不是合法紧凑日期
pub fn segment_date_value(segment: &Segment, field_index: usize) -> ParseResult<Option<NaiveDate>> {
    match segment.non_blank_value(field_index) {
        None => Ok(None),
        Some(raw) => parse_compact_date(raw)
            .map(Some)
            .map_err(|_| ParseError::InvalidDate {
                segment: segment.segment_type().to_string(),
                field: field_index,
                value: raw.to_string(),
            }),
    }
}

/// DTM 类段的限定日期查找: DTM*<qualifier>*<date>
pub fn find_date_value(
    segments: &[Segment],
    segment_type: &str,
    qualifier: &str,
) -> ParseResult<Option<NaiveDate>> {
    for seg in find_segments(segments, segment_type) {
        if seg.value(1) == Some(qualifier) {
            return segment_date_value(seg, 2);
        }
    }
    Ok(None)
}
