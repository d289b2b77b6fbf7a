// ==========================================
// 贸易 EDI 核心 - 报文分段器
// ==========================================
// 职责: 原始报文文本 -> 有序 Segment 列表 + 信封时间戳
// 说明: 分隔符按接入方配置（常见 '*' 元素分隔 + '\n' 或 '~' 段终止）
// ==========================================

use crate::domain::segment::{EdiTransaction, Segment};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::lookup;
use chrono::{DateTime, Utc};

// ==========================================
// SegmentTokenizer - 分段器
// ==========================================
#[derive(Debug, Clone)]
pub struct SegmentTokenizer {
    pub element_separator: char,
    pub segment_terminator: char,
}

impl Default for SegmentTokenizer {
    fn default() -> Self {
        Self {
            element_separator: '*',
            segment_terminator: '\n',
        }
    }
}

impl SegmentTokenizer {
    pub fn new(element_separator: char, segment_terminator: char) -> Self {
        Self {
            element_separator,
            segment_terminator,
        }
    }

    /// 切分原始报文为段列表
    ///
    /// # 说明
    /// - 按段终止符切分，逐段去除首尾空白
    /// - 空段跳过（尾部换行、段终止符后的回车等）
    pub fn parse_segments(&self, raw: &str) -> Vec<Segment> {
        raw.split(self.segment_terminator)
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| Segment::from_line(line, self.element_separator))
            .collect()
    }

    /// 切分并解析信封时间戳，构造完整事务
    ///
    /// # 参数
    /// - raw: 原始报文
    /// - envelope_segment: 信封头段类型（ISA 等价段）
    /// - date_index / time_index: 日期与时间字段下标
    ///
    /// # 错误
    /// - MissingSegment: 信封头段缺失
    /// - InvalidEnvelopeDate: 日期/时间字段为空或不可解析 —— 结构错误，整个事务拒绝
    pub fn parse_transaction(
        &self,
        raw: &str,
        envelope_segment: &str,
        date_index: usize,
        time_index: usize,
    ) -> ParseResult<EdiTransaction> {
        let segments = self.parse_segments(raw);
        let envelope_date =
            envelope_timestamp(&segments, envelope_segment, date_index, time_index)?;
        Ok(EdiTransaction::new(segments, envelope_date))
    }
}

/// 从段列表解析信封时间戳
///
/// # 返回
/// - Ok(DateTime<Utc>): 信封日期/时间字段对解析出的 UTC 时刻
/// - Err(MissingSegment / InvalidEnvelopeDate): 结构错误
pub fn envelope_timestamp(
    segments: &[Segment],
    envelope_segment: &str,
    date_index: usize,
    time_index: usize,
) -> ParseResult<DateTime<Utc>> {
    let header = lookup::find_segment(segments, envelope_segment)
        .ok_or_else(|| ParseError::MissingSegment(envelope_segment.to_string()))?;

    let date = header.non_blank_value(date_index).unwrap_or("");
    let time = header.non_blank_value(time_index).unwrap_or("");
    if date.is_empty() || time.is_empty() {
        return Err(ParseError::InvalidEnvelopeDate {
            date: date.to_string(),
            time: time.to_string(),
        });
    }

    let parsed = lookup::parse_compact_datetime(date, time).map_err(|_| {
        ParseError::InvalidEnvelopeDate {
            date: date.to_string(),
            time: time.to_string(),
        }
    })?;
    Ok(parsed.and_utc())
}
