// ==========================================
// 贸易 EDI 核心 - 报文段模型
// ==========================================
// 职责: 平面 EDI 报文的段 / 事务 / 循环三级结构
// 红线: Segment 解析后不可变; Loop 仅在一次提取调用内存活
// ==========================================

use chrono::{DateTime, Utc};

// ==========================================
// Segment - 报文段
// ==========================================
// 一行平面 EDI 报文: 有序字段列表，字段 0 为段类型码（BEG/REF/N1 等）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    fields: Vec<String>,
}

impl Segment {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// 从一行文本构造（按元素分隔符切分，字段保留原样）
    pub fn from_line(line: &str, element_separator: char) -> Self {
        Self {
            fields: line.split(element_separator).map(|f| f.to_string()).collect(),
        }
    }

    /// 段类型码（字段 0；空段返回空串）
    pub fn segment_type(&self) -> &str {
        self.fields.first().map(|f| f.as_str()).unwrap_or("")
    }

    /// 按位取值
    ///
    /// # 返回
    /// - Some(&str): 位置存在（可能为空串）
    /// - None: 位置超出字段数 —— 不是错误
    pub fn value(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.as_str())
    }

    /// 按位取非空值（空串视同缺失）
    pub fn non_blank_value(&self, index: usize) -> Option<&str> {
        self.value(index).filter(|v| !v.trim().is_empty())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

// ==========================================
// EdiTransaction - 一次处理单元
// ==========================================
// 有序段列表 + 信封时间戳（由 ISA 等价头段的日期/时间字段对解析）
// 生命周期: 每个入站文件单元构造一次，单趟处理后丢弃
#[derive(Debug, Clone)]
pub struct EdiTransaction {
    pub segments: Vec<Segment>,
    pub envelope_date: DateTime<Utc>,
}

impl EdiTransaction {
    pub fn new(segments: Vec<Segment>, envelope_date: DateTime<Utc>) -> Self {
        Self {
            segments,
            envelope_date,
        }
    }
}

// ==========================================
// SegmentLoop - 循环（递归结构）
// ==========================================
// segments: 本循环自有段（含起始段）
// children: 文档顺序排列的子循环
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentLoop {
    pub segments: Vec<Segment>,
    pub children: Vec<SegmentLoop>,
}

impl SegmentLoop {
    /// 按文档顺序展平整棵循环树（自有段在前，子循环递归随后）
    ///
    /// 用途: 验证"循环提取是纯划分"性质；诊断输出
    pub fn flattened(&self) -> Vec<&Segment> {
        let mut out: Vec<&Segment> = self.segments.iter().collect();
        for child in &self.children {
            out.extend(child.flattened());
        }
        out
    }

    /// 本循环自有段中第一个指定类型的段
    pub fn first_segment(&self, segment_type: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.segment_type() == segment_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_from_line() {
        let seg = Segment::from_line("REF*VN*12345", '*');
        assert_eq!(seg.segment_type(), "REF");
        assert_eq!(seg.value(1), Some("VN"));
        assert_eq!(seg.value(2), Some("12345"));
        assert_eq!(seg.value(3), None);
    }

    #[test]
    fn test_non_blank_value() {
        let seg = Segment::from_line("PO1**24*EA", '*');
        assert_eq!(seg.non_blank_value(1), None);
        assert_eq!(seg.non_blank_value(2), Some("24"));
    }

    #[test]
    fn test_empty_segment_type() {
        let seg = Segment::new(vec![]);
        assert_eq!(seg.segment_type(), "");
        assert_eq!(seg.value(0), None);
    }
}
