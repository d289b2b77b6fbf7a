// ==========================================
// 贸易 EDI 核心 - 内容指纹
// ==========================================
// 职责: 里程碑事件的 SHA1 内容指纹（去重判据）
// 性质: 辅助字段先排序去重 —— 字段输入顺序不影响指纹;
//       相同有效输入必产生相同输出
// ==========================================

use chrono::DateTime;
use chrono_tz::Tz;
use sha1::{Digest, Sha1};

/// 计算里程碑事件指纹
///
/// # 参数
/// - code: 事件码
/// - date: 规范化后的事件时间（分钟精度）
/// - aux_fields: 辅助识别字段的文本值（内部排序去重）
pub fn milestone_fingerprint(code: &str, date: &DateTime<Tz>, aux_fields: &[String]) -> String {
    let mut sorted = aux_fields.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut hasher = Sha1::new();
    hasher.update(code.as_bytes());
    hasher.update(b"\n");
    hasher.update(date.to_rfc3339().as_bytes());
    for field in &sorted {
        hasher.update(b"\n");
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// 从字段标识派生事件码: 去掉首个下划线分隔段
///
/// # 示例
/// - ent_one_usg_date -> one_usg_date
/// - 无下划线的标识原样返回
pub fn milestone_code(field_id: &str) -> &str {
    field_id.split_once('_').map(|(_, rest)| rest).unwrap_or(field_id)
}
