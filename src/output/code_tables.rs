// ==========================================
// 贸易 EDI 核心 - 静态代码表
// ==========================================
// 职责: 运输方式码 / 港口限定符的查表（纯数据，不是控制流）
// ==========================================

/// 运输方式描述 -> X12 运输方式码
const SHIP_MODE_CODES: &[(&str, &str)] = &[
    ("AIR", "A"),
    ("OCEAN", "S"),
    ("SEA", "S"),
    ("RAIL", "R"),
    ("TRUCK", "M"),
    ("MOTOR", "M"),
];

/// 港口角色 -> 出站文档港口限定符
const PORT_QUALIFIERS: &[(&str, &str)] = &[
    ("port_of_lading", "L"),
    ("port_of_unlading", "D"),
    ("port_of_destination", "E"),
];

/// 查运输方式码（大小写不敏感；未知方式返回 None）
pub fn ship_mode_code(description: &str) -> Option<&'static str> {
    let upper = description.trim().to_uppercase();
    SHIP_MODE_CODES
        .iter()
        .find(|(desc, _)| *desc == upper)
        .map(|(_, code)| *code)
}

/// 查港口限定符
pub fn port_qualifier(role: &str) -> Option<&'static str> {
    PORT_QUALIFIERS
        .iter()
        .find(|(name, _)| *name == role)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ship_mode_table() {
        assert_eq!(ship_mode_code("Ocean"), Some("S"));
        assert_eq!(ship_mode_code("SEA"), Some("S"));
        assert_eq!(ship_mode_code("air"), Some("A"));
        assert_eq!(ship_mode_code("驴车"), None);
    }

    #[test]
    fn test_port_qualifier_table() {
        assert_eq!(port_qualifier("port_of_lading"), Some("L"));
        assert_eq!(port_qualifier("port_of_unlading"), Some("D"));
        assert_eq!(port_qualifier("somewhere_else"), None);
    }

    #[test]
    fn test_tables_have_no_duplicate_keys() {
        // 代码表当数据测试: 键唯一
        let mut keys: Vec<&str> = SHIP_MODE_CODES.iter().map(|(k, _)| *k).collect();
        keys.sort();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }
}
