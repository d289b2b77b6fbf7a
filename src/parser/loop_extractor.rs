// ==========================================
// 贸易 EDI 核心 - 循环提取器
// ==========================================
// 职责: 有序段列表 -> 嵌套循环树（头段 + 重复层级组）
// 用途: 850（单层行循环）与 856（设备/订单/行项目多层）共用
// 性质: 纯划分 —— 循环树按文档顺序展平 == 停止段之前的原始段序列
// ==========================================

use crate::domain::segment::{Segment, SegmentLoop};

/// 从段列表提取循环树
///
/// # 参数
/// - segments: 文档顺序的段列表
/// - loop_starts: 循环起始段类型，按声明顺序从最外层到最内层
/// - stop_types: 终止段类型（CTT 类汇总段）；遇到即整体终止，其后的段不处理
///
/// # 规则
/// - 首个循环起始段之前的段全部归入隐式根循环（头段）
/// - 外层类型段关闭当前所有更内层的开放循环，并开启新的嵌套层
/// - 内层类型段嵌套在最近开启的外层循环之下
/// - 未注册为循环起始的段延续当前最内层开放循环（宽松 —— 未知段不破坏提取）
pub fn extract_loops(
    segments: &[Segment],
    loop_starts: &[&str],
    stop_types: &[&str],
) -> SegmentLoop {
    let mut root = SegmentLoop::default();
    // 开放循环栈: 栈深即嵌套层级
    let mut open: Vec<SegmentLoop> = Vec::new();

    for segment in segments {
        let segment_type = segment.segment_type();

        if stop_types.contains(&segment_type) {
            break;
        }

        if let Some(depth) = loop_starts.iter().position(|t| *t == segment_type) {
            // 外层（或同层）起始段: 关闭所有更内层的开放循环
            while open.len() > depth {
                close_innermost(&mut root, &mut open);
            }
            let mut new_loop = SegmentLoop::default();
            new_loop.segments.push(segment.clone());
            open.push(new_loop);
        } else if let Some(innermost) = open.last_mut() {
            innermost.segments.push(segment.clone());
        } else {
            root.segments.push(segment.clone());
        }
    }

    while !open.is_empty() {
        close_innermost(&mut root, &mut open);
    }
    root
}

/// 关闭最内层开放循环，挂到其父循环（无父则挂到根）
fn close_innermost(root: &mut SegmentLoop, open: &mut Vec<SegmentLoop>) {
    if let Some(closed) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(closed),
            None => root.children.push(closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::Segment;

    fn segs(lines: &[&str]) -> Vec<Segment> {
        lines.iter().map(|l| Segment::from_line(l, '*')).collect()
    }

    #[test]
    fn test_single_level_line_loops() {
        // 2 个头段 + 3 个单段行循环
        let segments = segs(&["BEG*00*SA*PO-1", "N1*ST*收货方", "PO1*A", "PO1*B", "PO1*C"]);
        let root = extract_loops(&segments, &["PO1"], &[]);

        assert_eq!(root.segments.len(), 2);
        assert_eq!(root.children.len(), 3);
        for (child, id) in root.children.iter().zip(["A", "B", "C"]) {
            assert_eq!(child.segments.len(), 1);
            assert_eq!(child.segments[0].value(1), Some(id));
        }
    }

    #[test]
    fn test_continuation_segments_stay_in_loop() {
        let segments = segs(&["BEG*00", "PO1*1", "PID*F*描述", "PO1*2"]);
        let root = extract_loops(&segments, &["PO1"], &[]);

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].segments.len(), 2); // PO1 + PID
        assert_eq!(root.children[0].segments[1].segment_type(), "PID");
    }

    #[test]
    fn test_stop_segment_clips_trailer() {
        let segments = segs(&["BEG*00", "PO1*1", "CTT*1", "SE*10"]);
        let root = extract_loops(&segments, &["PO1"], &["CTT"]);

        let flat = root.flattened();
        assert_eq!(flat.len(), 2); // CTT 与其后的 SE 都被剪除
        assert!(flat.iter().all(|s| s.segment_type() != "CTT"));
    }

    #[test]
    fn test_multi_level_nesting() {
        // 设备 -> 订单 -> 行项目 三层（856 形态）
        let segments = segs(&[
            "BSN*00*SHP-1",
            "EQD*CN*CONT-1",
            "PRF*PO-1",
            "LIN*1*VN*P1",
            "LIN*2*VN*P2",
            "PRF*PO-2",
            "LIN*1*VN*P3",
            "EQD*CN*CONT-2",
            "PRF*PO-3",
            "LIN*1*VN*P4",
        ]);
        let root = extract_loops(&segments, &["EQD", "PRF", "LIN"], &[]);

        assert_eq!(root.segments.len(), 1); // BSN
        assert_eq!(root.children.len(), 2); // 2 个设备循环

        let cont1 = &root.children[0];
        assert_eq!(cont1.segments[0].value(2), Some("CONT-1"));
        assert_eq!(cont1.children.len(), 2); // PO-1 / PO-2
        assert_eq!(cont1.children[0].children.len(), 2); // PO-1 下 2 个行项目
        assert_eq!(cont1.children[1].children.len(), 1);

        let cont2 = &root.children[1];
        assert_eq!(cont2.children.len(), 1);
        assert_eq!(cont2.children[0].children[0].segments[0].value(3), Some("P4"));
    }

    #[test]
    fn test_outer_type_closes_inner_loops() {
        // 外层段出现时，所有开放的内层循环全部关闭
        let segments = segs(&["EQD*CN*C1", "PRF*PO-1", "LIN*1", "EQD*CN*C2"]);
        let root = extract_loops(&segments, &["EQD", "PRF", "LIN"], &[]);

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children[0].children.len(), 1);
        assert!(root.children[1].children.is_empty());
    }

    #[test]
    fn test_inner_type_without_open_parent_is_lenient() {
        // 内层段先于外层出现: 挂在当前最深开放层（根下自成循环），不破坏提取
        let segments = segs(&["BSN*00", "LIN*1*VN*P1", "EQD*CN*C1"]);
        let root = extract_loops(&segments, &["EQD", "PRF", "LIN"], &[]);

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].segments[0].segment_type(), "LIN");
        assert_eq!(root.children[1].segments[0].segment_type(), "EQD");
    }

    #[test]
    fn test_extraction_is_pure_partition() {
        // 性质 1: 展平循环树 == 停止段之前的原始段序列
        let segments = segs(&[
            "ISA*信封",
            "BSN*00*SHP-1",
            "EQD*CN*C1",
            "PRF*PO-1",
            "LIN*1*VN*P1",
            "MAN*GM*条码",
            "EQD*CN*C2",
            "LIN*1*VN*P2",
            "CTT*5",
            "SE*99",
        ]);
        let root = extract_loops(&segments, &["EQD", "PRF", "LIN"], &["CTT"]);

        let flat: Vec<Segment> = root.flattened().into_iter().cloned().collect();
        let expected: Vec<Segment> = segments[..8].to_vec();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_empty_input() {
        let root = extract_loops(&[], &["PO1"], &[]);
        assert!(root.segments.is_empty());
        assert!(root.children.is_empty());
    }
}
