// ==========================================
// 贸易 EDI 核心 - 315 XML 生成器
// ==========================================
// 职责: 事件批 -> XML 工件 -> 传输接收器; 成功后回写同步记录确认时间
// 红线: 传输实现（FTP/S3）不在本核心范围，经 TransportSink 注入
// ==========================================

use crate::output::splitter::MilestoneDocument;
use crate::output::{code_tables, OutboundGenerator, TransportSink};
use crate::repository::sync_record_repo::SyncRecordStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

// ==========================================
// XmlMilestoneGenerator - XML 出站生成器
// ==========================================
pub struct XmlMilestoneGenerator {
    sink: Arc<dyn TransportSink>,
    folder: String,                       // 目的目录（接入方配置）
}

impl XmlMilestoneGenerator {
    pub fn new(sink: Arc<dyn TransportSink>, folder: impl Into<String>) -> Self {
        Self {
            sink,
            folder: folder.into(),
        }
    }

    /// 构建单份文档的 XML 工件
    pub fn build_xml(&self, doc: &MilestoneDocument) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<MilestoneNotification>\n");
        push_element(&mut xml, 1, "EntityReference", &doc.entity_key);
        push_element(&mut xml, 1, "ImporterId", &doc.importer_id);
        if let Some(mbl) = &doc.master_bill {
            push_element(&mut xml, 1, "MasterBill", mbl);
        }
        if let Some(container) = &doc.container_number {
            push_element(&mut xml, 1, "Container", container);
        }
        if let Some(mode) = doc
            .transport_mode
            .as_deref()
            .and_then(code_tables::ship_mode_code)
        {
            push_element(&mut xml, 1, "TransportMode", mode);
        }
        for (role, name) in &doc.ports {
            if let Some(qualifier) = code_tables::port_qualifier(role) {
                xml.push_str(&format!(
                    "  <Port Qualifier=\"{qualifier}\">{}</Port>\n",
                    xml_escape(name)
                ));
            }
        }
        xml.push_str("  <Events>\n");
        for update in &doc.updates {
            xml.push_str("    <Event>\n");
            push_element(&mut xml, 3, "Code", &update.code);
            push_element(&mut xml, 3, "Time", &update.date.to_rfc3339());
            xml.push_str("    </Event>\n");
        }
        xml.push_str("  </Events>\n");
        xml.push_str("</MilestoneNotification>\n");
        xml
    }
}

#[async_trait]
impl OutboundGenerator for XmlMilestoneGenerator {
    /// 生成并上传; 成功后对每条事件的同步记录标记确认
    async fn generate_and_send(
        &self,
        doc: &MilestoneDocument,
        sync_store: &dyn SyncRecordStore,
    ) -> anyhow::Result<()> {
        let xml = self.build_xml(doc);
        self.sink.upload(xml.into_bytes(), &self.folder).await?;

        let now = Utc::now();
        for update in &doc.updates {
            sync_store.mark_confirmed(&doc.entity_key, &update.trading_partner, now)?;
        }
        tracing::info!(
            entity = %doc.entity_key,
            events = doc.updates.len(),
            folder = %self.folder,
            "315 XML 上传完成"
        );
        Ok(())
    }
}

fn push_element(xml: &mut String, indent: usize, name: &str, value: &str) {
    for _ in 0..indent {
        xml.push_str("  ");
    }
    xml.push('<');
    xml.push_str(name);
    xml.push('>');
    xml.push_str(&xml_escape(value));
    xml.push_str("</");
    xml.push_str(name);
    xml.push_str(">\n");
}

/// XML 文本转义（五个保留字符）
fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::milestone::MilestoneUpdate;
    use chrono::TimeZone;

    struct NullSink;

    #[async_trait]
    impl TransportSink for NullSink {
        async fn upload(&self, _artifact: Vec<u8>, _folder: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn sample_doc() -> MilestoneDocument {
        MilestoneDocument {
            entity_key: "ENT<1>&\"X\"".to_string(),
            importer_id: "IMP".to_string(),
            master_bill: Some("MBL-A".to_string()),
            container_number: None,
            transport_mode: Some("Ocean".to_string()),
            ports: vec![("port_of_lading".to_string(), "Shanghai".to_string())],
            updates: vec![MilestoneUpdate {
                code: "one_usg_date".to_string(),
                date: chrono_tz::America::New_York
                    .with_ymd_and_hms(2020, 3, 15, 8, 30, 0)
                    .unwrap(),
                trading_partner: "315_one_usg_date".to_string(),
            }],
        }
    }

    #[test]
    fn test_build_xml_escapes_and_structures() {
        let generator = XmlMilestoneGenerator::new(Arc::new(NullSink), "_315_out");
        let xml = generator.build_xml(&sample_doc());

        assert!(xml.contains("<EntityReference>ENT&lt;1&gt;&amp;&quot;X&quot;</EntityReference>"));
        assert!(xml.contains("<MasterBill>MBL-A</MasterBill>"));
        assert!(xml.contains("<TransportMode>S</TransportMode>"));
        assert!(xml.contains("<Port Qualifier=\"L\">Shanghai</Port>"));
        assert!(xml.contains("<Code>one_usg_date</Code>"));
        assert!(xml.contains("<Time>2020-03-15T08:30:00-04:00</Time>"));
        assert!(!xml.contains("<Container>"));
    }
}
