//! Dictionary-driven coarse contract-type detection
//!
//! A label is reported when any of its trigger substrings occurs in the text.
//! Matching is case-sensitive and purely lexical.

use std::collections::BTreeSet;

/// Coarse contract-type labels and their trigger substrings
pub const CONTRACT_TYPE_TRIGGERS: &[(&str, &[&str])] = &[
    ("买卖", &["买卖", "购买", "出售", "销售", "采购", "交易"]),
    ("租赁", &["租赁", "出租", "承租", "房屋租赁", "租用", "租借"]),
    ("服务", &["服务", "咨询", "顾问", "中介", "代理", "委托"]),
    (
        "工程",
        &["工程", "建设", "施工", "装修", "建筑", "设计", "监理"],
    ),
    (
        "劳务",
        &["劳务", "用工", "雇佣", "聘用", "招聘", "人力资源"],
    ),
    ("保管", &["保管", "仓储", "存储", "寄存", "托管"]),
    ("运输", &["运输", "物流", "快递", "货运", "配送", "运送"]),
    (
        "许可",
        &["特许", "许可", "授权", "专利", "商标", "著作权", "知识产权"],
    ),
    (
        "融资",
        &["融资", "借款", "贷款", "抵押", "担保", "质押", "保证"],
    ),
    ("赠与", &["赠与", "捐赠", "馈赠", "无偿"]),
    (
        "修缮",
        &["修缮", "修理", "维修", "改造", "翻新", "维护", "保养"],
    ),
    ("承揽", &["承揽", "承接", "接受委托", "完成工作"]),
    ("加工", &["加工", "定制", "生产制造", "原料加工"]),
    ("定作", &["定作", "定制", "定做", "定制品", "特制"]),
    ("房产", &["房产", "房屋", "住宅", "商品房", "不动产"]),
    ("汽车", &["汽车", "车辆", "二手车", "机动车"]),
    ("保险", &["保险", "投保", "理赔", "保额"]),
];

/// Maps free text to zero or more coarse contract-type labels
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractTypeExtractor;

impl ContractTypeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// All labels with at least one trigger present in `text`
    pub fn extract_types(&self, text: &str) -> BTreeSet<String> {
        CONTRACT_TYPE_TRIGGERS
            .iter()
            .filter(|(_, triggers)| triggers.iter().any(|t| text.contains(t)))
            .map(|(label, _)| label.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(text: &str) -> Vec<String> {
        ContractTypeExtractor::new()
            .extract_types(text)
            .into_iter()
            .collect()
    }

    #[test]
    fn test_seventeen_labels() {
        assert_eq!(CONTRACT_TYPE_TRIGGERS.len(), 17);
    }

    #[test]
    fn test_single_label() {
        assert_eq!(types("我想采购一批电脑"), vec!["买卖"]);
    }

    #[test]
    fn test_multiple_labels() {
        let found = types("二手车出售，需要分期贷款");
        assert_eq!(found.len(), 3);
        for label in ["买卖", "汽车", "融资"] {
            assert!(found.iter().any(|f| f == label), "missing {}", label);
        }
    }

    #[test]
    fn test_shared_trigger_hits_both_labels() {
        let found = types("家具定制");
        assert!(found.contains(&"加工".to_string()));
        assert!(found.contains(&"定作".to_string()));
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(types("今天天气不错").is_empty());
        assert!(types("").is_empty());
    }

    #[test]
    fn test_case_sensitive() {
        assert!(types("SALE").is_empty());
    }
}
