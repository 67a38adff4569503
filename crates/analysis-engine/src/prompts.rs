//! Chat requests sent to the language model

use crate::llm::ChatMessage;

pub fn needs_analysis(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "你是资深合同分析师，只在文本明确涉及合同条款、权利义务或商业安排时识别合同类型；\
             问候、闲聊和非合同事务一律返回\"无相关合同\"；特殊关注点只引用文本中的原词。",
        ),
        ChatMessage::user(format!(
            "请分析以下用户输入，只返回一个JSON对象，字段如下：\n\
             {{\"contract_category\": \"合同大类 或 无相关合同\", \
             \"specific_type\": \"具体合同类型 或 N/A\", \
             \"special_concerns\": [\"关注点\"]}}\n\n用户输入：\n{}",
            text
        )),
    ]
}

pub fn keyword_extraction(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "你是合同法律要素提取专家，使用《民法典》合同编术语，排除具体金额、日期和模糊表述。",
        ),
        ChatMessage::user(format!(
            "请从以下文本中提取合同相关的专业关键词，按重要性降序排列，用逗号分隔，\
             不加序号，不作解释。\n\n文本：\n{}",
            text
        )),
    ]
}

pub fn placeholder_extraction(text: &str, keys: &[String]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "你是法律文书信息提取助手。严格按给定关键词提取文本中明确存在的信息，\
             找不到的返回空字符串，只返回JSON对象，每个关键词都必须出现在结果中。",
        ),
        ChatMessage::user(format!(
            "请从以下文本中提取与关键词对应的信息，以JSON对象返回。\n\n\
             文本内容：\n{}\n\n需要提取的关键词：\n{}",
            text,
            keys.join(",")
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_requests_embed_input() {
        let messages = placeholder_extraction("甲方：张三", &["甲方".to_string(), "乙方".to_string()]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("甲方：张三"));
        assert!(messages[1].content.contains("甲方,乙方"));

        assert!(needs_analysis("租房").last().unwrap().content.contains("租房"));
        assert!(keyword_extraction("买车").last().unwrap().content.contains("买车"));
    }
}
