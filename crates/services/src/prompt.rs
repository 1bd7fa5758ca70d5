//! 提示词增强
//!
//! 规则式增强：按风格补充镜头语言与画质描述词。已出现在提示词里的
//! 描述不会重复追加，因此对同一提示词多次增强结果稳定。

use serde::Serialize;
use tracing::debug;

/// 所有风格通用的画质描述词
const QUALITY_TAGS: &[&str] = &["high detail", "smooth motion"];

/// 风格到镜头语言描述词的映射
fn style_tags(style: &str) -> &'static [&'static str] {
    match style.to_lowercase().as_str() {
        "cinematic" => &["cinematic lighting", "shallow depth of field", "film grain"],
        "realistic" | "realism" => &["photorealistic", "natural lighting"],
        "creative" | "artistic" => &["vivid colors", "surreal composition"],
        "anime" => &["anime style", "cel shading"],
        "documentary" => &["documentary style", "handheld camera"],
        _ => &[],
    }
}

/// 增强结果
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedPrompt {
    /// 原始提示词
    pub original: String,
    /// 增强后的提示词
    pub enhanced: String,
    /// 追加的描述词
    pub additions: Vec<String>,
}

/// 规则式提示词增强器
#[derive(Debug, Default)]
pub struct PromptEnhancer;

impl PromptEnhancer {
    /// 增强提示词；`style` 对应请求里的视觉风格
    pub fn enhance(&self, prompt: &str, style: Option<&str>) -> EnhancedPrompt {
        let original = prompt.trim().to_string();
        let lowered = original.to_lowercase();

        let mut additions: Vec<String> = Vec::new();
        if let Some(style) = style {
            for tag in style_tags(style) {
                if !lowered.contains(tag) {
                    additions.push((*tag).to_string());
                }
            }
        }
        for tag in QUALITY_TAGS {
            if !lowered.contains(tag) {
                additions.push((*tag).to_string());
            }
        }

        let enhanced = if additions.is_empty() {
            original.clone()
        } else {
            format!("{original}, {}", additions.join(", "))
        };
        debug!(additions = additions.len(), "提示词增强完成");
        EnhancedPrompt {
            original,
            enhanced,
            additions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_tags_appended() {
        let enhancer = PromptEnhancer;
        let result = enhancer.enhance("海边日落", Some("cinematic"));
        assert!(result.enhanced.starts_with("海边日落, "));
        assert!(result.enhanced.contains("cinematic lighting"));
        assert!(result.enhanced.contains("high detail"));
        assert_eq!(result.original, "海边日落");
        assert!(!result.additions.is_empty());
    }

    #[test]
    fn test_existing_tags_not_duplicated() {
        let enhancer = PromptEnhancer;
        let result = enhancer.enhance(
            "sunset over the sea, cinematic lighting, high detail, smooth motion",
            Some("cinematic"),
        );
        assert_eq!(result.enhanced.matches("cinematic lighting").count(), 1);
        assert_eq!(result.enhanced.matches("high detail").count(), 1);
        // 再增强一次结果不变
        let again = enhancer.enhance(&result.enhanced, Some("cinematic"));
        assert_eq!(again.enhanced, result.enhanced);
    }

    #[test]
    fn test_unknown_style_only_quality_tags() {
        let enhancer = PromptEnhancer;
        let result = enhancer.enhance("城市夜景", Some("vaporwave"));
        assert_eq!(
            result.additions,
            vec!["high detail".to_string(), "smooth motion".to_string()]
        );
    }

    #[test]
    fn test_no_style_trims_whitespace() {
        let enhancer = PromptEnhancer;
        let result = enhancer.enhance("  一只猫在弹钢琴  ", None);
        assert_eq!(result.original, "一只猫在弹钢琴");
        assert!(result.enhanced.starts_with("一只猫在弹钢琴"));
    }
}
