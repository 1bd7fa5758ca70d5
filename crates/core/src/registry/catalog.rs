//! 内置 Provider 目录
//!
//! 2026 年初各文生视频 / 语音 / 语言检测服务的基准元数据，
//! 进程启动时注册到 `ProviderRegistry`。质量分参考公开基准
//! （视频为 2026 评测，语音为 TTS-Arena 排名）。

use super::descriptor::{
    ProviderCategory, ProviderDescriptor, Recommendation, UseCase,
};
use serde_json::json;

/// 构建内置 Provider 描述符
pub fn builtin_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        // ==================== 视频 ====================
        ProviderDescriptor::new("veo_3.1", ProviderCategory::Video, 98.0)
            .with_cost(0.45)
            .with_audio(true)
            .with_4k(true)
            .with_max_duration(120)
            .with_feature("temporal_consistency", json!("best"))
            .with_feature("native_audio", json!(true)),
        ProviderDescriptor::new("sora_2", ProviderCategory::Video, 97.0)
            .with_cost(0.35)
            .with_audio(true)
            .with_max_duration(20)
            .with_feature("physics_accuracy", json!("best"))
            .with_feature("synchronized_speech", json!(true)),
        ProviderDescriptor::new("runway_gen4", ProviderCategory::Video, 92.0)
            .with_cost(0.08)
            .with_4k(true)
            .with_max_duration(16)
            .with_feature("precise_camera_control", json!(true))
            .with_feature("motion_brush", json!(true)),
        ProviderDescriptor::new("runway_gen3_turbo", ProviderCategory::Video, 89.0)
            .with_cost(0.05)
            .with_max_duration(10)
            .with_feature("fast_generation", json!(true)),
        ProviderDescriptor::new("kling_1.6", ProviderCategory::Video, 88.0)
            .with_cost(0.11)
            .with_audio(true)
            .with_max_duration(120)
            .with_feature("lip_sync", json!(true))
            .with_feature("ugc_optimized", json!(true)),
        ProviderDescriptor::new("luma_ray2", ProviderCategory::Video, 85.0)
            .with_cost(0.18)
            .with_max_duration(9)
            .with_feature("physics_simulation", json!("best")),
        ProviderDescriptor::new("hunyuan_video", ProviderCategory::Video, 84.0)
            .with_cost(0.0)
            .with_max_duration(30)
            .with_feature("open_source", json!(true)),
        ProviderDescriptor::new("pika_2.5", ProviderCategory::Video, 80.0)
            .with_cost(0.06)
            .with_max_duration(5)
            .with_feature("social_ready", json!(true))
            .with_feature("free_tier", json!(true)),
        ProviderDescriptor::new("cogvideox", ProviderCategory::Video, 78.0)
            .with_cost(0.0)
            .with_max_duration(10)
            .with_feature("open_source", json!(true)),
        // ==================== 语音 ====================
        ProviderDescriptor::new("fish_audio", ProviderCategory::Voice, 96.0)
            .with_cost(0.015)
            .with_languages(&[
                "en", "zh", "ja", "ko", "es", "fr", "de", "it", "pt", "ru", "ar", "hi",
            ])
            .with_feature("voice_cloning", json!(true))
            .with_feature("tts_arena_rank", json!(1)),
        ProviderDescriptor::new("elevenlabs", ProviderCategory::Voice, 95.0)
            .with_cost(0.30)
            .with_languages(&["en", "es", "fr", "de", "it", "pt", "pl", "hi", "ar"])
            .with_feature("voice_cloning", json!(true))
            .with_feature("emotion_control", json!("advanced")),
        ProviderDescriptor::new("cartesia", ProviderCategory::Voice, 93.0)
            .with_cost(0.025)
            .with_feature("voice_cloning", json!(true))
            .with_feature("low_latency", json!("best")),
        ProviderDescriptor::new("chatterbox", ProviderCategory::Voice, 90.0)
            .with_cost(0.0)
            .with_languages(&[
                "en", "es", "fr", "de", "it", "pt", "nl", "pl", "ru", "zh", "ja", "ko",
            ])
            .with_feature("open_source", json!(true)),
        // ==================== 语言检测 ====================
        ProviderDescriptor::new("lingua", ProviderCategory::Language, 95.0)
            .with_cost(0.0)
            .with_feature("open_source", json!(true))
            .with_feature("short_text_accuracy", json!("best")),
        ProviderDescriptor::new("google_cloud", ProviderCategory::Language, 92.0)
            .with_cost(0.00002)
            .with_feature("enterprise", json!(true)),
    ]
}

/// 查询用例推荐（纯查表，无 I/O）
pub fn recommendation_for(use_case: UseCase) -> Recommendation {
    let (best, alternative, reason) = match use_case {
        UseCase::Cinematic => (
            "veo_3.1",
            "runway_gen4",
            "4K、最佳时序一致性、原生音频与成熟运镜",
        ),
        UseCase::Realism => (
            "sora_2",
            "veo_3.1",
            "最佳物理一致性、角色一致性与照片级写实",
        ),
        UseCase::Creative => (
            "runway_gen4",
            "runway_gen3_turbo",
            "最灵活的创意控制，精确运镜，适合 VFX 工作流",
        ),
        UseCase::Volume => (
            "kling_1.6",
            "pika_2.5",
            "2 分钟时长、唇形同步，适合高频 UGC 生产",
        ),
        UseCase::Budget => (
            "pika_2.5",
            "hunyuan_video",
            "低成本且有免费额度，适合社交媒体内容",
        ),
    };
    Recommendation {
        best: best.to_string(),
        alternative: alternative.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderRegistry;

    #[test]
    fn test_builtin_catalog_registers_cleanly() {
        let registry = ProviderRegistry::with_builtin_catalog();
        assert!(registry.get_provider("veo_3.1").is_some());
        assert!(registry.get_provider("fish_audio").is_some());
        assert!(registry.get_provider("lingua").is_some());

        let videos = registry.list_providers(Some(ProviderCategory::Video), None);
        assert_eq!(videos.len(), 9);
        // 列表按质量分降序
        assert_eq!(videos[0].id, "veo_3.1");
    }

    #[test]
    fn test_recommendations_reference_registered_providers() {
        let registry = ProviderRegistry::with_builtin_catalog();
        for use_case in [
            UseCase::Cinematic,
            UseCase::Realism,
            UseCase::Creative,
            UseCase::Volume,
            UseCase::Budget,
        ] {
            let rec = recommendation_for(use_case);
            assert!(registry.get_provider(&rec.best).is_some(), "{}", rec.best);
            assert!(
                registry.get_provider(&rec.alternative).is_some(),
                "{}",
                rec.alternative
            );
            assert!(!rec.reason.is_empty());
        }
    }
}
