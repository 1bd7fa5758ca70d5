//! Provider 注册表模块
//!
//! 维护各类别已知 Provider 的权威列表，并回答选择查询。
//!
//! ## 模块结构
//!
//! - `descriptor` - 描述符、类别、质量等级与选择约束
//! - `catalog` - 内置 Provider 目录与用例推荐表
//!
//! ## 使用模式
//!
//! 注册表在进程启动时构造并注册一次，任务执行期间只读。
//! 通过 `Arc<ProviderRegistry>` 显式注入编排器，不使用全局单例。

mod catalog;
mod descriptor;

pub use catalog::{builtin_descriptors, recommendation_for};
pub use descriptor::{
    ProviderCategory, ProviderDescriptor, QualityTier, Recommendation, SelectionConstraints,
    UseCase,
};

use crate::errors::RegistryError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Provider 使用统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    /// 总请求数
    pub total_requests: u64,
    /// 成功请求数
    pub successful_requests: u64,
    /// 累计成本
    pub total_cost: f64,
    /// 平均延迟（毫秒，滚动平均）
    pub avg_latency_ms: f64,
}

impl UsageStats {
    /// 成功率（无请求时为 1.0）
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

#[derive(Default)]
struct RegistryInner {
    /// 各类别的描述符，保持注册顺序（用于最终平局裁决）
    providers: HashMap<ProviderCategory, Vec<ProviderDescriptor>>,
    /// 使用统计
    usage_stats: HashMap<String, UsageStats>,
}

/// Provider 注册表
///
/// 进程级状态，启动时从静态配置初始化一次。任务执行期间只读，
/// 无需按任务加锁。
#[derive(Default)]
pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
}

impl ProviderRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建并注册内置 Provider 目录
    pub fn with_builtin_catalog() -> Self {
        let registry = Self::new();
        for descriptor in builtin_descriptors() {
            // 内置目录经过校验，注册不会失败
            let _ = registry.register(descriptor);
        }
        registry
    }

    /// 注册 Provider
    ///
    /// 同 ID 重复注册会覆盖原条目（保留原注册位置）。
    pub fn register(&self, descriptor: ProviderDescriptor) -> Result<(), RegistryError> {
        if descriptor.id.trim().is_empty() {
            return Err(RegistryError::Validation("id 不能为空".to_string()));
        }
        if !(0.0..=100.0).contains(&descriptor.quality_score) {
            return Err(RegistryError::Validation(format!(
                "quality_score 超出范围 [0, 100]: {}",
                descriptor.quality_score
            )));
        }
        if descriptor.cost_per_unit < 0.0 {
            return Err(RegistryError::Validation(format!(
                "cost_per_unit 不能为负: {}",
                descriptor.cost_per_unit
            )));
        }

        let mut inner = self.inner.write();
        let entries = inner.providers.entry(descriptor.category).or_default();

        info!(
            id = %descriptor.id,
            category = %descriptor.category,
            quality = descriptor.quality_score,
            "provider 已注册"
        );

        if let Some(existing) = entries.iter_mut().find(|d| d.id == descriptor.id) {
            *existing = descriptor;
        } else {
            entries.push(descriptor);
        }
        Ok(())
    }

    /// 按 ID 查询描述符
    pub fn get_provider(&self, id: &str) -> Option<ProviderDescriptor> {
        let inner = self.inner.read();
        for category in ProviderCategory::all() {
            if let Some(entries) = inner.providers.get(category) {
                if let Some(found) = entries.iter().find(|d| d.id == id) {
                    return Some(found.clone());
                }
            }
        }
        None
    }

    /// 列出 Provider（可按类别 / 等级过滤），按质量分降序
    pub fn list_providers(
        &self,
        category: Option<ProviderCategory>,
        tier: Option<QualityTier>,
    ) -> Vec<ProviderDescriptor> {
        let inner = self.inner.read();
        let mut result: Vec<ProviderDescriptor> = Vec::new();

        let categories: Vec<ProviderCategory> = match category {
            Some(c) => vec![c],
            None => ProviderCategory::all().to_vec(),
        };

        for c in categories {
            if let Some(entries) = inner.providers.get(&c) {
                for descriptor in entries {
                    if tier.is_none() || tier == Some(descriptor.tier()) {
                        result.push(descriptor.clone());
                    }
                }
            }
        }

        result.sort_by(|a, b| {
            b.quality_score
                .partial_cmp(&a.quality_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        result
    }

    /// 选择满足约束的最佳 Provider
    ///
    /// 算法：过滤掉不满足硬约束或未启用的候选；若偏好原生音频且有
    /// 满足者，收窄到该子集；按质量分降序排名，平局先比单位成本
    /// （低者优先），再比注册顺序。候选集为空时返回
    /// `NoProviderAvailable`。
    pub fn get_best_provider(
        &self,
        category: ProviderCategory,
        constraints: &SelectionConstraints,
    ) -> Result<ProviderDescriptor, RegistryError> {
        self.ranked_candidates(category, constraints)?
            .into_iter()
            .next()
            .ok_or(RegistryError::NoProviderAvailable(category))
    }

    /// 构建降级链
    ///
    /// 候选集与 `get_best_provider` 使用相同的硬约束；结果按质量等级
    /// 分组（premium → standard → budget），每档内部按质量分降序。
    /// 整条链的质量分单调不增。
    pub fn get_fallback_chain(
        &self,
        category: ProviderCategory,
        constraints: &SelectionConstraints,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError> {
        let ranked = self.ranked_candidates(category, constraints)?;
        if ranked.is_empty() {
            return Err(RegistryError::NoProviderAvailable(category));
        }

        let mut chain = Vec::with_capacity(ranked.len());
        for tier in QualityTier::ordered() {
            for descriptor in ranked.iter().filter(|d| d.tier() == *tier) {
                chain.push(descriptor.clone());
            }
        }
        Ok(chain)
    }

    /// 查询用例推荐
    ///
    /// 纯查表，无 I/O。
    pub fn get_recommendations(&self, use_case: UseCase) -> Recommendation {
        recommendation_for(use_case)
    }

    /// 记录一次 Provider 调用的使用统计
    pub fn record_usage(&self, id: &str, latency_ms: f64, success: bool, cost: f64) {
        let mut inner = self.inner.write();
        let stats = inner.usage_stats.entry(id.to_string()).or_default();
        stats.total_requests += 1;
        if success {
            stats.successful_requests += 1;
        }
        stats.total_cost += cost;
        // 滚动平均延迟
        let n = stats.total_requests as f64;
        stats.avg_latency_ms = (stats.avg_latency_ms * (n - 1.0) + latency_ms) / n;
    }

    /// 获取使用统计
    pub fn usage_stats(&self, id: Option<&str>) -> HashMap<String, UsageStats> {
        let inner = self.inner.read();
        match id {
            Some(id) => inner
                .usage_stats
                .get(id)
                .map(|s| {
                    let mut map = HashMap::new();
                    map.insert(id.to_string(), s.clone());
                    map
                })
                .unwrap_or_default(),
            None => inner.usage_stats.clone(),
        }
    }

    /// 过滤并排序候选集
    fn ranked_candidates(
        &self,
        category: ProviderCategory,
        constraints: &SelectionConstraints,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError> {
        let inner = self.inner.read();
        let entries = inner
            .providers
            .get(&category)
            .ok_or(RegistryError::NoProviderAvailable(category))?;

        // (注册顺序, 描述符)，顺序用于最终平局裁决
        let mut candidates: Vec<(usize, &ProviderDescriptor)> = entries
            .iter()
            .enumerate()
            .filter(|(_, d)| d.enabled && constraints.satisfied_by(d))
            .collect();

        // 软约束：仅当存在原生音频候选时收窄
        if constraints.prefer_native_audio && candidates.iter().any(|(_, d)| d.supports_audio) {
            candidates.retain(|(_, d)| d.supports_audio);
        }

        candidates.sort_by(|(ia, a), (ib, b)| {
            b.quality_score
                .partial_cmp(&a.quality_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.cost_per_unit
                        .partial_cmp(&b.cost_per_unit)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(ia.cmp(ib))
        });

        Ok(candidates.into_iter().map(|(_, d)| d.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn video(id: &str, score: f64, cost: f64) -> ProviderDescriptor {
        ProviderDescriptor::new(id, ProviderCategory::Video, score).with_cost(cost)
    }

    fn test_registry() -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        registry
            .register(video("veo", 98.0, 0.45).with_audio(true).with_4k(true))
            .unwrap();
        registry
            .register(video("sora", 97.0, 0.35).with_audio(true))
            .unwrap();
        registry.register(video("runway", 92.0, 0.08).with_4k(true)).unwrap();
        registry.register(video("kling", 88.0, 0.11).with_audio(true)).unwrap();
        registry.register(video("pika", 80.0, 0.06)).unwrap();
        registry.register(video("cogvideo", 78.0, 0.0)).unwrap();
        registry
    }

    #[test]
    fn test_register_validation() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.register(video("", 90.0, 0.1)),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            registry.register(video("x", 101.0, 0.1)),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            registry.register(video("x", 90.0, -0.1)),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_register_overwrites_in_place() {
        let registry = ProviderRegistry::new();
        registry.register(video("a", 90.0, 0.1)).unwrap();
        registry.register(video("b", 80.0, 0.1)).unwrap();
        registry.register(video("a", 70.0, 0.2)).unwrap();

        let found = registry.get_provider("a").unwrap();
        assert_eq!(found.quality_score, 70.0);
        assert_eq!(
            registry
                .list_providers(Some(ProviderCategory::Video), None)
                .len(),
            2
        );
    }

    #[test]
    fn test_best_provider_satisfies_constraints() {
        let registry = test_registry();

        let best = registry
            .get_best_provider(ProviderCategory::Video, &SelectionConstraints::none())
            .unwrap();
        assert_eq!(best.id, "veo");

        let best_4k = registry
            .get_best_provider(
                ProviderCategory::Video,
                &SelectionConstraints::none().with_4k(),
            )
            .unwrap();
        assert!(best_4k.supports_4k);
        assert_eq!(best_4k.id, "veo");

        let cheap = registry
            .get_best_provider(
                ProviderCategory::Video,
                &SelectionConstraints::none().with_max_cost(0.10),
            )
            .unwrap();
        assert!(cheap.cost_per_unit <= 0.10);
        assert_eq!(cheap.id, "runway");
    }

    #[test]
    fn test_no_provider_available() {
        let registry = test_registry();
        let result = registry.get_best_provider(
            ProviderCategory::Video,
            &SelectionConstraints::none().with_4k().with_max_cost(0.01),
        );
        assert_eq!(
            result.unwrap_err(),
            RegistryError::NoProviderAvailable(ProviderCategory::Video)
        );

        // 空类别同样返回 NoProviderAvailable
        assert!(registry
            .get_best_provider(ProviderCategory::Voice, &SelectionConstraints::none())
            .is_err());
    }

    #[test]
    fn test_tie_break_by_cost_then_order() {
        let registry = ProviderRegistry::new();
        registry.register(video("pricey", 90.0, 0.10)).unwrap();
        registry.register(video("cheap", 90.0, 0.05)).unwrap();

        let best = registry
            .get_best_provider(ProviderCategory::Video, &SelectionConstraints::none())
            .unwrap();
        assert_eq!(best.id, "cheap");

        // 质量与成本都相同时按注册顺序
        let registry = ProviderRegistry::new();
        registry.register(video("first", 90.0, 0.05)).unwrap();
        registry.register(video("second", 90.0, 0.05)).unwrap();
        let best = registry
            .get_best_provider(ProviderCategory::Video, &SelectionConstraints::none())
            .unwrap();
        assert_eq!(best.id, "first");
    }

    #[test]
    fn test_prefer_native_audio_is_soft() {
        let registry = test_registry();

        // 有原生音频候选时收窄
        let best = registry
            .get_best_provider(
                ProviderCategory::Video,
                &SelectionConstraints::none().prefer_audio(),
            )
            .unwrap();
        assert!(best.supports_audio);

        // 4K 硬约束下只剩 veo/runway；偏好音频选中 veo
        let best = registry
            .get_best_provider(
                ProviderCategory::Video,
                &SelectionConstraints::none().with_4k().prefer_audio(),
            )
            .unwrap();
        assert_eq!(best.id, "veo");

        // 仅剩无音频候选时软约束不生效
        let registry = ProviderRegistry::new();
        registry.register(video("silent", 92.0, 0.08).with_4k(true)).unwrap();
        let best = registry
            .get_best_provider(
                ProviderCategory::Video,
                &SelectionConstraints::none().with_4k().prefer_audio(),
            )
            .unwrap();
        assert_eq!(best.id, "silent");
    }

    #[test]
    fn test_fallback_chain_non_increasing() {
        let registry = test_registry();
        let chain = registry
            .get_fallback_chain(ProviderCategory::Video, &SelectionConstraints::none())
            .unwrap();

        assert_eq!(chain.len(), 6);
        for pair in chain.windows(2) {
            assert!(pair[0].quality_score >= pair[1].quality_score);
        }
        // 首位即最佳 Provider
        assert_eq!(chain[0].id, "veo");
    }

    #[test]
    fn test_fallback_chain_respects_hard_constraints() {
        let registry = test_registry();
        let chain = registry
            .get_fallback_chain(
                ProviderCategory::Video,
                &SelectionConstraints::none().with_4k(),
            )
            .unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain.iter().all(|d| d.supports_4k));

        let result = registry.get_fallback_chain(
            ProviderCategory::Voice,
            &SelectionConstraints::none(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_provider_excluded() {
        let registry = ProviderRegistry::new();
        let mut descriptor = video("off", 99.0, 0.1);
        descriptor.enabled = false;
        registry.register(descriptor).unwrap();
        registry.register(video("on", 80.0, 0.1)).unwrap();

        let best = registry
            .get_best_provider(ProviderCategory::Video, &SelectionConstraints::none())
            .unwrap();
        assert_eq!(best.id, "on");
    }

    #[test]
    fn test_usage_stats_rolling_average() {
        let registry = test_registry();
        registry.record_usage("veo", 100.0, true, 1.0);
        registry.record_usage("veo", 300.0, false, 0.0);

        let stats = registry.usage_stats(Some("veo"));
        let veo = stats.get("veo").unwrap();
        assert_eq!(veo.total_requests, 2);
        assert_eq!(veo.successful_requests, 1);
        assert!((veo.avg_latency_ms - 200.0).abs() < f64::EPSILON);
        assert!((veo.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!((veo.total_cost - 1.0).abs() < f64::EPSILON);
    }

    proptest! {
        /// 任意注册集合上，降级链质量分恒单调不增
        #[test]
        fn prop_fallback_chain_monotonic(scores in proptest::collection::vec(0.0f64..=100.0, 1..20)) {
            let registry = ProviderRegistry::new();
            for (i, score) in scores.iter().enumerate() {
                registry
                    .register(video(&format!("p{i}"), *score, 0.1))
                    .unwrap();
            }
            let chain = registry
                .get_fallback_chain(ProviderCategory::Video, &SelectionConstraints::none())
                .unwrap();
            prop_assert_eq!(chain.len(), scores.len());
            for pair in chain.windows(2) {
                prop_assert!(pair[0].quality_score >= pair[1].quality_score);
            }
        }

        /// 最佳 Provider 恒满足硬约束，或返回 NoProviderAvailable
        #[test]
        fn prop_best_satisfies_constraints(
            scores in proptest::collection::vec((0.0f64..=100.0, 0.0f64..=1.0, any::<bool>()), 0..12),
            max_cost in 0.0f64..=1.0,
            requires_4k in any::<bool>(),
        ) {
            let registry = ProviderRegistry::new();
            for (i, (score, cost, has_4k)) in scores.iter().enumerate() {
                registry
                    .register(video(&format!("p{i}"), *score, *cost).with_4k(*has_4k))
                    .unwrap();
            }
            let mut constraints = SelectionConstraints::none().with_max_cost(max_cost);
            if requires_4k {
                constraints = constraints.with_4k();
            }
            match registry.get_best_provider(ProviderCategory::Video, &constraints) {
                Ok(best) => {
                    prop_assert!(constraints.satisfied_by(&best));
                }
                Err(err) => {
                    prop_assert_eq!(err, RegistryError::NoProviderAvailable(ProviderCategory::Video));
                    let any_satisfies = scores.iter().enumerate().any(|(i, _)| {
                        let d = registry.get_provider(&format!("p{i}")).unwrap();
                        constraints.satisfied_by(&d)
                    });
                    prop_assert!(!any_satisfies);
                }
            }
        }
    }
}
