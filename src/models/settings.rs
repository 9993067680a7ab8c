//! 用户设置（细则配置 + 报表信息）

use super::rubric::{PerformanceType, RubricCriterion};
use serde::{Deserialize, Serialize};

/// 每个用户持久化的设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub p1_name: String,
    pub p2_name: String,
    /// 取整粒度（1 / 5 / 10）
    pub rounding_rule: u32,
    pub teacher_name: String,
    pub teacher_branch: String,
    pub principal_name: String,
    // 数组表放在最后，保证 TOML 序列化顺序合法
    pub rubrics_p1: Vec<RubricCriterion>,
    pub rubrics_p2: Vec<RubricCriterion>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            p1_name: "Derse Hazırlık ve Katılım".to_string(),
            p2_name: "Proje".to_string(),
            rounding_rule: 5,
            teacher_name: String::new(),
            teacher_branch: String::new(),
            principal_name: String::new(),
            rubrics_p1: vec![
                RubricCriterion::new("p1_1", "Hazırlıklı Gelme ve Materyal Kullanımı", 20.0),
                RubricCriterion::new("p1_2", "Derse İlgi ve Odaklanma", 20.0),
                RubricCriterion::new("p1_3", "Soru-Cevap ve Tartışmalara Katılım", 20.0),
                RubricCriterion::new("p1_4", "Bireysel ve Grupla Çalışma Becerisi", 20.0),
                RubricCriterion::new("p1_5", "Akademik Gelişim ve Uygulama", 20.0),
            ],
            rubrics_p2: vec![
                RubricCriterion::new("p2_1", "İçeriğin Doğruluğu ve Kapsamlılığı", 20.0),
                RubricCriterion::new("p2_2", "Araştırma ve Kaynak Kullanımı", 20.0),
                RubricCriterion::new("p2_3", "Düzen, Tertip ve Estetik Görünüm", 20.0),
                RubricCriterion::new("p2_4", "Özgünlük ve Yaratıcılık", 20.0),
                RubricCriterion::new("p2_5", "Zamanlama ve Teslim Süreci", 20.0),
            ],
        }
    }
}

impl AppSettings {
    pub fn rubrics(&self, perf: PerformanceType) -> &[RubricCriterion] {
        match perf {
            PerformanceType::P1 => &self.rubrics_p1,
            PerformanceType::P2 => &self.rubrics_p2,
        }
    }

    pub fn performance_name(&self, perf: PerformanceType) -> &str {
        match perf {
            PerformanceType::P1 => &self.p1_name,
            PerformanceType::P2 => &self.p2_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: AppSettings = toml::from_str(
            r#"
            rounding_rule = 10
            teacher_name = "Elif Yılmaz"
            "#,
        )
        .unwrap();

        assert_eq!(settings.rounding_rule, 10);
        assert_eq!(settings.teacher_name, "Elif Yılmaz");
        assert_eq!(settings.rubrics(PerformanceType::P1).len(), 5);
        assert_eq!(settings.performance_name(PerformanceType::P2), "Proje");
    }
}
