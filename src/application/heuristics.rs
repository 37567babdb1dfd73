//! 由规则集编译出的启发式组件，启动时构建一次后在各处共享

use std::sync::Arc;

use crate::domain::character::CharacterExtractor;
use crate::domain::rules::{RuleError, RuleSet};
use crate::domain::scene::{PromptGenerator, SceneDivider};

#[derive(Debug, Clone)]
pub struct Heuristics {
    pub extractor: Arc<CharacterExtractor>,
    pub divider: Arc<SceneDivider>,
    pub prompts: Arc<PromptGenerator>,
}

impl Heuristics {
    pub fn compile(rules: &RuleSet) -> Result<Self, RuleError> {
        Ok(Self {
            extractor: Arc::new(CharacterExtractor::new(&rules.extraction)?),
            divider: Arc::new(SceneDivider::new(&rules.division)?),
            prompts: Arc::new(PromptGenerator::new(rules.prompt.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::NamePatternRule;
    use crate::domain::character::CharacterRole;

    #[test]
    fn test_builtin_rules_compile() {
        assert!(Heuristics::compile(&RuleSet::default()).is_ok());
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let mut rules = RuleSet::default();
        rules.extraction.name_patterns.push(NamePatternRule {
            pattern: "([".to_string(),
            role: CharacterRole::Minor,
        });

        assert!(matches!(
            Heuristics::compile(&rules),
            Err(RuleError::InvalidPattern { .. })
        ));
    }
}
