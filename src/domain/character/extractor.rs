//! 角色提取器
//!
//! 基于规则表的启发式提取:
//! 1. 逐行应用人名模式，得到候选名及角色强度
//! 2. 同一行同时出现候选名与外貌关键词时，记录包含两者的第一个句子
//! 3. 按全文出现次数排序，过滤低频候选，并调整排名靠前者的角色

use regex::Regex;
use std::collections::HashMap;

use super::CharacterRole;
use crate::domain::rules::{compile, ExtractionRules, RuleError};

/// 句子分隔符
const SENTENCE_DELIMITERS: &[char] = &['。', '！', '？', '!', '?', '…'];

/// 提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCharacter {
    pub name: String,
    pub role: CharacterRole,
    /// 外貌片段（按出现顺序，去重）
    pub appearances: Vec<String>,
    /// 在全文中的出现次数
    pub occurrences: usize,
}

impl ExtractedCharacter {
    /// 外貌片段以 "; " 连接
    pub fn physical_traits(&self) -> String {
        self.appearances.join("; ")
    }
}

/// 角色提取器（规则编译一次，可重复使用）
#[derive(Debug, Clone)]
pub struct CharacterExtractor {
    patterns: Vec<(Regex, CharacterRole)>,
    rules: ExtractionRules,
}

impl CharacterExtractor {
    pub fn new(rules: &ExtractionRules) -> Result<Self, RuleError> {
        let patterns = rules
            .name_patterns
            .iter()
            .map(|rule| Ok((compile(&rule.pattern)?, rule.role)))
            .collect::<Result<Vec<_>, RuleError>>()?;

        Ok(Self {
            patterns,
            rules: rules.clone(),
        })
    }

    /// 从全文提取角色，结果按出现次数降序
    pub fn extract(&self, content: &str) -> Vec<ExtractedCharacter> {
        // 保持首次发现的顺序，使同频候选的排序稳定
        let mut candidates: Vec<ExtractedCharacter> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            for (regex, role) in &self.patterns {
                for caps in regex.captures_iter(line) {
                    let Some(name) = caps.get(1).map(|m| m.as_str().trim()) else {
                        continue;
                    };
                    if !self.is_valid_name(name) {
                        continue;
                    }

                    match index.get(name) {
                        Some(&i) => {
                            let existing = &mut candidates[i];
                            existing.role = existing.role.stronger(*role);
                        }
                        None => {
                            index.insert(name.to_string(), candidates.len());
                            candidates.push(ExtractedCharacter {
                                name: name.to_string(),
                                role: *role,
                                appearances: Vec::new(),
                                occurrences: 0,
                            });
                        }
                    }
                }
            }

            self.collect_appearances(line, &mut candidates);
        }

        self.rank(candidates, content)
    }

    fn collect_appearances(&self, line: &str, candidates: &mut [ExtractedCharacter]) {
        for candidate in candidates.iter_mut() {
            if !line.contains(candidate.name.as_str()) {
                continue;
            }

            for keyword in &self.rules.appearance_keywords {
                if keyword.is_empty() || !line.contains(keyword.as_str()) {
                    continue;
                }

                let fragment = split_sentences(line).into_iter().find(|sentence| {
                    sentence.contains(candidate.name.as_str()) && sentence.contains(keyword.as_str())
                });

                if let Some(fragment) = fragment {
                    if !candidate.appearances.iter().any(|a| a == fragment) {
                        candidate.appearances.push(fragment.to_string());
                    }
                }
            }
        }
    }

    fn rank(&self, mut candidates: Vec<ExtractedCharacter>, content: &str) -> Vec<ExtractedCharacter> {
        for candidate in candidates.iter_mut() {
            candidate.occurrences = content.matches(candidate.name.as_str()).count();
        }

        candidates.retain(|c| c.occurrences >= self.rules.min_occurrences);
        candidates.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

        if let Some(first) = candidates.first_mut() {
            first.role = CharacterRole::Main;
        }

        for candidate in candidates
            .iter_mut()
            .skip(1)
            .take(self.rules.supporting_slots)
        {
            candidate.role = candidate.role.stronger(CharacterRole::Supporting);
        }

        candidates
    }

    fn is_valid_name(&self, name: &str) -> bool {
        let len = name.chars().count();
        if !(2..=4).contains(&len) {
            return false;
        }
        if !name.chars().all(|c| ('\u{4E00}'..='\u{9FA5}').contains(&c)) {
            return false;
        }
        !self.rules.stop_words.iter().any(|w| w == name)
    }
}

/// 先按换行再按句末标点切分，丢弃空白片段
fn split_sentences(text: &str) -> Vec<&str> {
    text.split('\n')
        .flat_map(|paragraph| paragraph.split(SENTENCE_DELIMITERS))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
