//! Character Command Handlers

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::commands::{ExtractCharacters, MergeCharacters, UpdateCharacter};
use crate::application::error::ApplicationError;
use crate::application::ports::CharacterRepositoryPort;
use crate::domain::character::{Appearance, Character, CharacterExtractor};

// ============================================================================
// ExtractCharacters
// ============================================================================

/// ExtractCharacters Handler - 提取并保存新角色
///
/// 已存在的同名角色会被跳过；查询或保存失败时整批中止
pub struct ExtractCharactersHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
    extractor: Arc<CharacterExtractor>,
}

impl ExtractCharactersHandler {
    pub fn new(
        character_repo: Arc<dyn CharacterRepositoryPort>,
        extractor: Arc<CharacterExtractor>,
    ) -> Self {
        Self {
            character_repo,
            extractor,
        }
    }

    /// 返回本次新建的角色
    pub async fn handle(&self, command: ExtractCharacters) -> Result<Vec<Character>, ApplicationError> {
        let extracted = self.extractor.extract(&command.content);

        let existing: HashSet<String> = self
            .character_repo
            .find_by_novel(command.novel_id)
            .await?
            .into_iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut created = Vec::new();
        for candidate in extracted {
            if existing.contains(&candidate.name) {
                continue;
            }

            let mut character = match Character::new(command.novel_id, &candidate.name, candidate.role) {
                Ok(character) => character,
                Err(e) => {
                    tracing::debug!(name = %candidate.name, error = %e, "Skipping invalid candidate");
                    continue;
                }
            };

            if !candidate.appearances.is_empty() {
                character
                    .set_appearance(Appearance {
                        physical_traits: candidate.physical_traits(),
                        ..Default::default()
                    })
                    .map_err(|e| ApplicationError::internal(e.to_string()))?;
            }

            self.character_repo.save(&character).await?;
            created.push(character);
        }

        tracing::info!(
            novel_id = %command.novel_id,
            created = created.len(),
            skipped_existing = existing.len(),
            "Characters extracted"
        );

        Ok(created)
    }
}

// ============================================================================
// MergeCharacters
// ============================================================================

/// MergeCharacters Handler
pub struct MergeCharactersHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl MergeCharactersHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    /// 返回合并后的目标角色
    pub async fn handle(&self, command: MergeCharacters) -> Result<Character, ApplicationError> {
        if command.source_id == command.target_id {
            return Err(ApplicationError::validation("cannot merge a character into itself"));
        }

        let source = self
            .character_repo
            .find_by_id(command.source_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Character", command.source_id))?;
        let mut target = self
            .character_repo
            .find_by_id(command.target_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Character", command.target_id))?;

        if source.novel_id() != command.novel_id || target.novel_id() != command.novel_id {
            return Err(ApplicationError::business_rule(
                "characters must belong to the same novel",
            ));
        }

        target
            .absorb(&source)
            .map_err(|e| ApplicationError::business_rule(e.to_string()))?;

        self.character_repo.save(&target).await?;
        self.character_repo.delete(source.id()).await?;

        tracing::info!(
            novel_id = %command.novel_id,
            source = %source.name(),
            target = %target.name(),
            "Characters merged"
        );

        Ok(target)
    }
}

// ============================================================================
// UpdateCharacter
// ============================================================================

/// UpdateCharacter Handler - 手动编辑
pub struct UpdateCharacterHandler {
    character_repo: Arc<dyn CharacterRepositoryPort>,
}

impl UpdateCharacterHandler {
    pub fn new(character_repo: Arc<dyn CharacterRepositoryPort>) -> Self {
        Self { character_repo }
    }

    pub async fn handle(&self, command: UpdateCharacter) -> Result<Character, ApplicationError> {
        let mut character = self
            .character_repo
            .find_by_id(command.character_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Character", command.character_id))?;

        if let Some(appearance) = command.appearance {
            character
                .set_appearance(appearance)
                .map_err(|e| ApplicationError::validation(e.to_string()))?;
        }
        if let Some(personality) = command.personality {
            character.set_personality(personality);
        }
        if let Some(description) = command.description {
            character.set_description(&description);
        }
        if let Some(role) = command.role {
            character.set_role(role);
        }

        character
            .validate()
            .map_err(|e| ApplicationError::validation(e.to_string()))?;
        self.character_repo.save(&character).await?;

        tracing::debug!(character_id = %character.id(), "Character updated");
        Ok(character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::fault::FaultyCharacterRepository;
    use crate::domain::character::CharacterRole;
    use crate::domain::rules::RuleSet;
    use crate::infrastructure::persistence::sqlite::{seed_novel, test_pool, SqliteCharacterRepository};
    use uuid::Uuid;

    fn dialogue_text() -> String {
        let mut text = "张三说：\"走吧。\"\n".repeat(3);
        text.push_str(&"李四说：\"好的。\"\n".repeat(3));
        text
    }

    fn extractor() -> Arc<CharacterExtractor> {
        Arc::new(CharacterExtractor::new(&RuleSet::default().extraction).unwrap())
    }

    async fn repo_with_novel() -> (Arc<SqliteCharacterRepository>, Uuid) {
        let pool = test_pool().await;
        let novel_id = seed_novel(&pool).await.id();
        (Arc::new(SqliteCharacterRepository::new(pool)), novel_id)
    }

    #[tokio::test]
    async fn test_extract_skips_existing_names() {
        let (repo, novel_id) = repo_with_novel().await;
        let existing = Character::new(novel_id, "张三", CharacterRole::Minor).unwrap();
        repo.save(&existing).await.unwrap();

        let handler = ExtractCharactersHandler::new(repo.clone(), extractor());
        let created = handler
            .handle(ExtractCharacters {
                novel_id,
                content: dialogue_text(),
            })
            .await
            .unwrap();

        let names: Vec<&str> = created.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["李四"]);
        assert_eq!(repo.find_by_novel(novel_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_extract_aborts_on_save_error() {
        let (repo, novel_id) = repo_with_novel().await;
        let faulty = Arc::new(FaultyCharacterRepository::new(repo.clone()).fail_saves_from(1));

        let result = ExtractCharactersHandler::new(faulty, extractor())
            .handle(ExtractCharacters {
                novel_id,
                content: dialogue_text(),
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::RepositoryError(_))));
        assert!(repo.find_by_novel(novel_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_aborts_when_existing_lookup_fails() {
        let (repo, novel_id) = repo_with_novel().await;
        let faulty = Arc::new(FaultyCharacterRepository::new(repo.clone()).fail_reads());

        let result = ExtractCharactersHandler::new(faulty, extractor())
            .handle(ExtractCharacters {
                novel_id,
                content: dialogue_text(),
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::RepositoryError(_))));
        assert!(repo.find_by_novel(novel_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_fills_target_and_deletes_source() {
        let (repo, novel_id) = repo_with_novel().await;
        let mut source = Character::new(novel_id, "小张", CharacterRole::Main).unwrap();
        source
            .set_appearance(Appearance {
                physical_traits: "黑发".to_string(),
                ..Default::default()
            })
            .unwrap();
        source.set_description("镖局少东家");
        let target = Character::new(novel_id, "张三", CharacterRole::Minor).unwrap();
        repo.save(&source).await.unwrap();
        repo.save(&target).await.unwrap();

        let merged = MergeCharactersHandler::new(repo.clone())
            .handle(MergeCharacters {
                novel_id,
                source_id: source.id(),
                target_id: target.id(),
            })
            .await
            .unwrap();

        assert_eq!(merged.id(), target.id());
        assert_eq!(merged.role(), CharacterRole::Main);
        assert_eq!(merged.appearance().physical_traits, "黑发");
        assert_eq!(merged.description(), "镖局少东家");
        assert!(repo.find_by_id(source.id()).await.unwrap().is_none());

        let stored = repo.find_by_id(target.id()).await.unwrap().unwrap();
        assert_eq!(stored.appearance().physical_traits, "黑发");
    }

    #[tokio::test]
    async fn test_merge_across_novels_is_rejected() {
        let pool = test_pool().await;
        let novel_id = seed_novel(&pool).await.id();
        let other_novel_id = seed_novel(&pool).await.id();
        let repo = Arc::new(SqliteCharacterRepository::new(pool));

        let source = Character::new(other_novel_id, "李四", CharacterRole::Minor).unwrap();
        let target = Character::new(novel_id, "张三", CharacterRole::Main).unwrap();
        repo.save(&source).await.unwrap();
        repo.save(&target).await.unwrap();

        let result = MergeCharactersHandler::new(repo.clone())
            .handle(MergeCharacters {
                novel_id,
                source_id: source.id(),
                target_id: target.id(),
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::BusinessRuleViolation(_))));
        assert!(repo.find_by_id(source.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_merge_into_itself_is_rejected() {
        let (repo, novel_id) = repo_with_novel().await;
        let character = Character::new(novel_id, "张三", CharacterRole::Main).unwrap();
        repo.save(&character).await.unwrap();

        let result = MergeCharactersHandler::new(repo)
            .handle(MergeCharacters {
                novel_id,
                source_id: character.id(),
                target_id: character.id(),
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_empty_appearance() {
        let (repo, novel_id) = repo_with_novel().await;
        let mut character = Character::new(novel_id, "张三", CharacterRole::Main).unwrap();
        character
            .set_appearance(Appearance {
                age: "二十岁".to_string(),
                ..Default::default()
            })
            .unwrap();
        repo.save(&character).await.unwrap();

        let result = UpdateCharacterHandler::new(repo.clone())
            .handle(UpdateCharacter {
                character_id: character.id(),
                description: Some("改过的描述".to_string()),
                appearance: Some(Appearance::default()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        let stored = repo.find_by_id(character.id()).await.unwrap().unwrap();
        assert_eq!(stored.appearance().age, "二十岁");
        assert_eq!(stored.description(), "");
    }

    #[tokio::test]
    async fn test_update_applies_changes() {
        let (repo, novel_id) = repo_with_novel().await;
        let character = Character::new(novel_id, "李四", CharacterRole::Minor).unwrap();
        repo.save(&character).await.unwrap();

        let updated = UpdateCharacterHandler::new(repo.clone())
            .handle(UpdateCharacter {
                character_id: character.id(),
                role: Some(CharacterRole::Supporting),
                appearance: Some(Appearance {
                    clothing_style: "青色长衫".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.role(), CharacterRole::Supporting);
        let stored = repo.find_by_id(character.id()).await.unwrap().unwrap();
        assert_eq!(stored.appearance().clothing_style, "青色长衫");
    }
}
