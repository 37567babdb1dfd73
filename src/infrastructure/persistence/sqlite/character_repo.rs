//! SQLite Character Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::{db_error, decode_json, decode_time, decode_uuid, encode_json, encode_time, DbPool};
use crate::application::ports::{CharacterRepositoryPort, RepositoryError};
use crate::domain::character::{Character, CharacterRole};

const SELECT_COLUMNS: &str = "SELECT id, novel_id, name, role, appearance, personality, description, reference_image_url, created_at, updated_at FROM characters";

/// SQLite Character Repository
///
/// 外貌与性格以 JSON 文本存储
pub struct SqliteCharacterRepository {
    pool: DbPool,
}

impl SqliteCharacterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CharacterRow {
    id: String,
    novel_id: String,
    name: String,
    role: String,
    appearance: String,
    personality: String,
    description: String,
    reference_image_url: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CharacterRow> for Character {
    type Error = RepositoryError;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        let role = CharacterRole::from_str(&row.role).ok_or_else(|| {
            RepositoryError::SerializationError(format!("unknown character role: {}", row.role))
        })?;

        Ok(Character {
            id: decode_uuid(&row.id)?,
            novel_id: decode_uuid(&row.novel_id)?,
            name: row.name,
            role,
            appearance: decode_json(&row.appearance)?,
            personality: decode_json(&row.personality)?,
            description: row.description,
            reference_image_url: row.reference_image_url,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl CharacterRepositoryPort for SqliteCharacterRepository {
    async fn save(&self, character: &Character) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO characters (id, novel_id, name, role, appearance, personality, description, reference_image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                appearance = excluded.appearance,
                personality = excluded.personality,
                description = excluded.description,
                reference_image_url = excluded.reference_image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(character.id().to_string())
        .bind(character.novel_id().to_string())
        .bind(character.name())
        .bind(character.role().as_str())
        .bind(encode_json(character.appearance())?)
        .bind(encode_json(character.personality())?)
        .bind(character.description())
        .bind(character.reference_image_url())
        .bind(encode_time(&character.created_at()))
        .bind(encode_time(&character.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Character>, RepositoryError> {
        let row: Option<CharacterRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Character::try_from).transpose()
    }

    async fn find_by_novel(&self, novel_id: Uuid) -> Result<Vec<Character>, RepositoryError> {
        let rows: Vec<CharacterRow> = sqlx::query_as(&format!(
            "{} WHERE novel_id = ? ORDER BY created_at, rowid",
            SELECT_COLUMNS
        ))
        .bind(novel_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Character::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM characters WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("character {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::character::{Appearance, Personality};
    use crate::infrastructure::persistence::sqlite::{seed_novel, test_pool};

    #[tokio::test]
    async fn test_character_round_trip_keeps_nested_fields() {
        let pool = test_pool().await;
        let novel_id = seed_novel(&pool).await.id();
        let repo = SqliteCharacterRepository::new(pool);

        let mut hero = Character::new(novel_id, "林青", CharacterRole::Main).unwrap();
        hero.set_appearance(Appearance {
            physical_traits: "黑发; 身材修长".to_string(),
            age: "二十岁".to_string(),
            ..Default::default()
        })
        .unwrap();
        hero.set_personality(Personality {
            traits: vec!["沉稳".to_string(), "寡言".to_string()],
            ..Default::default()
        });
        hero.set_reference_image("https://img.example/hero.png");
        repo.save(&hero).await.unwrap();

        let found = repo.find_by_id(hero.id()).await.unwrap().unwrap();
        assert_eq!(found.name(), "林青");
        assert_eq!(found.role(), CharacterRole::Main);
        assert_eq!(found.appearance(), hero.appearance());
        assert_eq!(found.personality().traits.len(), 2);
        assert_eq!(found.reference_image_url(), Some("https://img.example/hero.png"));
    }

    #[tokio::test]
    async fn test_find_by_novel_in_creation_order_and_delete() {
        let pool = test_pool().await;
        let novel_id = seed_novel(&pool).await.id();
        let other_novel_id = seed_novel(&pool).await.id();
        let repo = SqliteCharacterRepository::new(pool);

        let first = Character::new(novel_id, "张三", CharacterRole::Main).unwrap();
        let second = Character::new(novel_id, "李四", CharacterRole::Supporting).unwrap();
        let other = Character::new(other_novel_id, "王五", CharacterRole::Minor).unwrap();
        for c in [&first, &second, &other] {
            repo.save(c).await.unwrap();
        }

        let names: Vec<String> = repo
            .find_by_novel(novel_id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["张三", "李四"]);

        repo.delete(first.id()).await.unwrap();
        assert_eq!(repo.find_by_novel(novel_id).await.unwrap().len(), 1);
        assert!(matches!(
            repo.delete(first.id()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_without_novel_is_rejected() {
        let repo = SqliteCharacterRepository::new(test_pool().await);
        let orphan = Character::new(Uuid::new_v4(), "赵六", CharacterRole::Minor).unwrap();

        assert!(matches!(
            repo.save(&orphan).await,
            Err(RepositoryError::DatabaseError(_))
        ));
    }
}
