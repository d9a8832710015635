//! In-memory repository for tests and local experiments.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use filedock_core::models::{FileRecord, NewFileRecord, NewUser, Uploader, User};
use filedock_core::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::files::FileRepository;
use super::users::UserRepository;

#[derive(Default)]
struct Tables {
    files: Vec<FileRecord>,
    users: HashMap<Uuid, User>,
}

/// Implements both [`FileRepository`] and [`UserRepository`] over shared
/// in-process tables with the same constraints as the SQL schema.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn file_count(&self) -> usize {
        self.tables.read().await.files.len()
    }
}

#[async_trait]
impl FileRepository for InMemoryRepository {
    async fn create(&self, new: NewFileRecord) -> Result<FileRecord, AppError> {
        let mut tables = self.tables.write().await;

        if tables
            .files
            .iter()
            .any(|f| f.storage_path == new.storage_path)
        {
            return Err(AppError::DuplicateKey(
                "Value violates files_storage_path_key".to_string(),
            ));
        }

        let uploader = match new.uploaded_by {
            Some(user_id) => match tables.users.get(&user_id) {
                Some(user) => Some(Uploader::from(user)),
                None => {
                    return Err(AppError::InvalidInput(
                        "Uploading user does not exist".to_string(),
                    ))
                }
            },
            None => None,
        };

        // Keep creation times strictly increasing so newest-first ordering is stable.
        let now = Utc::now();
        let created_at = match tables.files.iter().map(|f| f.created_at).max() {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        };

        let record = FileRecord {
            id: Uuid::new_v4(),
            original_name: new.original_name,
            stored_name: new.stored_name,
            mime_type: new.mime_type,
            size_bytes: new.size_bytes,
            category: new.category,
            storage_path: new.storage_path,
            thumbnail_path: new.thumbnail_path,
            width: new.width,
            height: new.height,
            duration: new.duration,
            uploaded_by: new.uploaded_by,
            uploader,
            created_at,
        };

        tables.files.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .files
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.files.len();
        tables.files.retain(|f| f.id != id);
        Ok(tables.files.len() < before)
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AppError> {
        let mut files = self.tables.read().await.files.clone();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn referenced_locations(&self) -> Result<HashSet<String>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .files
            .iter()
            .flat_map(|f| f.locations().map(str::to_string).collect::<Vec<_>>())
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn create(&self, new: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == new.email) {
            return Err(AppError::DuplicateKey(format!(
                "A user with email {} already exists",
                new.email
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            avatar: new.avatar,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}
