use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserChanges};

/// In-process store with the same contract as the Postgres one.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    rows: Vec<User>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.rows
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

fn conflict() -> AppError {
    AppError::Conflict("email already registered".into())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.email_taken(&new.email, None) {
            return Err(conflict());
        }
        inner.last_id += 1;
        let user = User {
            id: inner.last_id,
            name: new.name,
            email: new.email,
            age: new.age,
            role: new.role,
        };
        inner.rows.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.iter().find(|u| u.id == id).cloned())
    }

    async fn search(&self, needle: Option<&str>) -> Result<Vec<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        let needle = needle.map(str::to_lowercase);
        Ok(inner
            .rows
            .iter()
            .filter(|u| match &needle {
                None => true,
                Some(n) => {
                    u.name.to_lowercase().contains(n.as_str())
                        || u.email.to_lowercase().contains(n.as_str())
                }
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner
            .rows
            .iter()
            .position(|u| u.id == id)
            .ok_or(AppError::NotFound(id))?;
        if let Some(email) = &changes.email {
            if inner.email_taken(email, Some(id)) {
                return Err(conflict());
            }
        }
        let user = &mut inner.rows[pos];
        user.apply(changes);
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner
            .rows
            .iter()
            .position(|u| u.id == id)
            .ok_or(AppError::NotFound(id))?;
        inner.rows.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            age: None,
            role: "customer".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryUserStore::default();
        let a = store.insert(new_user("A", "a@x.com")).await.unwrap();
        store.delete(a.id).await.unwrap();
        let b = store.insert(new_user("B", "b@x.com")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = MemoryUserStore::default();
        store.insert(new_user("Maria ANA", "m@x.com")).await.unwrap();
        store.insert(new_user("Bob", "b@x.com")).await.unwrap();
        let hits = store.search(Some("aNa")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Maria ANA");
    }
}
