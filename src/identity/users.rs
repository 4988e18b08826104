//! `users.json` — the user registry, plus first-run default-user bootstrap.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;

use crate::types::{Role, User};

use super::error::IdentityError;
use super::password::{generate_password, hash_password};

pub struct UserStore {
    path: PathBuf,
    users: RwLock<BTreeMap<String, User>>,
}

impl UserStore {
    /// Loads `users.json`, or bootstraps one default user per role with a
    /// freshly generated high-entropy password. Bootstrap passwords are
    /// printed once and written to `.initial_passwords.txt`; no password is
    /// ever hard-coded.
    pub fn load_or_bootstrap(data_dir: &Path) -> Result<Self, IdentityError> {
        let path = data_dir.join("users.json");
        if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| IdentityError::Store(format!("{}: {e}", path.display())))?;
            let users: BTreeMap<String, User> = serde_json::from_str(&text)
                .map_err(|e| IdentityError::Store(format!("{}: {e}", path.display())))?;
            return Ok(Self {
                path,
                users: RwLock::new(users),
            });
        }

        let mut users = BTreeMap::new();
        let mut initial_passwords = String::new();
        for (username, role) in [
            ("operator", Role::Operator),
            ("supervisor", Role::Supervisor),
            ("admin", Role::Admin),
        ] {
            let password = generate_password();
            let password_hash = hash_password(&password)?;
            users.insert(
                username.to_string(),
                User {
                    username: username.to_string(),
                    password_hash,
                    role,
                    enabled: true,
                    created_ts: Utc::now(),
                },
            );
            println!("generated initial password for {username}: {password}");
            initial_passwords.push_str(&format!("{username}: {password}\n"));
        }

        let store = Self {
            path,
            users: RwLock::new(users),
        };
        store.persist()?;

        let passwords_path = data_dir.join(".initial_passwords.txt");
        std::fs::write(&passwords_path, initial_passwords)
            .map_err(|e| IdentityError::Store(format!("{}: {e}", passwords_path.display())))?;
        restrict_permissions(&passwords_path)?;
        tracing::warn!(
            path = %passwords_path.display(),
            "wrote initial passwords file — delete it after copying the credentials"
        );

        Ok(store)
    }

    fn persist(&self) -> Result<(), IdentityError> {
        let users = self.users.read().expect("user store lock poisoned");
        let text = serde_json::to_string_pretty(&*users)
            .map_err(|e| IdentityError::Store(e.to_string()))?;
        std::fs::write(&self.path, text)
            .map_err(|e| IdentityError::Store(format!("{}: {e}", self.path.display())))
    }

    pub fn get(&self, username: &str) -> Option<User> {
        self.users.read().expect("user store lock poisoned").get(username).cloned()
    }

    pub fn add(&self, username: &str, password: &str, role: Role) -> Result<(), IdentityError> {
        {
            let users = self.users.read().expect("user store lock poisoned");
            if users.contains_key(username) {
                return Err(IdentityError::UserExists(username.to_string()));
            }
        }
        let password_hash = hash_password(password)?;
        self.users.write().expect("user store lock poisoned").insert(
            username.to_string(),
            User {
                username: username.to_string(),
                password_hash,
                role,
                enabled: true,
                created_ts: Utc::now(),
            },
        );
        self.persist()
    }

    pub fn set_enabled(&self, username: &str, enabled: bool) -> Result<(), IdentityError> {
        {
            let mut users = self.users.write().expect("user store lock poisoned");
            let user = users
                .get_mut(username)
                .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;
            user.enabled = enabled;
        }
        self.persist()
    }

    pub fn set_password(&self, username: &str, password: &str) -> Result<(), IdentityError> {
        let password_hash = hash_password(password)?;
        {
            let mut users = self.users.write().expect("user store lock poisoned");
            let user = users
                .get_mut(username)
                .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;
            user.password_hash = password_hash;
        }
        self.persist()
    }

    pub fn list(&self) -> Vec<User> {
        self.users.read().expect("user store lock poisoned").values().cloned().collect()
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), IdentityError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| IdentityError::Store(format!("{}: {e}", path.display())))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), IdentityError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_creates_one_user_per_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::load_or_bootstrap(dir.path()).unwrap();
        let users = store.list();
        assert_eq!(users.len(), 3);
        assert!(dir.path().join(".initial_passwords.txt").exists());
    }

    #[test]
    fn reload_preserves_users() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = UserStore::load_or_bootstrap(dir.path()).unwrap();
            store.add("extra", "hunter2-hunter2", Role::Operator).unwrap();
        }
        let reopened = UserStore::load_or_bootstrap(dir.path()).unwrap();
        assert!(reopened.get("extra").is_some());
    }

    #[test]
    fn adding_duplicate_username_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::load_or_bootstrap(dir.path()).unwrap();
        assert!(matches!(
            store.add("admin", "whatever-whatever", Role::Admin),
            Err(IdentityError::UserExists(_))
        ));
    }
}
