//! Runtime and website persistence
//!
//! JSON implementations keep whole collections in `runtimes.json` and
//! `websites.json`.

use crate::model::{Runtime, Website};
use parking_lot::Mutex;
use rtpanel_foundation::{Error, JsonStore, Result};
use std::path::PathBuf;
use tracing::debug;

pub const RUNTIMES_FILE: &str = "runtimes.json";
pub const WEBSITES_FILE: &str = "websites.json";

/// Runtime records
pub trait RuntimeRepo: Send + Sync {
    /// Assign the next id and store a new runtime
    fn create(&self, runtime: &mut Runtime) -> Result<()>;

    /// Upsert by id
    fn save(&self, runtime: &Runtime) -> Result<()>;

    fn get(&self, id: u64) -> Result<Runtime>;

    fn list(&self) -> Result<Vec<Runtime>>;
}

/// Website query filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebsiteFilter {
    pub runtime_id: Option<u64>,
}

impl WebsiteFilter {
    pub fn with_runtime_id(runtime_id: u64) -> Self {
        Self {
            runtime_id: Some(runtime_id),
        }
    }

    pub fn matches(&self, website: &Website) -> bool {
        self.runtime_id.map_or(true, |id| website.runtime_id == id)
    }
}

/// Read-only website lookups
pub trait WebsiteRepo: Send + Sync {
    fn get_by(&self, filter: &WebsiteFilter) -> Result<Vec<Website>>;
}

/// `JsonStore` backed runtime records
pub struct JsonRuntimeRepo {
    store: JsonStore,
    lock: Mutex<()>,
}

impl JsonRuntimeRepo {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(data_dir),
            lock: Mutex::new(()),
        }
    }

    fn load_all(&self) -> Result<Vec<Runtime>> {
        self.store.load_or_default(RUNTIMES_FILE)
    }
}

impl RuntimeRepo for JsonRuntimeRepo {
    fn create(&self, runtime: &mut Runtime) -> Result<()> {
        let _guard = self.lock.lock();
        let mut all = self.load_all()?;
        if all
            .iter()
            .any(|r| r.kind == runtime.kind && r.name == runtime.name)
        {
            return Err(Error::InvalidInput(format!(
                "runtime {} already exists",
                runtime.name
            )));
        }
        runtime.id = all.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        all.push(runtime.clone());
        self.store.save(RUNTIMES_FILE, &all)?;
        debug!("Created runtime {} with id {}", runtime.name, runtime.id);
        Ok(())
    }

    fn save(&self, runtime: &Runtime) -> Result<()> {
        let _guard = self.lock.lock();
        let mut all = self.load_all()?;
        match all.iter_mut().find(|r| r.id == runtime.id) {
            Some(existing) => *existing = runtime.clone(),
            None => all.push(runtime.clone()),
        }
        self.store.save(RUNTIMES_FILE, &all)
    }

    fn get(&self, id: u64) -> Result<Runtime> {
        let _guard = self.lock.lock();
        self.load_all()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("runtime {}", id)))
    }

    fn list(&self) -> Result<Vec<Runtime>> {
        let _guard = self.lock.lock();
        self.load_all()
    }
}

/// `JsonStore` backed website lookups
pub struct JsonWebsiteRepo {
    store: JsonStore,
}

impl JsonWebsiteRepo {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(data_dir),
        }
    }
}

impl WebsiteRepo for JsonWebsiteRepo {
    fn get_by(&self, filter: &WebsiteFilter) -> Result<Vec<Website>> {
        let all: Vec<Website> = self.store.load_or_default(WEBSITES_FILE)?;
        Ok(all.into_iter().filter(|w| filter.matches(w)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RuntimeStatus, RuntimeType};
    use tempfile::tempdir;

    #[test]
    fn test_create_assigns_ids() {
        let dir = tempdir().unwrap();
        let repo = JsonRuntimeRepo::new(dir.path());

        let mut a = Runtime::new("a", RuntimeType::Php, "/rt/php/a");
        let mut b = Runtime::new("b", RuntimeType::Node, "/rt/node/b");
        repo.create(&mut a).unwrap();
        repo.create(&mut b).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.list().unwrap().len(), 2);
    }

    #[test]
    fn test_create_rejects_duplicate_name_per_kind() {
        let dir = tempdir().unwrap();
        let repo = JsonRuntimeRepo::new(dir.path());

        repo.create(&mut Runtime::new("a", RuntimeType::Php, "/rt/php/a"))
            .unwrap();
        assert!(repo
            .create(&mut Runtime::new("a", RuntimeType::Php, "/rt/php/a"))
            .is_err());
        // same name under another kind directory is fine
        assert!(repo
            .create(&mut Runtime::new("a", RuntimeType::Node, "/rt/node/a"))
            .is_ok());
    }

    #[test]
    fn test_save_updates_in_place() {
        let dir = tempdir().unwrap();
        let repo = JsonRuntimeRepo::new(dir.path());
        let mut runtime = Runtime::new("a", RuntimeType::Php, "/rt/php/a");
        repo.create(&mut runtime).unwrap();

        runtime.fail("image build failed:boom");
        repo.save(&runtime).unwrap();

        let loaded = repo.get(runtime.id).unwrap();
        assert_eq!(loaded.status, RuntimeStatus::Error);
        assert_eq!(loaded.message, "image build failed:boom");
        assert_eq!(repo.list().unwrap().len(), 1);
        assert!(matches!(repo.get(99), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_website_filter() {
        let dir = tempdir().unwrap();
        let sites = vec![
            Website {
                id: 1,
                primary_domain: "a.example.com".to_string(),
                runtime_id: 7,
                app_install_id: 3,
            },
            Website {
                id: 2,
                primary_domain: "b.example.com".to_string(),
                runtime_id: 8,
                app_install_id: 4,
            },
        ];
        JsonStore::new(dir.path()).save(WEBSITES_FILE, &sites).unwrap();

        let repo = JsonWebsiteRepo::new(dir.path());
        let found = repo.get_by(&WebsiteFilter::with_runtime_id(7)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].primary_domain, "a.example.com");
        assert_eq!(repo.get_by(&WebsiteFilter::default()).unwrap().len(), 2);
    }
}
