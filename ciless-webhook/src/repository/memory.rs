//! In-memory repositories
//!
//! Stand-ins for source control and the cluster that keep everything in
//! process. The template store follows the cluster's optimistic-concurrency
//! rules and can be scripted to lose races.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ciless_core::decode::CONFIG_FILE_PATH;
use ciless_core::domain::template::BuildTemplate;
use ciless_core::dto::cluster::BuildTemplateObject;

use super::{ConfigSource, RepositoryError, TemplateRepository};

type FileKey = (String, String, String, String);

/// ConfigSource serving a fixed set of files
#[derive(Default)]
pub struct StaticConfigSource {
    files: HashMap<FileKey, Vec<u8>>,
    transport_failures: AtomicU32,
    calls: AtomicUsize,
}

impl StaticConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` as the config file of `owner/repo` at `git_ref`
    pub fn with_config(
        mut self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.files.insert(
            (
                owner.to_string(),
                repo.to_string(),
                CONFIG_FILE_PATH.to_string(),
                git_ref.to_string(),
            ),
            content.into(),
        );
        self
    }

    /// Fail the next `count` reads with a transport error
    pub fn failing_first(self, count: u32) -> Self {
        self.transport_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Number of reads attempted so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn get_file_at_ref(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .transport_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(RepositoryError::Transport(
                "connection reset by peer".to_string(),
            ));
        }

        let key = (
            owner.to_string(),
            repo.to_string(),
            path.to_string(),
            git_ref.to_string(),
        );
        self.files.get(&key).cloned().ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
struct TemplateStore {
    objects: HashMap<String, BuildTemplateObject>,
    last_version: u64,
    /// Updates still scripted to lose a race against another writer
    pending_conflicts: u32,
    /// Whether the next create races with another creator
    race_next_create: bool,
    /// Creates still scripted to hit a rival that is deleted right after
    vanishing_rivals: u32,
    /// Whether the template is deleted just before the next update
    delete_before_update: bool,
}

impl TemplateStore {
    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }
}

/// TemplateRepository holding templates in a map
///
/// Writes assign monotonically increasing resource versions. An update
/// whose body matches the stored spec keeps the current version, like the
/// cluster does for no-op writes.
pub struct InMemoryTemplateRepository {
    namespace: String,
    store: Mutex<TemplateStore>,
    gets: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryTemplateRepository {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            store: Mutex::new(TemplateStore::default()),
            gets: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TemplateStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` updates lose to a concurrent writer
    ///
    /// Each losing update bumps the stored version before failing, exactly
    /// what another replica writing in between would cause.
    pub fn conflict_next_updates(&self, count: u32) {
        self.lock().pending_conflicts = count;
    }

    /// Make the next create lose to a concurrent creator
    pub fn race_next_create(&self) {
        self.lock().race_next_create = true;
    }

    /// Make the next `count` creates fail with AlreadyExists while leaving
    /// nothing stored, as if a rival was created and deleted in between
    pub fn vanishing_rivals(&self, count: u32) {
        self.lock().vanishing_rivals = count;
    }

    /// Delete the template right before the next update reaches it
    pub fn delete_before_next_update(&self) {
        self.lock().delete_before_update = true;
    }

    /// Current stored copy of a template
    pub fn stored(&self, name: &str) -> Option<BuildTemplateObject> {
        self.lock().objects.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Total calls of any kind
    pub fn calls(&self) -> usize {
        self.get_calls() + self.create_calls() + self.update_calls()
    }
}

impl Default for InMemoryTemplateRepository {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn get(&self, name: &str) -> Result<BuildTemplateObject, RepositoryError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.stored(name).ok_or(RepositoryError::NotFound)
    }

    async fn create(
        &self,
        template: &BuildTemplate,
    ) -> Result<BuildTemplateObject, RepositoryError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut store = self.lock();
        let name = template.identity.as_str().to_string();

        if store.vanishing_rivals > 0 {
            store.vanishing_rivals -= 1;
            return Err(RepositoryError::AlreadyExists);
        }

        if std::mem::take(&mut store.race_next_create) {
            let mut rival = template.to_object(&self.namespace);
            rival.spec.steps.clear();
            rival.metadata.resource_version = Some(store.next_version());
            store.objects.insert(name.clone(), rival);
        }

        if store.objects.contains_key(&name) {
            return Err(RepositoryError::AlreadyExists);
        }

        let mut object = template.to_object(&self.namespace);
        object.metadata.resource_version = Some(store.next_version());
        store.objects.insert(name, object.clone());

        Ok(object)
    }

    async fn update(
        &self,
        template: &BuildTemplate,
    ) -> Result<BuildTemplateObject, RepositoryError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut store = self.lock();
        let name = template.identity.as_str();

        if std::mem::take(&mut store.delete_before_update) {
            store.objects.remove(name);
        }

        if !store.objects.contains_key(name) {
            return Err(RepositoryError::NotFound);
        }

        if store.pending_conflicts > 0 {
            store.pending_conflicts -= 1;
            let version = store.next_version();
            if let Some(current) = store.objects.get_mut(name) {
                current.metadata.resource_version = Some(version);
            }
            return Err(RepositoryError::Conflict);
        }

        let current_version = store
            .objects
            .get(name)
            .and_then(|current| current.metadata.resource_version.clone());
        if template.resource_version != current_version {
            return Err(RepositoryError::Conflict);
        }

        let mut object = template.to_object(&self.namespace);
        let unchanged = store
            .objects
            .get(name)
            .is_some_and(|current| current.spec == object.spec);
        object.metadata.resource_version = if unchanged {
            current_version
        } else {
            Some(store.next_version())
        };
        store.objects.insert(name.to_string(), object.clone());

        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciless_core::domain::build::{BuildSpec, BuildStep};
    use ciless_core::template::TemplateBuilder;

    fn template(image: &str) -> BuildTemplate {
        let spec = BuildSpec::new(vec![BuildStep::new("build", image, ["make"])]).unwrap();
        TemplateBuilder::default().build("octo/app", "main", &spec)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = InMemoryTemplateRepository::default();
        let created = repo.create(&template("gcc:13")).await.unwrap();
        let fetched = repo.get(&created.metadata.name).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.metadata.resource_version.as_deref(), Some("1"));
        assert_eq!(
            repo.create(&template("gcc:13")).await.unwrap_err(),
            RepositoryError::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_update_requires_current_version() {
        let repo = InMemoryTemplateRepository::default();
        repo.create(&template("gcc:13")).await.unwrap();

        let stale = template("gcc:14").with_resource_version(Some("0".to_string()));
        assert_eq!(repo.update(&stale).await.unwrap_err(), RepositoryError::Conflict);

        let current = template("gcc:14").with_resource_version(Some("1".to_string()));
        let stored = repo.update(&current).await.unwrap();
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_noop_update_keeps_version() {
        let repo = InMemoryTemplateRepository::default();
        repo.create(&template("gcc:13")).await.unwrap();

        let same = template("gcc:13").with_resource_version(Some("1".to_string()));
        let stored = repo.update(&same).await.unwrap();
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = InMemoryTemplateRepository::default();
        let err = repo.update(&template("gcc:13")).await.unwrap_err();
        assert_eq!(err, RepositoryError::NotFound);
    }

    #[tokio::test]
    async fn test_static_source_failures_then_content() {
        let source = StaticConfigSource::new()
            .with_config("octo", "app", "main", "steps: []")
            .failing_first(1);

        let first = source
            .get_file_at_ref("octo", "app", CONFIG_FILE_PATH, "main")
            .await;
        assert!(matches!(first, Err(RepositoryError::Transport(_))));

        let second = source
            .get_file_at_ref("octo", "app", CONFIG_FILE_PATH, "main")
            .await
            .unwrap();
        assert_eq!(second, b"steps: []");

        let other = source
            .get_file_at_ref("octo", "app", CONFIG_FILE_PATH, "dev")
            .await;
        assert_eq!(other, Err(RepositoryError::NotFound));
        assert_eq!(source.calls(), 3);
    }
}
