use crate::backend::{Backend, Query};
use crate::models::{Course, CourseUpdate, Lesson, LessonFilter};
use atrium::domain::CacheConfig;
use atrium::ports::StorageFactory;
use atrium::{CacheKey, CacheRegistry, ReadThroughCache};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use storage_engine::DefaultStorageFactory;
use tracing::info;

const COURSES: &str = "courses";
const LESSONS: &str = "lessons";

/// The caches behind the education data-access layer, one per payload type.
#[derive(Clone, Debug)]
pub struct EducationCaches {
    pub course_lists: ReadThroughCache<Vec<Course>>,
    pub courses: ReadThroughCache<Course>,
    pub lessons: ReadThroughCache<Vec<Lesson>>,
}

impl EducationCaches {
    pub fn new(default_ttl: Duration, max_entries: Option<u64>) -> Self {
        Self {
            course_lists: build_cache("course_lists", default_ttl, max_entries),
            courses: build_cache("courses", default_ttl, max_entries),
            lessons: build_cache("lessons", default_ttl, max_entries),
        }
    }

    pub fn register(&self, registry: &CacheRegistry) {
        registry.register(Arc::new(self.course_lists.clone()));
        registry.register(Arc::new(self.courses.clone()));
        registry.register(Arc::new(self.lessons.clone()));
    }

    pub fn clear(&self) {
        self.course_lists.clear();
        self.courses.clear();
        self.lessons.clear();
    }
}

fn build_cache<V>(name: &str, default_ttl: Duration, max_entries: Option<u64>) -> ReadThroughCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    let config = CacheConfig::new(name, default_ttl).with_max_entries(max_entries);
    let store = DefaultStorageFactory::<V>::new().create_from_config(&config);
    ReadThroughCache::new(config, store)
}

fn course_list_key() -> Result<CacheKey> {
    CacheKey::simple(COURSES)
}

fn course_key(id: i64) -> Result<CacheKey> {
    CacheKey::simple(&format!("course_{id}"))
}

fn lessons_key(filter: &LessonFilter) -> Result<CacheKey> {
    CacheKey::compose(LESSONS, filter)
}

/// Decode every row or fail; a partially valid payload is never returned.
fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| Error::MalformedPayload(format!("{table}: {e}")))
}

fn decode_single<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<T> {
    decode_rows(table, rows)?.into_iter().next().ok_or(Error::NotFound)
}

/// Cached reads and invalidating writes over courses and lessons.
pub struct EducationRepository {
    backend: Arc<dyn Backend>,
    caches: EducationCaches,
}

impl EducationRepository {
    pub fn new(backend: Arc<dyn Backend>, caches: EducationCaches) -> Self {
        Self { backend, caches }
    }

    pub fn caches(&self) -> &EducationCaches {
        &self.caches
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        let key = course_list_key()?;
        let backend = Arc::clone(&self.backend);
        self.caches
            .course_lists
            .get_default(&key, move || async move {
                let rows = backend.select(COURSES, &Query::new().order("id")).await?;
                decode_rows(COURSES, rows)
            })
            .await
    }

    pub async fn get_course(&self, id: i64) -> Result<Course> {
        let key = course_key(id)?;
        let backend = Arc::clone(&self.backend);
        self.caches
            .courses
            .get_default(&key, move || async move {
                let rows = backend.select(COURSES, &Query::new().eq("id", id)).await?;
                decode_single(COURSES, rows)
            })
            .await
    }

    pub async fn list_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        let filter = LessonFilter { course_id };
        let key = lessons_key(&filter)?;
        let backend = Arc::clone(&self.backend);
        self.caches
            .lessons
            .get_default(&key, move || async move {
                let query = Query::new().eq("course_id", filter.course_id).order("position");
                let rows = backend.select(LESSONS, &query).await?;
                decode_rows(LESSONS, rows)
            })
            .await
    }

    /// Write through to the backend, then drop the cached course and list.
    ///
    /// The caches are dropped once the backend accepts the write, even if its
    /// response turns out to be unreadable.
    pub async fn update_course(&self, id: i64, update: &CourseUpdate) -> Result<Course> {
        if update.is_empty() {
            return self.get_course(id).await;
        }
        let course_key = course_key(id)?;
        let list_key = course_list_key()?;
        let patch = serde_json::to_value(update).map_err(|e| Error::Internal(e.to_string()))?;
        let rows = self.backend.update(COURSES, id, patch).await?;

        self.caches.courses.invalidate(&course_key);
        self.caches.course_lists.invalidate(&list_key);
        info!("Course {} updated", id);

        decode_single(COURSES, rows)
    }

    /// Drop everything cached, e.g. on logout.
    pub fn clear(&self) {
        self.caches.clear();
    }
}
