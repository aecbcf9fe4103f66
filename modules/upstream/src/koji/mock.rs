use super::{Build, BuildSystem, Rpm};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    packages: HashMap<String, i64>,
    tagged: HashMap<(String, String), Vec<Build>>,
    builds: HashMap<i64, Vec<Build>>,
    rpms: HashMap<i64, Vec<Rpm>>,
}

/// In-process stand-in for the build system hub.
#[derive(Default)]
pub struct Mock {
    state: Mutex<State>,
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_package(&self, name: &str, id: i64) {
        self.lock().packages.insert(name.to_string(), id);
    }

    pub fn put_tagged(&self, tag: &str, package: &str, builds: Vec<Build>) {
        self.lock()
            .tagged
            .insert((tag.to_string(), package.to_string()), builds);
    }

    pub fn put_builds(&self, package_id: i64, builds: Vec<Build>) {
        self.lock().builds.insert(package_id, builds);
    }

    pub fn put_rpms(&self, build_id: i64, rpms: Vec<Rpm>) {
        self.lock().rpms.insert(build_id, rpms);
    }
}

#[async_trait]
impl BuildSystem for Mock {
    async fn get_package_id(&self, name: &str) -> Result<i64, Error> {
        self.lock().packages.get(name).copied().ok_or(Error::NotFound)
    }

    async fn list_tagged(&self, tag: &str, package: &str) -> Result<Vec<Build>, Error> {
        Ok(self
            .lock()
            .tagged
            .get(&(tag.to_string(), package.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_builds(&self, package_id: i64) -> Result<Vec<Build>, Error> {
        Ok(self.lock().builds.get(&package_id).cloned().unwrap_or_default())
    }

    async fn list_rpms(&self, build_id: i64) -> Result<Vec<Rpm>, Error> {
        Ok(self.lock().rpms.get(&build_id).cloned().unwrap_or_default())
    }
}
