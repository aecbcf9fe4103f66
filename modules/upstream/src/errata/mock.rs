use super::{CompactErrata, Errata, ErrataScraper};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;

/// In-process stand-in for the errata portal.
#[derive(Default)]
pub struct Mock {
    advisories: Mutex<Vec<CompactErrata>>,
    errata: Mutex<HashMap<String, Errata>>,
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_advisories(&self, advisories: Vec<CompactErrata>) {
        *self
            .advisories
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = advisories;
    }

    pub fn put_errata(&self, name: &str, errata: Errata) {
        self.errata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), errata);
    }
}

#[async_trait]
impl ErrataScraper for Mock {
    async fn get_advisories(
        &self,
        _version: &str,
        after: Option<OffsetDateTime>,
    ) -> Result<Vec<CompactErrata>, Error> {
        Ok(self
            .advisories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|advisory| match (after, advisory.published_at()) {
                (Some(after), Some(published)) => published > after,
                _ => true,
            })
            .cloned()
            .collect())
    }

    async fn get_errata(&self, name: &str) -> Result<Errata, Error> {
        self.errata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or(Error::NotFound)
    }
}
