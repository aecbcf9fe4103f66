use super::{Cve, CveDetail, SecurityApi};
use crate::Error;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use time::Date;

/// In-process stand-in for the security data API.
#[derive(Default)]
pub struct Mock {
    cves: Mutex<Vec<Cve>>,
    active_cve: Mutex<Option<CveDetail>>,
}

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cves(&self, cves: Vec<Cve>) {
        *self.cves.lock().unwrap_or_else(PoisonError::into_inner) = cves;
    }

    /// The detail returned for any `get_cve` call. `None` makes lookups fail
    /// with [`Error::NotFound`].
    pub fn set_active_cve(&self, detail: Option<CveDetail>) {
        *self.active_cve.lock().unwrap_or_else(PoisonError::into_inner) = detail;
    }
}

#[async_trait]
impl SecurityApi for Mock {
    async fn list_cves(&self, _product: &str, _after: Option<Date>) -> Result<Vec<Cve>, Error> {
        Ok(self
            .cves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn get_cve(&self, _id: &str) -> Result<CveDetail, Error> {
        self.active_cve
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NotFound)
    }
}
