//! Postgres backed store.

use crate::{
    Access, Error, NewAdvisory, NewAffectedProduct, NewBuildReference, NewCve, NewFix, Store,
    Transaction,
};
use apollo_common::db::Database;
use apollo_entity::{
    advisory, advisory_cve, advisory_fix, advisory_reference, advisory_rpm, affected_product,
    build_reference, cve, fix, ignored_upstream_package, mirror_state, product, short_code,
};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, TransactionTrait,
};
use time::OffsetDateTime;

/// Runs operations either directly on a connection or inside a transaction,
/// depending on the connection type it wraps.
pub struct Pg<C> {
    conn: C,
}

pub type PgStore = Pg<DatabaseConnection>;

impl PgStore {
    pub fn new(db: &Database) -> Self {
        Self {
            conn: (**db).clone(),
        }
    }
}

#[async_trait]
impl<C> Access for Pg<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn get_all_short_codes(&self) -> Result<Vec<short_code::Model>, Error> {
        Ok(short_code::Entity::find().all(&self.conn).await?)
    }

    async fn get_short_code(&self, code: &str) -> Result<short_code::Model, Error> {
        short_code::Entity::find_by_id(code)
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn get_products_by_short_code(
        &self,
        code: &str,
    ) -> Result<Vec<product::Model>, Error> {
        Ok(product::Entity::find()
            .filter(product::Column::ShortCode.eq(code))
            .all(&self.conn)
            .await?)
    }

    async fn get_product_by_name_and_short_code(
        &self,
        name: &str,
        code: &str,
    ) -> Result<product::Model, Error> {
        product::Entity::find()
            .filter(product::Column::Name.eq(name))
            .filter(product::Column::ShortCode.eq(code))
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn get_product_by_id(&self, id: i64) -> Result<product::Model, Error> {
        product::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn get_all_cves(&self) -> Result<Vec<cve::Model>, Error> {
        Ok(cve::Entity::find().all(&self.conn).await?)
    }

    async fn get_all_unresolved_cves(&self) -> Result<Vec<cve::Model>, Error> {
        Ok(cve::Entity::find()
            .filter(cve::Column::State.is_in([cve::State::NewFromUpstream, cve::State::NewOriginal]))
            .all(&self.conn)
            .await?)
    }

    async fn get_cves_with_all_products_fixed(&self) -> Result<Vec<cve::Model>, Error> {
        let candidates = cve::Entity::find()
            .filter(cve::Column::State.is_in([
                cve::State::NewFromUpstream,
                cve::State::NewOriginal,
                cve::State::ResolvedUpstream,
            ]))
            .find_with_related(affected_product::Entity)
            .all(&self.conn)
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|(_, products)| {
                !products.is_empty() && products.iter().all(|p| p.state.is_post_upstream())
            })
            .map(|(cve, _)| cve)
            .collect())
    }

    async fn get_cve_by_id(&self, id: &str) -> Result<cve::Model, Error> {
        cve::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn create_cve(&self, new: NewCve) -> Result<cve::Model, Error> {
        Ok(cve::ActiveModel {
            id: Set(new.id),
            state: Set(new.state),
            short_code: Set(new.short_code),
            source_by: Set(new.source_by),
            source_link: Set(new.source_link),
            advisory_id: Set(None),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?)
    }

    async fn update_cve_state(&self, id: &str, state: cve::State) -> Result<(), Error> {
        let result = cve::Entity::update_many()
            .set(cve::ActiveModel {
                state: Set(state),
                ..Default::default()
            })
            .filter(cve::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn get_all_affected_products_by_cve(
        &self,
        cve_id: &str,
    ) -> Result<Vec<affected_product::Model>, Error> {
        Ok(affected_product::Entity::find()
            .filter(affected_product::Column::CveId.eq(cve_id))
            .all(&self.conn)
            .await?)
    }

    async fn get_affected_product_by_cve_and_package(
        &self,
        cve_id: &str,
        package: &str,
    ) -> Result<affected_product::Model, Error> {
        affected_product::Entity::find()
            .filter(affected_product::Column::CveId.eq(cve_id))
            .filter(affected_product::Column::Package.eq(package))
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn get_affected_product_by_advisory(
        &self,
        advisory: &str,
    ) -> Result<affected_product::Model, Error> {
        affected_product::Entity::find()
            .filter(affected_product::Column::Advisory.eq(advisory))
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn create_affected_product(
        &self,
        new: NewAffectedProduct,
    ) -> Result<affected_product::Model, Error> {
        Ok(affected_product::ActiveModel {
            product_id: Set(new.product_id),
            cve_id: Set(new.cve_id),
            state: Set(new.state),
            version: Set(new.version),
            package: Set(new.package),
            advisory: Set(new.advisory),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?)
    }

    async fn update_affected_product(
        &self,
        id: i64,
        state: affected_product::State,
        package: &str,
        advisory: Option<String>,
    ) -> Result<(), Error> {
        let result = affected_product::Entity::update_many()
            .set(affected_product::ActiveModel {
                state: Set(state),
                package: Set(package.to_string()),
                advisory: Set(advisory),
                ..Default::default()
            })
            .filter(affected_product::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn delete_affected_product(&self, id: i64) -> Result<(), Error> {
        let result = affected_product::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn create_build_reference(
        &self,
        new: NewBuildReference,
    ) -> Result<build_reference::Model, Error> {
        Ok(build_reference::ActiveModel {
            affected_product_id: Set(new.affected_product_id),
            rpm: Set(new.rpm),
            src_rpm: Set(new.src_rpm),
            cve_id: Set(new.cve_id),
            build_id: Set(new.build_id),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?)
    }

    async fn get_advisory_by_code_and_year_and_num(
        &self,
        code: &str,
        year: i32,
        num: i32,
    ) -> Result<advisory::Model, Error> {
        advisory::Entity::find()
            .filter(advisory::Column::ShortCode.eq(code))
            .filter(advisory::Column::Year.eq(year))
            .filter(advisory::Column::Num.eq(num))
            .one(&self.conn)
            .await?
            .ok_or(Error::NotFound)
    }

    async fn create_advisory(&self, new: NewAdvisory) -> Result<advisory::Model, Error> {
        Ok(advisory::ActiveModel {
            short_code: Set(new.short_code),
            year: Set(new.year),
            num: Set(new.num),
            kind: Set(new.kind),
            severity: Set(new.severity),
            synopsis: Set(new.synopsis),
            topic: Set(new.topic),
            description: Set(new.description),
            solution: Set(new.solution),
            upstream_issued_at: Set(new.upstream_issued_at),
            published_at: Set(new.published_at),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?)
    }

    async fn update_advisory(
        &self,
        id: i64,
        new: NewAdvisory,
    ) -> Result<advisory::Model, Error> {
        Ok(advisory::ActiveModel {
            id: Set(id),
            short_code: Set(new.short_code),
            year: Set(new.year),
            num: Set(new.num),
            kind: Set(new.kind),
            severity: Set(new.severity),
            synopsis: Set(new.synopsis),
            topic: Set(new.topic),
            description: Set(new.description),
            solution: Set(new.solution),
            upstream_issued_at: Set(new.upstream_issued_at),
            published_at: Set(new.published_at),
            ..Default::default()
        }
        .update(&self.conn)
        .await?)
    }

    async fn create_fix(&self, new: NewFix) -> Result<fix::Model, Error> {
        Ok(fix::ActiveModel {
            ticket: Set(new.ticket),
            source_by: Set(new.source_by),
            source_link: Set(new.source_link),
            description: Set(new.description),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?)
    }

    async fn create_advisory_reference(&self, advisory_id: i64, url: &str) -> Result<(), Error> {
        advisory_reference::ActiveModel {
            advisory_id: Set(advisory_id),
            url: Set(url.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(())
    }

    async fn add_advisory_cve(&self, advisory_id: i64, cve_id: &str) -> Result<(), Error> {
        let result = advisory_cve::ActiveModel {
            advisory_id: Set(advisory_id),
            cve_id: Set(cve_id.to_string()),
        }
        .insert(&self.conn)
        .await;

        match result.map_err(Error::from) {
            Ok(_) | Err(Error::UniqueViolation) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn add_advisory_fix(&self, advisory_id: i64, fix_id: i64) -> Result<(), Error> {
        let result = advisory_fix::ActiveModel {
            advisory_id: Set(advisory_id),
            fix_id: Set(fix_id),
        }
        .insert(&self.conn)
        .await;

        match result.map_err(Error::from) {
            Ok(_) | Err(Error::UniqueViolation) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn add_advisory_rpm(
        &self,
        advisory_id: i64,
        name: &str,
        product_id: i64,
    ) -> Result<(), Error> {
        let result = advisory_rpm::ActiveModel {
            advisory_id: Set(advisory_id),
            name: Set(name.to_string()),
            product_id: Set(product_id),
        }
        .insert(&self.conn)
        .await;

        match result.map_err(Error::from) {
            Ok(_) | Err(Error::UniqueViolation) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn get_mirror_state(&self, code: &str) -> Result<Option<mirror_state::Model>, Error> {
        Ok(mirror_state::Entity::find_by_id(code).one(&self.conn).await?)
    }

    async fn update_mirror_state(
        &self,
        code: &str,
        last_sync: Option<OffsetDateTime>,
    ) -> Result<(), Error> {
        let result = mirror_state::Entity::update_many()
            .set(mirror_state::ActiveModel {
                last_sync: Set(last_sync),
                ..Default::default()
            })
            .filter(mirror_state::Column::ShortCode.eq(code))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            mirror_state::ActiveModel {
                short_code: Set(code.to_string()),
                last_sync: Set(last_sync),
                errata_after: Set(None),
            }
            .insert(&self.conn)
            .await?;
        }

        Ok(())
    }

    async fn update_mirror_state_errata(
        &self,
        code: &str,
        errata_after: Option<OffsetDateTime>,
    ) -> Result<(), Error> {
        let result = mirror_state::Entity::update_many()
            .set(mirror_state::ActiveModel {
                errata_after: Set(errata_after),
                ..Default::default()
            })
            .filter(mirror_state::Column::ShortCode.eq(code))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            mirror_state::ActiveModel {
                short_code: Set(code.to_string()),
                last_sync: Set(None),
                errata_after: Set(errata_after),
            }
            .insert(&self.conn)
            .await?;
        }

        Ok(())
    }

    async fn get_ignored_packages_by_short_code(
        &self,
        code: &str,
    ) -> Result<Vec<String>, Error> {
        Ok(ignored_upstream_package::Entity::find()
            .filter(ignored_upstream_package::Column::ShortCode.eq(code))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|row| row.package)
            .collect())
    }
}

#[async_trait]
impl Store for Pg<DatabaseConnection> {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error> {
        Ok(Box::new(Pg {
            conn: TransactionTrait::begin(&self.conn).await?,
        }))
    }
}

#[async_trait]
impl Transaction for Pg<DatabaseTransaction> {
    async fn commit(self: Box<Self>) -> Result<(), Error> {
        Ok(self.conn.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<(), Error> {
        Ok(self.conn.rollback().await?)
    }
}
