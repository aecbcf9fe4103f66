use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "short_code")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub mode: Mode,
    pub created_at: OffsetDateTime,
    pub archived_at: Option<OffsetDateTime>,
    /// Earliest upstream date to consider on the first sync. When unset, the
    /// first poll discovers nothing historical.
    pub mirror_from_date: Option<OffsetDateTime>,
    /// Prefix used to translate upstream product names, e.g.
    /// "Red Hat Enterprise Linux 8" becomes "Rocky Linux 8".
    pub upstream_product_prefix: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum Mode {
    #[sea_orm(num_value = 0)]
    MirrorUpstream,
    #[sea_orm(num_value = 1)]
    Native,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
    #[sea_orm(has_many = "super::cve::Entity")]
    Cve,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::cve::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cve.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
