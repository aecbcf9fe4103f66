use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// e.g. "8.4"
    pub current_full_version: String,
    /// Major version of the mirrored upstream release, e.g. 8. Products
    /// without one are never matched against upstream data.
    pub upstream_major_version: Option<i32>,
    pub short_code: String,
    pub archs: Vec<String>,
    pub eol_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::short_code::Entity",
        from = "Column::ShortCode",
        to = "super::short_code::Column::Code"
    )]
    ShortCode,
    #[sea_orm(has_many = "super::affected_product::Entity")]
    AffectedProduct,
}

impl Related<super::short_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShortCode.def()
    }
}

impl Related<super::affected_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
