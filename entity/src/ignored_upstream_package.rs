use sea_orm::entity::prelude::*;

/// Glob patterns for upstream packages a short code does not rebuild.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ignored_upstream_package")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub short_code: String,
    pub package: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::short_code::Entity",
        from = "Column::ShortCode",
        to = "super::short_code::Column::Code"
    )]
    ShortCode,
}

impl Related<super::short_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShortCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
