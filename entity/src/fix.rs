use sea_orm::entity::prelude::*;

/// An upstream issue tracker entry tied to one or more advisories.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fix")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ticket: String,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::advisory_fix::Entity")]
    AdvisoryFix,
}

impl Related<super::advisory_fix::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisoryFix.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
