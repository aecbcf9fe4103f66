use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advisory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: OffsetDateTime,
    pub short_code: String,
    pub year: i32,
    pub num: i32,
    pub kind: Kind,
    pub severity: i32,
    pub synopsis: String,
    pub topic: String,
    pub description: String,
    pub solution: Option<String>,
    pub upstream_issued_at: Option<OffsetDateTime>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum Kind {
    #[sea_orm(num_value = 0)]
    Security,
    #[sea_orm(num_value = 1)]
    BugFix,
    #[sea_orm(num_value = 2)]
    Enhancement,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::advisory_cve::Entity")]
    AdvisoryCve,
    #[sea_orm(has_many = "super::advisory_fix::Entity")]
    AdvisoryFix,
    #[sea_orm(has_many = "super::advisory_rpm::Entity")]
    AdvisoryRpm,
    #[sea_orm(has_many = "super::advisory_reference::Entity")]
    AdvisoryReference,
}

impl Related<super::advisory_cve::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisoryCve.def()
    }
}

impl Related<super::advisory_fix::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisoryFix.def()
    }
}

impl Related<super::advisory_rpm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisoryRpm.def()
    }
}

impl Related<super::advisory_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisoryReference.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
