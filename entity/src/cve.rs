use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cve")]
pub struct Model {
    /// External identifier. Usually a CVE id, but bulk-imported RHBA/RHEA
    /// advisories are tracked under their advisory name.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub created_at: OffsetDateTime,
    pub state: State,
    pub short_code: String,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
    /// Set once a downstream advisory has been published for this CVE.
    pub advisory_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum State {
    #[sea_orm(num_value = 0)]
    NewFromUpstream,
    #[sea_orm(num_value = 1)]
    NewOriginal,
    #[sea_orm(num_value = 2)]
    ResolvedUpstream,
    #[sea_orm(num_value = 3)]
    ResolvedDownstream,
    #[sea_orm(num_value = 4)]
    ResolvedNoAdvisory,
}

impl State {
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            State::ResolvedUpstream | State::ResolvedDownstream | State::ResolvedNoAdvisory
        )
    }
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
