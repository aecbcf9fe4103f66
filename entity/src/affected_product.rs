use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "affected_product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub cve_id: String,
    pub state: State,
    pub version: String,
    /// Either a full NVR, an epoch-prefixed package or a bare package name.
    pub package: String,
    /// Upstream advisory name this entry was derived from, if any.
    pub advisory: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum State {
    /// Sentinel for "not affected": an existing row in this state is deleted.
    #[sea_orm(num_value = 0)]
    UnknownProductState,
    #[sea_orm(num_value = 1)]
    UnderInvestigationUpstream,
    #[sea_orm(num_value = 2)]
    AffectedUpstream,
    #[sea_orm(num_value = 3)]
    WillNotFixUpstream,
    #[sea_orm(num_value = 4)]
    OutOfSupportScope,
    #[sea_orm(num_value = 5)]
    FixedUpstream,
    #[sea_orm(num_value = 6)]
    FixedDownstream,
    #[sea_orm(num_value = 7)]
    WillNotFixDownstream,
}

impl State {
    /// States that no longer require upstream work. CVEs whose products all
    /// sit in one of these are candidates for the downstream matcher.
    pub fn is_post_upstream(&self) -> bool {
        matches!(
            self,
            State::WillNotFixUpstream
                | State::OutOfSupportScope
                | State::FixedUpstream
                | State::FixedDownstream
                | State::WillNotFixDownstream
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::cve::Entity",
        from = "Column::CveId",
        to = "super::cve::Column::Id"
    )]
    Cve,
    #[sea_orm(has_many = "super::build_reference::Entity")]
    BuildReference,
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

impl Related<super::build_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuildReference.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
