use sea_orm::entity::prelude::*;

/// A proof-of-fix linking an affected product to one downstream build output.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "build_reference")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affected_product_id: i64,
    /// Full "name-epoch:version-release.arch.rpm" string.
    pub rpm: String,
    pub src_rpm: String,
    pub cve_id: String,
    pub build_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::affected_product::Entity",
        from = "Column::AffectedProductId",
        to = "super::affected_product::Column::Id"
    )]
    AffectedProduct,
}

impl Related<super::affected_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AffectedProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
