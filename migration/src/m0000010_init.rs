use sea_orm_migration::prelude::*;

use crate::Now;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShortCode::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortCode::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortCode::Mode).integer().not_null())
                    .col(
                        ColumnDef::new(ShortCode::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .col(ColumnDef::new(ShortCode::ArchivedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ShortCode::MirrorFromDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(ShortCode::UpstreamProductPrefix).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Product::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Product::Name).string().not_null())
                    .col(
                        ColumnDef::new(Product::CurrentFullVersion)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Product::UpstreamMajorVersion).integer())
                    .col(ColumnDef::new(Product::ShortCode).string().not_null())
                    .col(
                        ColumnDef::new(Product::Archs)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Product::EolAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Product::Table, Product::ShortCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Advisory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Advisory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Advisory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .col(ColumnDef::new(Advisory::ShortCode).string().not_null())
                    .col(ColumnDef::new(Advisory::Year).integer().not_null())
                    .col(ColumnDef::new(Advisory::Num).integer().not_null())
                    .col(ColumnDef::new(Advisory::Kind).integer().not_null())
                    .col(ColumnDef::new(Advisory::Severity).integer().not_null())
                    .col(ColumnDef::new(Advisory::Synopsis).string().not_null())
                    .col(ColumnDef::new(Advisory::Topic).text().not_null())
                    .col(ColumnDef::new(Advisory::Description).text().not_null())
                    .col(ColumnDef::new(Advisory::Solution).text())
                    .col(ColumnDef::new(Advisory::UpstreamIssuedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Advisory::PublishedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Advisory::Table, Advisory::ShortCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Advisory::Table)
                    .name("advisory_short_code_year_num_idx")
                    .col(Advisory::ShortCode)
                    .col(Advisory::Year)
                    .col(Advisory::Num)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cve::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cve::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Cve::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Func::cust(Now)),
                    )
                    .col(ColumnDef::new(Cve::State).integer().not_null())
                    .col(ColumnDef::new(Cve::ShortCode).string().not_null())
                    .col(ColumnDef::new(Cve::SourceBy).string())
                    .col(ColumnDef::new(Cve::SourceLink).string())
                    .col(ColumnDef::new(Cve::AdvisoryId).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Cve::Table, Cve::ShortCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Cve::Table, Cve::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AffectedProduct::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffectedProduct::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffectedProduct::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AffectedProduct::CveId).string().not_null())
                    .col(ColumnDef::new(AffectedProduct::State).integer().not_null())
                    .col(ColumnDef::new(AffectedProduct::Version).string().not_null())
                    .col(ColumnDef::new(AffectedProduct::Package).string().not_null())
                    .col(ColumnDef::new(AffectedProduct::Advisory).string())
                    .foreign_key(
                        ForeignKey::create()
                            .from(AffectedProduct::Table, AffectedProduct::ProductId)
                            .to(Product::Table, Product::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AffectedProduct::Table, AffectedProduct::CveId)
                            .to(Cve::Table, Cve::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AffectedProduct::Table)
                    .name("affected_product_cve_id_package_idx")
                    .col(AffectedProduct::CveId)
                    .col(AffectedProduct::Package)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BuildReference::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BuildReference::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BuildReference::AffectedProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BuildReference::Rpm).string().not_null())
                    .col(ColumnDef::new(BuildReference::SrcRpm).string().not_null())
                    .col(ColumnDef::new(BuildReference::CveId).string().not_null())
                    .col(ColumnDef::new(BuildReference::BuildId).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(BuildReference::Table, BuildReference::AffectedProductId)
                            .to(AffectedProduct::Table, AffectedProduct::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Fix::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Fix::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Fix::Ticket).string().not_null())
                    .col(ColumnDef::new(Fix::SourceBy).string())
                    .col(ColumnDef::new(Fix::SourceLink).string())
                    .col(ColumnDef::new(Fix::Description).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryCve::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryCve::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvisoryCve::CveId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(AdvisoryCve::AdvisoryId)
                            .col(AdvisoryCve::CveId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryCve::Table, AdvisoryCve::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryCve::Table, AdvisoryCve::CveId)
                            .to(Cve::Table, Cve::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryFix::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryFix::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvisoryFix::FixId).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(AdvisoryFix::AdvisoryId)
                            .col(AdvisoryFix::FixId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryFix::Table, AdvisoryFix::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryFix::Table, AdvisoryFix::FixId)
                            .to(Fix::Table, Fix::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryRpm::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryRpm::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvisoryRpm::Name).string().not_null())
                    .col(
                        ColumnDef::new(AdvisoryRpm::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(AdvisoryRpm::AdvisoryId)
                            .col(AdvisoryRpm::Name),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryRpm::Table, AdvisoryRpm::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryRpm::Table, AdvisoryRpm::ProductId)
                            .to(Product::Table, Product::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisoryReference::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdvisoryReference::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AdvisoryReference::AdvisoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvisoryReference::Url).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(AdvisoryReference::Table, AdvisoryReference::AdvisoryId)
                            .to(Advisory::Table, Advisory::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MirrorState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MirrorState::ShortCode)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MirrorState::LastSync).timestamp_with_time_zone())
                    .col(ColumnDef::new(MirrorState::ErrataAfter).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(MirrorState::Table, MirrorState::ShortCode)
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IgnoredUpstreamPackage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IgnoredUpstreamPackage::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IgnoredUpstreamPackage::ShortCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IgnoredUpstreamPackage::Package)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                IgnoredUpstreamPackage::Table,
                                IgnoredUpstreamPackage::ShortCode,
                            )
                            .to(ShortCode::Table, ShortCode::Code),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IgnoredUpstreamPackage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MirrorState::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvisoryReference::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvisoryRpm::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvisoryFix::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvisoryCve::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Fix::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BuildReference::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffectedProduct::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cve::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Advisory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShortCode::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShortCode {
    Table,
    Code,
    Mode,
    CreatedAt,
    // --
    ArchivedAt,
    MirrorFromDate,
    UpstreamProductPrefix,
}

#[derive(DeriveIden)]
enum Product {
    Table,
    Id,
    // --
    Name,
    CurrentFullVersion,
    UpstreamMajorVersion,
    ShortCode,
    Archs,
    EolAt,
}

#[derive(DeriveIden)]
enum Cve {
    Table,
    Id,
    CreatedAt,
    // --
    State,
    ShortCode,
    SourceBy,
    SourceLink,
    AdvisoryId,
}

#[derive(DeriveIden)]
enum AffectedProduct {
    Table,
    Id,
    // --
    ProductId,
    CveId,
    State,
    Version,
    Package,
    Advisory,
}

#[derive(DeriveIden)]
enum BuildReference {
    Table,
    Id,
    // --
    AffectedProductId,
    Rpm,
    SrcRpm,
    CveId,
    BuildId,
}

#[derive(DeriveIden)]
enum Advisory {
    Table,
    Id,
    CreatedAt,
    // --
    ShortCode,
    Year,
    Num,
    Kind,
    Severity,
    Synopsis,
    Topic,
    Description,
    Solution,
    UpstreamIssuedAt,
    PublishedAt,
}

#[derive(DeriveIden)]
enum Fix {
    Table,
    Id,
    // --
    Ticket,
    SourceBy,
    SourceLink,
    Description,
}

#[derive(DeriveIden)]
enum AdvisoryCve {
    Table,
    AdvisoryId,
    CveId,
}

#[derive(DeriveIden)]
enum AdvisoryFix {
    Table,
    AdvisoryId,
    FixId,
}

#[derive(DeriveIden)]
enum AdvisoryRpm {
    Table,
    AdvisoryId,
    Name,
    ProductId,
}

#[derive(DeriveIden)]
enum AdvisoryReference {
    Table,
    Id,
    // --
    AdvisoryId,
    Url,
}

#[derive(DeriveIden)]
enum MirrorState {
    Table,
    ShortCode,
    LastSync,
    ErrataAfter,
}

#[derive(DeriveIden)]
enum IgnoredUpstreamPackage {
    Table,
    Id,
    // --
    ShortCode,
    Package,
}
