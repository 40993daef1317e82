use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    PasswordHash,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LoanRequests {
    Table,
    Id,
    Kind,
    Status,
    Description,
    TeacherId,
    TechnicianId,
    MaterialId,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum Materials {
    Table,
    Id,
    Kind,
    Tag,
    Label,
    Status,
    CurrentRequest,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoanRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoanRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoanRequests::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(LoanRequests::Status).string_len(16).not_null())
                    .col(ColumnDef::new(LoanRequests::Description).text().null())
                    .col(ColumnDef::new(LoanRequests::TeacherId).uuid().not_null())
                    .col(ColumnDef::new(LoanRequests::TechnicianId).uuid().null())
                    .col(ColumnDef::new(LoanRequests::MaterialId).uuid().null())
                    .col(
                        ColumnDef::new(LoanRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoanRequests::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loan_requests_teacher")
                            .from(LoanRequests::Table, LoanRequests::TeacherId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loan_requests_technician")
                            .from(LoanRequests::Table, LoanRequests::TechnicianId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_loan_requests_teacher")
                    .table(LoanRequests::Table)
                    .col(LoanRequests::TeacherId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Materials::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Materials::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Materials::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Materials::Tag).string_len(32).not_null().unique_key())
                    .col(ColumnDef::new(Materials::Label).string().null())
                    .col(ColumnDef::new(Materials::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Materials::CurrentRequest).uuid().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_materials_current_request")
                            .from(Materials::Table, Materials::CurrentRequest)
                            .to(LoanRequests::Table, LoanRequests::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Materials::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoanRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}
