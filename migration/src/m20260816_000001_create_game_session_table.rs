use sea_orm_migration::prelude::*;

/// Creates the `game_session` table: the durable, append/update-only record of
/// each live session (recovery/audit copy of the in-memory registry state).
///
/// `join_code` is deliberately not unique here — uniqueness only holds among
/// *active* sessions and is enforced by the in-memory registry; finished
/// sessions keep their historical code.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum GameSession {
    Table,
    Id,
    JoinCode,
    HostId,
    State,
    Template,
    CreatedAt,
    UpdatedAt,
    FinishedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GameSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameSession::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameSession::JoinCode).integer().not_null())
                    .col(ColumnDef::new(GameSession::HostId).uuid().not_null())
                    .col(
                        ColumnDef::new(GameSession::State)
                            .string_len(20)
                            .not_null()
                            .default("created"),
                    )
                    .col(ColumnDef::new(GameSession::Template).json().not_null())
                    .col(
                        ColumnDef::new(GameSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameSession::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameSession::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_session_host_id")
                            .from(GameSession::Table, GameSession::HostId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameSession::Table).to_owned())
            .await
    }
}
