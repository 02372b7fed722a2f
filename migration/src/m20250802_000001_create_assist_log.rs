use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AssistLog::Table)
                    .if_not_exists()
                    .col(pk_auto(AssistLog::Id))
                    .col(integer(AssistLog::UserId))
                    .col(integer_null(AssistLog::MovieId))
                    .col(string(AssistLog::Action))
                    .col(text(AssistLog::InputText))
                    .col(text_null(AssistLog::OutputText))
                    .col(boolean(AssistLog::Success))
                    .col(string_null(AssistLog::ErrorMessage))
                    .col(big_integer(AssistLog::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assist_log_user")
                            .from(AssistLog::Table, AssistLog::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Serves the sliding-window rate limit lookup.
        manager
            .create_index(
                Index::create()
                    .name("idx_assist_log_user_action_created")
                    .table(AssistLog::Table)
                    .col(AssistLog::UserId)
                    .col(AssistLog::Action)
                    .col(AssistLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AssistLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AssistLog {
    Table,
    Id,
    UserId,
    MovieId,
    Action,
    InputText,
    OutputText,
    Success,
    ErrorMessage,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
