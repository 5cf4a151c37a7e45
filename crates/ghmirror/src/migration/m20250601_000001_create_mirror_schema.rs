//! Create one table per mirrored entity kind.
//!
//! Every table carries a UUID row id, the natural identity (unique), parent
//! scope columns, the full payload as JSON and `synced_at`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                mirrored(Organizations::Table)
                    .col(ColumnDef::new(Organizations::Login).string().not_null())
                    .col(ColumnDef::new(Organizations::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(Organizations::Name).string().null())
                    .to_owned(),
            )
            .await?;
        unique_index(manager, "idx_organizations_login", Organizations::Table, &[Organizations::Login])
            .await?;

        manager
            .create_table(
                mirrored(Users::Table)
                    .col(ColumnDef::new(Users::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(Users::Login).string().not_null())
                    .to_owned(),
            )
            .await?;
        unique_index(manager, "idx_users_github_id", Users::Table, &[Users::GithubId]).await?;

        manager
            .create_table(
                mirrored(Repositories::Table)
                    .col(ColumnDef::new(Repositories::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(Repositories::Owner).string().not_null())
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .to_owned(),
            )
            .await?;
        unique_index(
            manager,
            "idx_repositories_github_id",
            Repositories::Table,
            &[Repositories::GithubId],
        )
        .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_owner")
                    .table(Repositories::Table)
                    .col(Repositories::Owner)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                mirrored(Issues::Table)
                    .col(ColumnDef::new(Issues::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(Issues::RepositoryOwner).string().not_null())
                    .col(ColumnDef::new(Issues::RepositoryName).string().not_null())
                    .col(ColumnDef::new(Issues::Number).big_integer().not_null())
                    .col(ColumnDef::new(Issues::Title).text().null())
                    .col(ColumnDef::new(Issues::State).string().null())
                    .to_owned(),
            )
            .await?;
        unique_index(
            manager,
            "idx_issues_repository_number",
            Issues::Table,
            &[Issues::RepositoryOwner, Issues::RepositoryName, Issues::Number],
        )
        .await?;

        manager
            .create_table(
                mirrored(PullRequests::Table)
                    .col(ColumnDef::new(PullRequests::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(PullRequests::RepositoryOwner).string().not_null())
                    .col(ColumnDef::new(PullRequests::RepositoryName).string().not_null())
                    .col(ColumnDef::new(PullRequests::Number).big_integer().not_null())
                    .col(ColumnDef::new(PullRequests::Title).text().null())
                    .col(ColumnDef::new(PullRequests::State).string().null())
                    .to_owned(),
            )
            .await?;
        unique_index(
            manager,
            "idx_pull_requests_github_id",
            PullRequests::Table,
            &[PullRequests::GithubId],
        )
        .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_pull_requests_repository_number")
                    .table(PullRequests::Table)
                    .col(PullRequests::RepositoryOwner)
                    .col(PullRequests::RepositoryName)
                    .col(PullRequests::Number)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                mirrored(IssueComments::Table)
                    .col(ColumnDef::new(IssueComments::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(IssueComments::RepositoryOwner).string().not_null())
                    .col(ColumnDef::new(IssueComments::RepositoryName).string().not_null())
                    .col(ColumnDef::new(IssueComments::IssueNumber).big_integer().null())
                    .to_owned(),
            )
            .await?;
        unique_index(
            manager,
            "idx_issue_comments_github_id",
            IssueComments::Table,
            &[IssueComments::GithubId],
        )
        .await?;

        manager
            .create_table(
                mirrored(PullRequestComments::Table)
                    .col(
                        ColumnDef::new(PullRequestComments::GithubId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PullRequestComments::RepositoryOwner)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PullRequestComments::RepositoryName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PullRequestComments::PullNumber).big_integer().null())
                    .to_owned(),
            )
            .await?;
        unique_index(
            manager,
            "idx_pull_request_comments_github_id",
            PullRequestComments::Table,
            &[PullRequestComments::GithubId],
        )
        .await?;

        manager
            .create_table(
                mirrored(PullRequestReviews::Table)
                    .col(
                        ColumnDef::new(PullRequestReviews::GithubId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PullRequestReviews::RepositoryOwner)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PullRequestReviews::RepositoryName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PullRequestReviews::PullNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PullRequestReviews::State).string().null())
                    .to_owned(),
            )
            .await?;
        unique_index(
            manager,
            "idx_pull_request_reviews_github_id",
            PullRequestReviews::Table,
            &[PullRequestReviews::GithubId],
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table(manager, PullRequestReviews::Table).await?;
        drop_table(manager, PullRequestComments::Table).await?;
        drop_table(manager, IssueComments::Table).await?;
        drop_table(manager, PullRequests::Table).await?;
        drop_table(manager, Issues::Table).await?;
        drop_table(manager, Repositories::Table).await?;
        drop_table(manager, Users::Table).await?;
        drop_table(manager, Organizations::Table).await
    }
}

/// Table skeleton shared by every mirrored kind.
fn mirrored<T: IntoIden + 'static>(table: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Common::Id).uuid().not_null().primary_key())
        .col(ColumnDef::new(Common::Payload).json().not_null())
        .col(
            ColumnDef::new(Common::SyncedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_owned()
}

async fn drop_table<T: IntoIden + 'static>(manager: &SchemaManager<'_>, table: T) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(table).if_exists().to_owned())
        .await
}

async fn unique_index<T, C>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    columns: &[C],
) -> Result<(), DbErr>
where
    T: IntoIden + 'static,
    C: IntoIden + Copy,
{
    let mut index = Index::create();
    index.name(name).table(table).unique();
    for column in columns {
        index.col(*column);
    }
    manager.create_index(index.to_owned()).await
}

#[derive(DeriveIden)]
enum Common {
    Id,
    Payload,
    SyncedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Organizations {
    Table,
    Login,
    GithubId,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum Users {
    Table,
    GithubId,
    Login,
}

#[derive(DeriveIden, Clone, Copy)]
enum Repositories {
    Table,
    GithubId,
    Owner,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum Issues {
    Table,
    GithubId,
    RepositoryOwner,
    RepositoryName,
    Number,
    Title,
    State,
}

#[derive(DeriveIden, Clone, Copy)]
enum PullRequests {
    Table,
    GithubId,
    RepositoryOwner,
    RepositoryName,
    Number,
    Title,
    State,
}

#[derive(DeriveIden, Clone, Copy)]
enum IssueComments {
    Table,
    GithubId,
    RepositoryOwner,
    RepositoryName,
    IssueNumber,
}

#[derive(DeriveIden, Clone, Copy)]
enum PullRequestComments {
    Table,
    GithubId,
    RepositoryOwner,
    RepositoryName,
    PullNumber,
}

#[derive(DeriveIden, Clone, Copy)]
enum PullRequestReviews {
    Table,
    GithubId,
    RepositoryOwner,
    RepositoryName,
    PullNumber,
    State,
}
