use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entity::{issue, pull_request, repository};

use super::errors::Result;

/// Repositories already stored under `owner`, by name, skipping `excluded`.
pub async fn stored_repositories<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    excluded: &[String],
) -> Result<Vec<repository::Model>> {
    let mut query = repository::Entity::find().filter(repository::Column::Owner.eq(owner));
    if !excluded.is_empty() {
        query = query.filter(repository::Column::Name.is_not_in(excluded.iter().cloned()));
    }
    Ok(query
        .order_by_asc(repository::Column::Name)
        .all(db)
        .await?)
}

/// Issue numbers stored for one repository, ascending.
pub async fn issue_numbers<C: ConnectionTrait>(db: &C, owner: &str, repo: &str) -> Result<Vec<i64>> {
    Ok(issue::Entity::find()
        .select_only()
        .column(issue::Column::Number)
        .filter(issue::Column::RepositoryOwner.eq(owner))
        .filter(issue::Column::RepositoryName.eq(repo))
        .order_by_asc(issue::Column::Number)
        .into_tuple()
        .all(db)
        .await?)
}

/// Pull request numbers stored for one repository, ascending.
pub async fn pull_request_numbers<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    repo: &str,
) -> Result<Vec<i64>> {
    Ok(pull_request::Entity::find()
        .select_only()
        .column(pull_request::Column::Number)
        .filter(pull_request::Column::RepositoryOwner.eq(owner))
        .filter(pull_request::Column::RepositoryName.eq(repo))
        .order_by_asc(pull_request::Column::Number)
        .into_tuple()
        .all(db)
        .await?)
}

/// Find an issue by its position.
pub async fn find_issue<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    repo: &str,
    number: i64,
) -> Result<Option<issue::Model>> {
    Ok(issue::Entity::find()
        .filter(issue::Column::RepositoryOwner.eq(owner))
        .filter(issue::Column::RepositoryName.eq(repo))
        .filter(issue::Column::Number.eq(number))
        .one(db)
        .await?)
}

/// Row count of any mirrored table.
pub async fn count<E, C>(db: &C) -> Result<u64>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    Ok(E::find().count(db).await?)
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::db::connect_and_migrate;
    use crate::github::Remote;
    use crate::store::{RepoScoped, upsert};

    async fn seed_repo(db: &sea_orm::DatabaseConnection, id: i64, owner: &str, name: &str) {
        let payload = json!({"id": id, "name": name, "owner": {"id": 1, "login": owner}});
        let record = Remote::from_value(payload).expect("repo");
        upsert::<repository::Entity, _>(db, &record).await.expect("seed repo");
    }

    #[tokio::test]
    async fn stored_repositories_filters_owner_and_exclusions() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        seed_repo(&db, 1, "acme", "zeta").await;
        seed_repo(&db, 2, "acme", "alpha").await;
        seed_repo(&db, 3, "acme", "private-infra").await;
        seed_repo(&db, 4, "other", "alpha").await;

        let repos = stored_repositories(&db, "acme", &["private-infra".to_string()])
            .await
            .expect("query");
        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);

        let all = stored_repositories(&db, "acme", &[]).await.expect("query");
        assert_eq!(all.len(), 3);
        assert_eq!(count::<repository::Entity, _>(&db).await.expect("count"), 4);
    }

    #[tokio::test]
    async fn issue_numbers_are_per_repository() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        for (id, repo, number) in [(10, "a", 3), (11, "a", 1), (12, "b", 2)] {
            let record = RepoScoped::new(
                "acme",
                repo,
                Remote::from_value(json!({"id": id, "number": number})).expect("issue"),
            );
            upsert::<issue::Entity, _>(&db, &record).await.expect("seed issue");
        }

        assert_eq!(issue_numbers(&db, "acme", "a").await.expect("a"), vec![1, 3]);
        assert_eq!(issue_numbers(&db, "acme", "b").await.expect("b"), vec![2]);
        assert!(pull_request_numbers(&db, "acme", "a").await.expect("prs").is_empty());

        let found = find_issue(&db, "acme", "a", 3).await.expect("find").expect("exists");
        assert_eq!(found.github_id, 10);
        assert!(find_issue(&db, "acme", "b", 3).await.expect("find").is_none());
    }
}
