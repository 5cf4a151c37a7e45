use std::error::Error;

use ghmirror::EntityKind;
use ghmirror::queue::SyncJob;
use ghmirror::sync::{SyncContext, Worker};

/// Fetch and store a single entity, bypassing the queue.
pub(crate) async fn handle_sync(
    ctx: &SyncContext,
    kind: EntityKind,
    identity: &[String],
) -> Result<(), Box<dyn Error>> {
    let job = parse_job(kind, identity)?;
    Worker::new(ctx).process(&job).await?;
    println!("Synced {job}.");
    Ok(())
}

/// Build a job from command-line identity arguments.
///
/// | kind                 | arguments              |
/// |----------------------|------------------------|
/// | organization         | `LOGIN`                |
/// | user                 | `ORG LOGIN`            |
/// | repository           | `OWNER/NAME`           |
/// | issue, pull_request  | `OWNER/REPO NUMBER`    |
/// | *_comment            | `OWNER/REPO ID`        |
/// | pull_request_review  | `OWNER/REPO NUMBER ID` |
pub(crate) fn parse_job(kind: EntityKind, args: &[String]) -> Result<SyncJob, String> {
    let bad_args = || format!("{kind} expects {}", usage(kind));

    let job = match (kind, args) {
        (EntityKind::Organization, [login]) => SyncJob::Organization {
            login: login.clone(),
        },
        (EntityKind::User, [org, login]) => SyncJob::User {
            org: org.clone(),
            login: login.clone(),
        },
        (EntityKind::Repository, [full_name]) => {
            let (owner, name) = split_repo(full_name).ok_or_else(bad_args)?;
            SyncJob::Repository { owner, name }
        }
        (EntityKind::Issue, [full_name, number]) => {
            let (owner, repo) = split_repo(full_name).ok_or_else(bad_args)?;
            SyncJob::Issue {
                owner,
                repo,
                number: parse_number(number)?,
            }
        }
        (EntityKind::PullRequest, [full_name, number]) => {
            let (owner, repo) = split_repo(full_name).ok_or_else(bad_args)?;
            SyncJob::PullRequest {
                owner,
                repo,
                number: parse_number(number)?,
            }
        }
        (EntityKind::IssueComment, [full_name, id]) => {
            let (owner, repo) = split_repo(full_name).ok_or_else(bad_args)?;
            SyncJob::IssueComment {
                owner,
                repo,
                id: parse_number(id)?,
            }
        }
        (EntityKind::PullRequestComment, [full_name, id]) => {
            let (owner, repo) = split_repo(full_name).ok_or_else(bad_args)?;
            SyncJob::PullRequestComment {
                owner,
                repo,
                id: parse_number(id)?,
            }
        }
        (EntityKind::PullRequestReview, [full_name, number, id]) => {
            let (owner, repo) = split_repo(full_name).ok_or_else(bad_args)?;
            SyncJob::PullRequestReview {
                owner,
                repo,
                number: parse_number(number)?,
                id: parse_number(id)?,
            }
        }
        _ => return Err(bad_args()),
    };
    Ok(job)
}

fn usage(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Organization => "LOGIN",
        EntityKind::User => "ORG LOGIN",
        EntityKind::Repository => "OWNER/NAME",
        EntityKind::Issue | EntityKind::PullRequest => "OWNER/REPO NUMBER",
        EntityKind::IssueComment | EntityKind::PullRequestComment => "OWNER/REPO ID",
        EntityKind::PullRequestReview => "OWNER/REPO NUMBER ID",
    }
}

fn split_repo(full_name: &str) -> Option<(String, String)> {
    let (owner, name) = full_name.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

fn parse_number(value: &str) -> Result<i64, String> {
    match value.trim_start_matches('#').parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a positive number, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_repository_scoped_jobs() {
        assert_eq!(
            parse_job(EntityKind::Repository, &args(&["acme", "widgets"])).unwrap_err(),
            "repository expects OWNER/NAME"
        );
        assert_eq!(
            parse_job(EntityKind::Repository, &args(&["acme/widgets"])).unwrap(),
            SyncJob::Repository {
                owner: "acme".to_string(),
                name: "widgets".to_string(),
            }
        );
        assert_eq!(
            parse_job(EntityKind::Issue, &args(&["acme/widgets", "#42"])).unwrap(),
            SyncJob::Issue {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                number: 42,
            }
        );
    }

    #[test]
    fn parses_review_with_number_and_id() {
        assert_eq!(
            parse_job(
                EntityKind::PullRequestReview,
                &args(&["acme/widgets", "7", "9001"])
            )
            .unwrap(),
            SyncJob::PullRequestReview {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                number: 7,
                id: 9001,
            }
        );
    }

    #[test]
    fn user_needs_org_for_status() {
        assert!(parse_job(EntityKind::User, &args(&["octocat"])).is_err());
        assert_eq!(
            parse_job(EntityKind::User, &args(&["acme", "octocat"])).unwrap(),
            SyncJob::User {
                org: "acme".to_string(),
                login: "octocat".to_string(),
            }
        );
    }

    #[test]
    fn rejects_bad_numbers_and_names() {
        assert!(parse_job(EntityKind::PullRequest, &args(&["acme/widgets", "0"])).is_err());
        assert!(parse_job(EntityKind::IssueComment, &args(&["acme/widgets", "abc"])).is_err());
        assert!(parse_job(EntityKind::Issue, &args(&["/widgets", "1"])).is_err());
        assert!(parse_job(EntityKind::Issue, &args(&["a/b/c", "1"])).is_err());
        assert!(parse_job(EntityKind::Organization, &[]).is_err());
    }
}
