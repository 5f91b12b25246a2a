//! End-to-end behaviour of `StatusService` against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use cistat_core::fakes::{FakeResponse, FakeStatusApi, FakeVcs};
use cistat_core::{
    summarize, Chooser, GitRef, NavAction, NavTarget, RemoteError, RepoSlug, StatusCache,
    StatusEntry, StatusError, StatusReport, StatusService, StyleTag, ENABLED_KEY,
    NOT_FOUND_MESSAGE,
};

fn repo_vcs() -> FakeVcs {
    FakeVcs::new()
        .with_current_branch("feature/x")
        .with_remote("origin", "git@github.com:octo/widgets.git")
        .with_tracking("feature/x", "origin/fx")
        .with_commit("c3c3c3c3", "tweak docs [ci skip]")
        .with_commit("b2b2b2b2", "add parser")
        .with_commit("a1a1a1a1", "initial")
}

fn service(vcs: Arc<FakeVcs>, api: Arc<FakeStatusApi>) -> StatusService {
    StatusService::new(
        vcs,
        api,
        RepoSlug::new("octo", "widgets"),
        StatusCache::new(Duration::from_secs(60)),
    )
}

fn three_checks() -> StatusReport {
    StatusReport::new(
        Some("pending"),
        vec![
            StatusEntry::new("success", "ci/build").with_target_url("https://ci/build/1"),
            StatusEntry::new("success", "ci/lint").with_target_url("https://ci/lint/1"),
            StatusEntry::new("pending", "ci/test")
                .with_description("running")
                .with_target_url("https://ci/test/1"),
        ],
    )
}

struct PickIndex(Option<usize>);

impl Chooser for PickIndex {
    fn choose(&self, _prompt: &str, _options: &[String]) -> Option<usize> {
        self.0
    }
}

#[tokio::test]
async fn test_unknown_ref_yields_not_found_report() {
    let api = Arc::new(FakeStatusApi::new());
    let svc = service(Arc::new(repo_vcs()), api.clone());

    let report = svc
        .get_status(&GitRef::new("never-pushed"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.total_count, 0);
    assert_eq!(report.state.as_deref(), Some("error"));
    assert_eq!(report.message.as_deref(), Some(NOT_FOUND_MESSAGE));
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_repeated_reads_within_ttl_fetch_once() {
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = service(Arc::new(repo_vcs()), api.clone());
    let git_ref = svc.resolve_ref(None).unwrap();
    assert_eq!(git_ref, GitRef::new("fx"));

    let first = svc.get_status(&git_ref).await.unwrap();
    let second = svc.get_status(&git_ref).await.unwrap();

    assert_eq!(api.calls(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_refresh_always_refetches() {
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = service(Arc::new(repo_vcs()), api.clone());
    let git_ref = GitRef::new("fx");

    svc.get_status(&git_ref).await.unwrap();
    api.set_response(
        "fx",
        FakeResponse::Report(StatusReport::new(
            Some("success"),
            vec![StatusEntry::new("success", "ci/build")],
        )),
    );
    let refreshed = svc.refresh(&git_ref, false).await.unwrap().unwrap();

    assert_eq!(api.calls(), 2);
    assert_eq!(refreshed.state.as_deref(), Some("success"));
    // The refreshed value is what later reads see.
    assert_eq!(svc.get_status(&git_ref).await.unwrap(), Some(refreshed));
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_rebase_in_progress_makes_no_network_calls() {
    let vcs = Arc::new(repo_vcs());
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = service(vcs.clone(), api.clone());
    let git_ref = GitRef::new("fx");

    svc.get_status(&git_ref).await.unwrap();
    vcs.set_rebase_in_progress(true);

    let refreshed = svc.refresh(&git_ref, true).await.unwrap();
    assert!(refreshed.is_none());
    let other = svc.get_status(&GitRef::new("other")).await.unwrap();
    assert!(other.is_none());
    assert_eq!(api.calls(), 1);

    vcs.set_rebase_in_progress(false);
    svc.get_status(&git_ref).await.unwrap();
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_offline_mode_needs_forced_refresh() {
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = StatusService::new(
        Arc::new(repo_vcs()),
        api.clone(),
        RepoSlug::new("octo", "widgets"),
        StatusCache::new(Duration::from_secs(60)).with_offline(true),
    );
    let git_ref = GitRef::new("fx");

    assert!(svc.get_status(&git_ref).await.unwrap().is_none());
    assert!(svc.refresh(&git_ref, false).await.unwrap().is_none());
    assert_eq!(api.calls(), 0);

    let forced = svc.refresh(&git_ref, true).await.unwrap();
    assert_eq!(forced, Some(three_checks()));
    assert_eq!(api.calls(), 1);

    // Once cached, the value is served without the override.
    assert_eq!(svc.get_status(&git_ref).await.unwrap(), Some(three_checks()));
}

#[tokio::test]
async fn test_disabled_repository_is_never_queried() {
    let vcs = Arc::new(repo_vcs().with_config(ENABLED_KEY, false));
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = service(vcs.clone(), api.clone());

    assert!(svc.get_status(&GitRef::new("fx")).await.unwrap().is_none());
    assert_eq!(api.calls(), 0);

    // The toggle is read on every decision.
    vcs.set_config(ENABLED_KEY, true);
    assert!(svc.get_status(&GitRef::new("fx")).await.unwrap().is_some());
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_transport_errors_reach_the_caller() {
    let api = Arc::new(FakeStatusApi::new().with_response("fx", FakeResponse::Http(502)));
    let svc = service(Arc::new(repo_vcs()), api.clone());

    let err = svc.get_status(&GitRef::new("fx")).await.unwrap_err();
    assert!(matches!(
        err,
        StatusError::Remote(RemoteError::Http { status: 502, .. })
    ));
}

#[tokio::test]
async fn test_concurrent_callers_share_a_fetch() {
    let api = Arc::new(
        FakeStatusApi::new()
            .with_report("fx", three_checks())
            .with_delay(Duration::from_millis(25)),
    );
    let svc = Arc::new(service(Arc::new(repo_vcs()), api.clone()));
    let git_ref = GitRef::new("fx");

    let lookups = (0..6).map(|_| svc.get_status(&git_ref));
    let results = futures::future::join_all(lookups).await;

    assert_eq!(api.calls(), 1);
    for result in results {
        assert_eq!(result.unwrap(), Some(three_checks()));
    }
}

#[tokio::test]
async fn test_summary_of_fetched_report() {
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = service(Arc::new(repo_vcs()), api);

    let display = svc.display(&GitRef::new("fx")).await.unwrap().unwrap();
    assert_eq!(display.style, StyleTag::Pending);
    assert_eq!(display.detail, "Pending (2/3)");

    let report = svc.get_status(&GitRef::new("fx")).await.unwrap().unwrap();
    assert_eq!(summarize(&report), display);
}

#[test]
fn test_resolve_ref_prefers_explicit_revision() {
    let vcs = Arc::new(repo_vcs().with_rev("v1.0", "f0f0f0f0"));
    let svc = service(vcs, Arc::new(FakeStatusApi::new()));

    assert_eq!(svc.resolve_ref(Some("v1.0")).unwrap(), GitRef::new("f0f0f0f0"));
    let err = svc.resolve_ref(Some("nope")).unwrap_err();
    assert!(matches!(err, StatusError::UnknownRevision { .. }));
}

#[test]
fn test_resolve_ref_falls_back_to_last_ci_commit() {
    let vcs = Arc::new(
        FakeVcs::new()
            .with_current_branch("scratch")
            .with_remote("origin", "git@github.com:octo/widgets.git")
            .with_commit("c3c3c3c3", "wip [skip ci]")
            .with_commit("b2b2b2b2", "add parser"),
    );
    let svc = service(vcs, Arc::new(FakeStatusApi::new()));
    assert_eq!(svc.resolve_ref(None).unwrap(), GitRef::new("b2b2b2b2"));
}

#[test]
fn test_resolve_ref_reports_original_error_when_nothing_to_fall_back_to() {
    let vcs = Arc::new(FakeVcs::new().with_commit("c3c3c3c3", "[ci skip]"));
    let svc = service(vcs, Arc::new(FakeStatusApi::new()));
    let err = svc.resolve_ref(None).unwrap_err();
    assert!(matches!(err, StatusError::NoCurrentBranch));
}

#[test]
fn test_last_ci_commit_skips_marked_head() {
    let svc = service(Arc::new(repo_vcs()), Arc::new(FakeStatusApi::new()));
    let commit = svc.last_ci_commit().unwrap().unwrap();
    assert_eq!(commit.as_str(), "b2b2b2b2");
}

#[tokio::test]
async fn test_navigate_bound_url_skips_lookup() {
    let api = Arc::new(FakeStatusApi::new());
    let svc = service(Arc::new(repo_vcs()), api.clone());

    let action = svc
        .navigate(&NavTarget::Url("https://ci/x".to_string()), &PickIndex(None))
        .await
        .unwrap();
    assert_eq!(action, NavAction::Open("https://ci/x".to_string()));
    assert_eq!(api.calls(), 0);
}

#[tokio::test]
async fn test_navigate_ref_with_several_checks_uses_choice() {
    let api = Arc::new(FakeStatusApi::new().with_report("fx", three_checks()));
    let svc = service(Arc::new(repo_vcs()), api);

    let action = svc
        .navigate(&NavTarget::Ref(GitRef::new("fx")), &PickIndex(Some(2)))
        .await
        .unwrap();
    assert_eq!(action, NavAction::Open("https://ci/test/1".to_string()));
}

#[tokio::test]
async fn test_navigate_unknown_ref_has_no_url() {
    let svc = service(Arc::new(repo_vcs()), Arc::new(FakeStatusApi::new()));
    let err = svc
        .navigate(&NavTarget::Ref(GitRef::new("ghost")), &PickIndex(None))
        .await
        .unwrap_err();
    assert!(matches!(err, StatusError::NoUsableUrl { .. }));
}

#[tokio::test]
async fn test_navigate_while_rebasing_is_suppressed() {
    let vcs = Arc::new(repo_vcs());
    vcs.set_rebase_in_progress(true);
    let svc = service(vcs, Arc::new(FakeStatusApi::new().with_report("fx", three_checks())));
    let action = svc
        .navigate(&NavTarget::Ref(GitRef::new("fx")), &PickIndex(Some(0)))
        .await
        .unwrap();
    assert_eq!(action, NavAction::Suppressed);
}
