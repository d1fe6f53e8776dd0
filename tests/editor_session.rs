use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use content_planner::autosave::AutoSaver;
use content_planner::planner::{NoExistingContent, Planner};
use content_planner::session::{EditorSession, ModalKind, ModalScope};
use content_planner::ContentProduct::{Presentation, Quiz};
use content_planner::{ExistingContent, Lesson, ProjectDefaults, Section, TrainingPlan};

const DELAY: Duration = Duration::from_millis(2000);

type Saved<T> = Arc<Mutex<Vec<T>>>;

fn recording_saver<T: Clone + Send + 'static>() -> (AutoSaver<T>, Saved<T>) {
    let saved: Saved<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&saved);
    let saver = AutoSaver::new(DELAY, move |value: T| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().expect("sink lock").push(value);
            Ok::<(), String>(())
        }
    });
    (saver, saved)
}

/// Fails the first `failures` saves, then records like `recording_saver`.
fn flaky_saver<T: Clone + Send + 'static>(failures: usize) -> (AutoSaver<T>, Saved<T>) {
    let saved: Saved<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&saved);
    let attempts = Arc::new(AtomicUsize::new(0));
    let saver = AutoSaver::new(DELAY, move |value: T| {
        let sink = Arc::clone(&sink);
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < failures {
                return Err::<(), String>("backend unavailable".to_string());
            }
            sink.lock().expect("sink lock").push(value);
            Ok(())
        }
    });
    (saver, saved)
}

fn saved_values<T: Clone>(saved: &Saved<T>) -> Vec<T> {
    saved.lock().expect("sink lock").clone()
}

async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

fn sample_plan() -> TrainingPlan {
    TrainingPlan {
        sections: vec![Section::new(
            "Safety",
            vec![
                Lesson::new("Introduction to Safety"),
                Lesson::new("Warehouse Safety Procedure"),
            ],
        )],
    }
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_coalesce_into_one_save() {
    let (saver, saved) = recording_saver::<u32>();

    saver.schedule(1);
    tokio::time::sleep(Duration::from_millis(500)).await;
    saver.schedule(2);
    tokio::time::sleep(Duration::from_millis(500)).await;
    saver.schedule(3);
    assert!(saver.has_pending());
    assert!(saved_values(&saved).is_empty());

    tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
    settle().await;

    assert_eq!(saved_values(&saved), vec![3]);
    assert!(!saver.has_pending());
}

#[tokio::test(start_paused = true)]
async fn idle_timer_restarts_on_each_edit() {
    let (saver, saved) = recording_saver::<u32>();

    saver.schedule(1);
    tokio::time::sleep(DELAY - Duration::from_millis(100)).await;
    saver.schedule(2);
    tokio::time::sleep(DELAY - Duration::from_millis(100)).await;
    settle().await;
    assert!(saved_values(&saved).is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    settle().await;
    assert_eq!(saved_values(&saved), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn flush_saves_immediately_and_cancels_timer() {
    let (saver, saved) = recording_saver::<u32>();

    saver.schedule(7);
    assert_eq!(saver.flush().await, Ok(true));
    assert_eq!(saved_values(&saved), vec![7]);

    tokio::time::sleep(DELAY * 2).await;
    settle().await;
    assert_eq!(saved_values(&saved), vec![7]);

    assert_eq!(saver.flush().await, Ok(false));
}

#[tokio::test(start_paused = true)]
async fn flush_reports_persist_errors() {
    let saver = AutoSaver::new(DELAY, |_: u32| async {
        Err::<(), String>("backend unavailable".to_string())
    });
    saver.schedule(1);

    let err = saver.flush().await.expect_err("persist fails");
    assert!(err.contains("backend unavailable"));
    assert!(saver.has_pending());
}

#[tokio::test(start_paused = true)]
async fn failed_flush_is_retried() {
    let (saver, saved) = flaky_saver::<u32>(1);
    saver.schedule(7);

    assert!(saver.flush().await.is_err());
    assert!(saver.has_pending());
    assert!(saved_values(&saved).is_empty());

    assert_eq!(saver.flush().await, Ok(true));
    assert_eq!(saved_values(&saved), vec![7]);
    assert!(!saver.has_pending());
}

#[tokio::test(start_paused = true)]
async fn failed_timer_save_keeps_value_pending() {
    let (saver, saved) = flaky_saver::<u32>(1);
    saver.schedule(7);

    tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
    settle().await;
    assert!(saved_values(&saved).is_empty());
    assert!(saver.has_pending());

    assert_eq!(saver.flush().await, Ok(true));
    assert_eq!(saved_values(&saved), vec![7]);
}

#[tokio::test(start_paused = true)]
async fn newer_value_wins_over_failed_save() {
    let (saver, saved) = flaky_saver::<u32>(1);
    saver.schedule(1);
    tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
    settle().await;

    saver.schedule(2);
    assert_eq!(saver.flush().await, Ok(true));
    assert_eq!(saved_values(&saved), vec![2]);
    assert_eq!(saver.flush().await, Ok(false));
}

#[tokio::test(start_paused = true)]
async fn dropping_saver_persists_pending_value() {
    let (saver, saved) = recording_saver::<u32>();
    saver.schedule(9);
    drop(saver);
    settle().await;

    assert_eq!(saved_values(&saved), vec![9]);
}

#[test]
fn schedule_without_runtime_waits_for_flush() {
    let (saver, saved) = recording_saver::<u32>();
    saver.schedule(4);
    assert!(saver.has_pending());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let flushed = runtime.block_on(saver.shutdown());
    assert_eq!(flushed, Ok(true));
    assert_eq!(saved_values(&saved), vec![4]);
}

#[test]
fn only_one_modal_at_a_time() {
    let scope = ModalScope::new();
    let guard = scope.open(ModalKind::ProjectSettings).expect("first modal opens");
    assert_eq!(guard.kind(), ModalKind::ProjectSettings);
    assert!(scope.open(ModalKind::SectionSettings { section_index: 0 }).is_none());
    assert_eq!(scope.active(), Some(ModalKind::ProjectSettings));

    drop(guard);
    assert!(!scope.is_open());

    let lesson = ModalKind::LessonSettings {
        section_index: 0,
        lesson_index: 1,
    };
    let guard = scope.open(lesson).expect("modal reopens after close");
    assert_eq!(scope.clone().active(), Some(lesson));
    drop(guard);
}

#[test]
fn selection_is_ignored_while_modal_open() {
    let mut session = EditorSession::new(sample_plan(), ProjectDefaults::default(), Planner::default());

    let guard = session
        .modals()
        .open(ModalKind::LessonSettings {
            section_index: 0,
            lesson_index: 0,
        })
        .expect("modal opens");
    let update = session
        .select_lesson(0, 0, &ExistingContent::default())
        .expect("indices valid");
    assert!(update.is_none());
    assert_eq!(session.selected(), None);
    assert_eq!(session.plan().sections[0].lessons[0].hours, None);

    drop(guard);
    let update = session
        .select_lesson(0, 0, &ExistingContent::default())
        .expect("indices valid")
        .expect("selection applied");
    assert_eq!(update.hours, 33);
    assert_eq!(session.selected(), Some((0, 0)));
}

#[tokio::test(start_paused = true)]
async fn edits_schedule_debounced_plan_save() {
    let (saver, saved) = recording_saver::<TrainingPlan>();
    let mut session = EditorSession::new(sample_plan(), ProjectDefaults::default(), Planner::default())
        .with_autosave(saver);

    session
        .set_lesson_rate(0, 0, Some(120.0), &ExistingContent::default())
        .expect("lesson exists");
    session
        .override_products(0, 1, vec![Presentation, Quiz])
        .expect("lesson exists");
    assert!(session.has_unsaved_changes());

    tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
    settle().await;

    let plans = saved_values(&saved);
    assert_eq!(plans.len(), 1);
    assert_eq!(&plans[0], session.plan());
    assert!(!session.has_unsaved_changes());
}

#[tokio::test(start_paused = true)]
async fn blur_flushes_pending_changes() {
    let (saver, saved) = recording_saver::<TrainingPlan>();
    let mut session = EditorSession::new(sample_plan(), ProjectDefaults::default(), Planner::default())
        .with_autosave(saver);

    session
        .set_section_tier(0, "basic", &NoExistingContent)
        .expect("section exists");
    assert_eq!(session.blur().await, Ok(true));
    assert_eq!(saved_values(&saved).len(), 1);
    assert_eq!(session.blur().await, Ok(false));
}

#[tokio::test(start_paused = true)]
async fn navigating_away_saves_and_returns_plan() {
    let (saver, saved) = recording_saver::<TrainingPlan>();
    let mut session = EditorSession::new(sample_plan(), ProjectDefaults::default(), Planner::default())
        .with_autosave(saver);

    let project = ProjectDefaults {
        custom_rate: Some(60.0),
        ..ProjectDefaults::default()
    };
    let total = session.update_project(project.clone(), &NoExistingContent);
    assert!((total - (10.0 + 14.0)).abs() < 1e-6);
    assert_eq!(session.project(), &project);

    let plan = session
        .navigate_away()
        .await
        .map_err(|(err, _)| err)
        .expect("flush succeeds");
    let plans = saved_values(&saved);
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0], plan);
    assert!((plan.total_hours() - 24.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn failed_navigation_returns_session_with_changes() {
    let (saver, saved) = flaky_saver::<TrainingPlan>(1);
    let mut session = EditorSession::new(sample_plan(), ProjectDefaults::default(), Planner::default())
        .with_autosave(saver);
    session
        .set_lesson_rate(0, 0, Some(120.0), &ExistingContent::default())
        .expect("lesson exists");
    let edited = session.plan().clone();

    let (err, session) = match session.navigate_away().await {
        Ok(_) => panic!("first save should fail"),
        Err((err, session)) => (err, *session),
    };
    assert!(err.contains("backend unavailable"));
    assert!(session.has_unsaved_changes());
    assert_eq!(session.plan(), &edited);
    assert!(saved_values(&saved).is_empty());

    let plan = session
        .navigate_away()
        .await
        .map_err(|(err, _)| err)
        .expect("retry succeeds");
    assert_eq!(plan, edited);
    assert_eq!(saved_values(&saved), vec![edited]);
}

#[test]
fn session_without_autosave_has_nothing_pending() {
    let mut session = EditorSession::new(sample_plan(), ProjectDefaults::default(), Planner::default());
    session
        .rename_lesson(0, 0, "Onboarding Overview", &ExistingContent::default())
        .expect("lesson exists");
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.plan().sections[0].lessons[0].title, "Onboarding Overview");
}
