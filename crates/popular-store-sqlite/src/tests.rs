//! Integration tests for `SqliteStore` against an in-memory database, driven
//! through a `Tracker` with a pinned clock.

use std::sync::Arc;

use chrono::NaiveDate;
use popular_core::{
  clock::FixedClock,
  interaction::Category,
  subject::{SubjectRef, Trackable},
  tracker::{BatchEntry, Tracker},
  visitor::Visitor,
  window::Window,
};

use crate::{Error, SqliteStore, schema};

fn d(s: &str) -> NaiveDate { s.parse().expect("valid date") }

fn v(s: &str) -> Visitor { Visitor::new(s).expect("valid visitor") }

fn post(id: i64) -> SubjectRef { SubjectRef::new("post", id.to_string()).unwrap() }

async fn store() -> Arc<SqliteStore> {
  Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

/// A tracker over `store` whose "today" is `date`.
fn on(store: &Arc<SqliteStore>, date: &str) -> Tracker<SqliteStore> {
  Tracker::new(store.clone()).with_clock(FixedClock(d(date)))
}

// ─── Ledger writer ───────────────────────────────────────────────────────────

#[tokio::test]
async fn same_day_repeat_is_idempotent() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let subject = post(1);

  let first = t.visit(&subject, &v("10.0.0.1")).await.unwrap();
  let second = t.visit(&subject, &v("10.0.0.1")).await.unwrap();

  assert_eq!(first.id, second.id);
  assert_eq!(second.created_at, first.created_at);
  assert!(second.updated_at >= first.updated_at);
  assert_eq!(second.date, d("2024-01-10"));
  assert_eq!(t.count_forever(&subject, None).await.unwrap(), 1);
}

#[tokio::test]
async fn next_day_repeat_is_a_new_row() {
  let s = store().await;
  let subject = post(1);

  on(&s, "2024-01-10").visit(&subject, &v("10.0.0.1")).await.unwrap();
  on(&s, "2024-01-11").visit(&subject, &v("10.0.0.1")).await.unwrap();

  let t = on(&s, "2024-01-11");
  assert_eq!(t.count_forever(&subject, None).await.unwrap(), 2);
  assert_eq!(t.count_last(&subject, 0, None).await.unwrap(), 1);
}

#[tokio::test]
async fn categories_are_isolated() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let subject = post(1);
  let visitor = v("user_7");
  let like = Category::new("like");

  t.record_interaction(&subject, like.clone(), &visitor).await.unwrap();
  t.record_interaction(&subject, Category::visit(), &visitor).await.unwrap();

  assert_eq!(t.count_forever(&subject, None).await.unwrap(), 2);
  assert_eq!(t.count_forever(&subject, Some(&like)).await.unwrap(), 1);
  assert_eq!(
    t.count_forever(&subject, Some(&Category::visit())).await.unwrap(),
    1
  );
}

#[tokio::test]
async fn distinct_visitors_count_separately() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let subject = post(1);

  t.visit(&subject, &v("10.0.0.1")).await.unwrap();
  t.visit(&subject, &v("10.0.0.2")).await.unwrap();

  assert_eq!(t.count_forever(&subject, None).await.unwrap(), 2);
}

#[tokio::test]
async fn subjects_of_different_types_do_not_collide() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let as_post = post(1);
  let as_video = SubjectRef::new("video", "1").unwrap();

  t.visit(&as_post, &v("10.0.0.1")).await.unwrap();

  assert_eq!(t.count_forever(&as_post, None).await.unwrap(), 1);
  assert_eq!(t.count_forever(&as_video, None).await.unwrap(), 0);
}

#[tokio::test]
async fn subject_without_id_is_rejected() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let broken = SubjectRef { subject_type: "post".into(), subject_id: String::new() };

  let err = t.visit(&broken, &v("10.0.0.1")).await.unwrap_err();
  assert!(matches!(err, Error::Core(popular_core::Error::InvalidSubject(_))));
  assert!(!err.is_persistence());
}

struct Article {
  id: Option<u32>,
}

impl Trackable for Article {
  fn subject_type(&self) -> &str { "article" }

  fn subject_id(&self) -> Option<String> { self.id.map(|id| id.to_string()) }
}

#[tokio::test]
async fn host_types_track_through_the_trait() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let article = Article { id: Some(5) };

  let stored = t.visit(&article, &v("user_1")).await.unwrap();
  assert_eq!(stored.subject, SubjectRef::new("article", "5").unwrap());
  assert_eq!(stored.category, Category::visit());
  assert_eq!(t.count_day(&article, None).await.unwrap(), 1);

  let unsaved = Article { id: None };
  assert!(t.visit(&unsaved, &v("user_1")).await.is_err());
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_reports_each_row() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let broken = SubjectRef { subject_type: String::new(), subject_id: "3".into() };

  let results = t
    .record_batch(vec![
      BatchEntry { subject: post(1), category: Category::visit(), visitor: v("a") },
      BatchEntry { subject: broken, category: Category::visit(), visitor: v("b") },
      BatchEntry { subject: post(2), category: Category::new("like"), visitor: v("c") },
    ])
    .await
    .unwrap();

  assert_eq!(results.len(), 3);
  assert!(results[0].is_ok());
  assert!(matches!(
    results[1],
    Err(Error::Core(popular_core::Error::InvalidSubject(_)))
  ));
  let third = results[2].as_ref().unwrap();
  assert_eq!(third.subject, post(2));
  assert_eq!(third.category.as_str(), "like");

  assert_eq!(t.count_forever(&post(1), None).await.unwrap(), 1);
  assert_eq!(t.count_forever(&post(2), None).await.unwrap(), 1);
}

#[tokio::test]
async fn batch_duplicates_collapse_to_one_row() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let entry = BatchEntry { subject: post(1), category: Category::visit(), visitor: v("a") };

  let results = t
    .record_batch(vec![entry.clone(), entry])
    .await
    .unwrap();

  let ids: Vec<i64> = results.iter().map(|r| r.as_ref().unwrap().id).collect();
  assert_eq!(ids[0], ids[1]);
  assert_eq!(t.count_forever(&post(1), None).await.unwrap(), 1);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
  let s = store().await;
  let results = on(&s, "2024-01-10")
    .record_batch(Vec::<BatchEntry<SubjectRef>>::new())
    .await
    .unwrap();
  assert!(results.is_empty());
}

// ─── Windows ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn last_days_includes_the_boundary_day() {
  let s = store().await;
  let subject = post(1);

  on(&s, "2024-01-03").visit(&subject, &v("inside")).await.unwrap();
  on(&s, "2024-01-02").visit(&subject, &v("outside")).await.unwrap();

  let t = on(&s, "2024-01-10");
  assert_eq!(t.count_last(&subject, 7, None).await.unwrap(), 1);
  assert_eq!(t.count_week(&subject, None).await.unwrap(), 1);
  assert_eq!(t.count_last(&subject, 8, None).await.unwrap(), 2);
  assert_eq!(t.count_day(&subject, None).await.unwrap(), 0);
}

#[tokio::test]
async fn named_windows_cover_their_spans() {
  let s = store().await;
  let subject = post(1);

  on(&s, "2024-06-30").visit(&subject, &v("today")).await.unwrap();
  on(&s, "2024-06-10").visit(&subject, &v("this-month")).await.unwrap();
  on(&s, "2024-01-15").visit(&subject, &v("this-year")).await.unwrap();
  on(&s, "2022-01-01").visit(&subject, &v("ancient")).await.unwrap();

  let t = on(&s, "2024-06-30");
  assert_eq!(t.count_day(&subject, None).await.unwrap(), 1);
  assert_eq!(t.count_month(&subject, None).await.unwrap(), 2);
  assert_eq!(t.count_year(&subject, None).await.unwrap(), 3);
  assert_eq!(t.count_forever(&subject, None).await.unwrap(), 4);
}

#[tokio::test]
async fn between_includes_both_endpoints() {
  let s = store().await;
  let subject = post(1);

  for (date, visitor) in [
    ("2023-12-31", "before"),
    ("2024-01-01", "first"),
    ("2024-01-15", "middle"),
    ("2024-01-31", "last"),
    ("2024-02-01", "after"),
  ] {
    on(&s, date).visit(&subject, &v(visitor)).await.unwrap();
  }

  let t = on(&s, "2024-06-01");
  let n = t
    .count_between(&subject, d("2024-01-01"), d("2024-01-31"), None)
    .await
    .unwrap();
  assert_eq!(n, 3);
}

#[tokio::test]
async fn inverted_range_is_an_error_not_zero() {
  let s = store().await;
  let err = on(&s, "2024-06-01")
    .count_between(&post(1), d("2024-02-01"), d("2024-01-01"), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(popular_core::Error::InvalidWindow(_))));
}

#[tokio::test]
async fn history_is_newest_first_and_filtered() {
  let s = store().await;
  let subject = post(1);
  let like = Category::new("like");

  on(&s, "2024-01-01").visit(&subject, &v("a")).await.unwrap();
  on(&s, "2024-01-05").visit(&subject, &v("a")).await.unwrap();
  on(&s, "2024-01-05")
    .record_interaction(&subject, like.clone(), &v("a"))
    .await
    .unwrap();

  let t = on(&s, "2024-01-05");
  let all = t.interactions(&subject, &Window::Forever, None).await.unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0].date, d("2024-01-05"));
  assert_eq!(all[2].date, d("2024-01-01"));

  let likes = t.interactions(&subject, &Window::Forever, Some(&like)).await.unwrap();
  assert_eq!(likes.len(), 1);
  assert_eq!(likes[0].category, like);

  let recent = t.interactions(&subject, &Window::last(2), None).await.unwrap();
  assert!(recent.iter().all(|i| i.date == d("2024-01-05")));
}

// ─── Rankings ────────────────────────────────────────────────────────────────

/// Give `subject` one interaction from each of `n` distinct visitors.
async fn seed(t: &Tracker<SqliteStore>, subject: &SubjectRef, n: usize) {
  for i in 0..n {
    t.visit(subject, &v(&format!("10.0.0.{i}"))).await.unwrap();
  }
}

#[tokio::test]
async fn rank_orders_by_count_and_keeps_ties_in_input_order() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  let (a, b, c) = (post(1), post(2), post(3));

  seed(&t, &a, 3).await;
  seed(&t, &b, 5).await;
  seed(&t, &c, 3).await;

  let ranked = t
    .rank_popular(vec![a.clone(), b.clone(), c.clone()], &Window::Forever, None)
    .await
    .unwrap();
  let order: Vec<_> = ranked.iter().map(|r| (r.subject.clone(), r.count)).collect();
  assert_eq!(order, vec![(b, 5), (a.clone(), 3), (c.clone(), 3)]);

  // Reversing the input reverses the tie.
  let ranked = t.rank_all_time(vec![c.clone(), a.clone()]).await.unwrap();
  assert_eq!(ranked[0].subject, c);
  assert_eq!(ranked[1].subject, a);
}

#[tokio::test]
async fn rank_applies_window_and_category() {
  let s = store().await;
  let (a, b) = (post(1), post(2));
  let like = Category::new("like");

  // `a` was popular long ago; `b` is liked this week.
  seed(&on(&s, "2023-01-01"), &a, 4).await;
  let this_week = on(&s, "2024-01-09");
  this_week.record_interaction(&b, like.clone(), &v("x")).await.unwrap();
  this_week.visit(&a, &v("x")).await.unwrap();

  let t = on(&s, "2024-01-10");

  let all_time = t.rank_all_time(vec![a.clone(), b.clone()]).await.unwrap();
  assert_eq!(all_time[0].subject, a);

  let weekly_likes = t
    .rank_popular(vec![a.clone(), b.clone()], &Window::week(), Some(&like))
    .await
    .unwrap();
  assert_eq!(weekly_likes[0].subject, b);
  assert_eq!(weekly_likes[0].count, 1);
  assert_eq!(weekly_likes[1].count, 0);
}

#[tokio::test]
async fn rank_keeps_unvisited_subjects() {
  let s = store().await;
  let t = on(&s, "2024-01-10");
  seed(&t, &post(2), 1).await;

  let ranked = t.rank_all_time(vec![post(1), post(2), post(3)]).await.unwrap();
  let counts: Vec<_> = ranked.iter().map(|r| (r.subject.subject_id.as_str(), r.count)).collect();
  assert_eq!(counts, vec![("2", 1), ("1", 0), ("3", 0)]);
}

#[tokio::test]
async fn rank_rejects_mixed_types() {
  let s = store().await;
  let video = SubjectRef::new("video", "1").unwrap();

  let err = on(&s, "2024-01-10")
    .rank_all_time(vec![post(1), video])
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(popular_core::Error::MixedSubjectTypes { .. })
  ));
}

#[tokio::test]
async fn rank_of_nothing_is_empty() {
  let s = store().await;
  let ranked = on(&s, "2024-01-10")
    .rank_all_time(Vec::<SubjectRef>::new())
    .await
    .unwrap();
  assert!(ranked.is_empty());
}

#[tokio::test]
async fn top_ranks_the_whole_ledger() {
  let s = store().await;
  let t = on(&s, "2024-01-10");

  seed(&t, &post(1), 2).await;
  seed(&t, &post(2), 4).await;
  seed(&t, &post(3), 2).await;
  seed(&t, &SubjectRef::new("video", "9").unwrap(), 10).await;

  let top = t.top("post", &Window::Forever, None, 2).await.unwrap();
  let order: Vec<_> = top.iter().map(|r| (r.subject.subject_id.as_str(), r.count)).collect();
  assert_eq!(order, vec![("2", 4), ("1", 2)]);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_key_writes_keep_one_row() {
  let dir = tempfile::TempDir::new().unwrap();
  let path = dir.path().join("popular.db");
  let first = Arc::new(SqliteStore::open(&path).await.unwrap());
  let second = Arc::new(SqliteStore::open(&path).await.unwrap());

  let mut handles = Vec::new();
  for i in 0..40 {
    let t = on(if i % 2 == 0 { &first } else { &second }, "2024-01-10");
    handles.push(tokio::spawn(async move {
      t.visit(&post(1), &v("10.0.0.1")).await
    }));
  }

  let mut ids = Vec::new();
  for handle in handles {
    ids.push(handle.await.unwrap().unwrap().id);
  }
  assert!(ids.windows(2).all(|w| w[0] == w[1]));

  let t = on(&second, "2024-01-10");
  assert_eq!(t.count_forever(&post(1), None).await.unwrap(), 1);
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_is_fully_migrated() {
  let s = store().await;
  assert_eq!(s.schema_version().await.unwrap(), schema::latest_version());

  let visits_left: i64 = s
    .with_conn(|c| {
      c.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'visits'",
        [],
        |r| r.get(0),
      )
    })
    .await
    .unwrap();
  assert_eq!(visits_left, 0);
}

#[tokio::test]
async fn legacy_visits_are_carried_over() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  conn
    .call(|c| {
      for m in schema::MIGRATIONS.iter().filter(|m| m.version <= 2) {
        c.execute_batch(m.sql)?;
      }
      c.pragma_update(None, "user_version", 2)?;
      c.execute_batch(
        "INSERT INTO visits (ip, visitable_id, visitable_type, date, created_at, updated_at)
         VALUES ('10.0.0.1', 42, 'post', '2019-03-01',
                 '2019-03-01T08:00:00+00:00', '2019-03-01T09:00:00+00:00');
         INSERT INTO visits (ip, visitable_id, visitable_type, date)
         VALUES ('10.0.0.2', 42, 'post', '2019-03-02');",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let s = Arc::new(SqliteStore::from_connection(conn).await.unwrap());
  assert_eq!(s.schema_version().await.unwrap(), 3);

  let t = on(&s, "2019-03-02");
  let subject = post(42);
  assert_eq!(t.count_forever(&subject, Some(&Category::visit())).await.unwrap(), 2);

  let history = t.interactions(&subject, &Window::Forever, None).await.unwrap();
  assert_eq!(history[0].visitor.as_str(), "10.0.0.2");
  assert_eq!(history[0].created_at.to_rfc3339(), "2019-03-02T00:00:00+00:00");
  assert_eq!(history[1].updated_at.to_rfc3339(), "2019-03-01T09:00:00+00:00");

  // Same visitor, same day as a migrated row: still one row.
  t.visit(&subject, &v("10.0.0.2")).await.unwrap();
  assert_eq!(t.count_forever(&subject, None).await.unwrap(), 2);
}

#[tokio::test]
async fn legacy_space_separated_timestamps_are_normalised() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  conn
    .call(|c| {
      for m in schema::MIGRATIONS.iter().filter(|m| m.version <= 2) {
        c.execute_batch(m.sql)?;
      }
      c.pragma_update(None, "user_version", 2)?;
      c.execute_batch(
        "INSERT INTO visits (ip, visitable_id, visitable_type, date, created_at, updated_at)
         VALUES ('10.0.0.1', 7, 'post', '2019-03-01',
                 '2019-03-01 08:00:00', '2019-03-01 09:30:15');
         INSERT INTO visits (ip, visitable_id, visitable_type, date, created_at, updated_at)
         VALUES ('10.0.0.2', 7, 'post', '2019-03-02', '2019-03-02 10:00:00', NULL);
         INSERT INTO visits (ip, visitable_id, visitable_type, date, created_at)
         VALUES ('10.0.0.3', 7, 'post', '2019-03-03', 'garbage');",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let s = Arc::new(SqliteStore::from_connection(conn).await.unwrap());
  let t = on(&s, "2019-03-03");
  let history = t.interactions(&post(7), &Window::Forever, None).await.unwrap();
  assert_eq!(history.len(), 3);

  assert_eq!(history[0].created_at.to_rfc3339(), "2019-03-03T00:00:00+00:00");
  assert_eq!(history[1].created_at.to_rfc3339(), "2019-03-02T10:00:00+00:00");
  assert_eq!(history[1].updated_at.to_rfc3339(), "2019-03-02T10:00:00+00:00");
  assert_eq!(history[2].created_at.to_rfc3339(), "2019-03-01T08:00:00+00:00");
  assert_eq!(history[2].updated_at.to_rfc3339(), "2019-03-01T09:30:15+00:00");
}
