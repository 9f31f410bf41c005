use exam_core::model::{
    AccountLedger, AnswerRecord, Attempt, AttemptOptions, AttemptStatus, AwardEvent, AwardReason,
    Category, Entitlement, Question, QuestionId, RewardRate, Test, TestId, UserId,
};
use exam_core::time::fixed_now;
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::{
    AttemptRepository, ContentRepository, EntitlementRepository, LedgerRepository,
};
use storage::sqlite::SqliteRepository;

fn build_test(id: u64, questions: u64) -> Test {
    let questions = (1..=questions)
        .map(|q| {
            Question::new(
                QuestionId::new(q),
                format!("Question {q}"),
                vec!["A".into(), "B".into(), "C".into()],
                (q % 3) as usize,
            )
            .unwrap()
            .with_explanation(format!("Because {q}"))
        })
        .collect();
    Test::new(
        TestId::new(id),
        Category::new("networking").unwrap(),
        questions,
        RewardRate::new(10, 1),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_content_roundtrip_preserves_question_order() {
    let repo = connect("memdb_content").await;
    let test = build_test(1, 4);
    repo.upsert_test(&test).await.unwrap();

    let fetched = repo
        .get_test(test.category(), test.id())
        .await
        .unwrap()
        .expect("test stored");
    assert_eq!(fetched, test);
    assert_eq!(fetched.questions()[0].explanation(), "Because 1");

    let other = Category::new("security").unwrap();
    assert!(repo.get_test(&other, test.id()).await.unwrap().is_none());

    // Replacing a test drops questions that are no longer part of it.
    let shorter = build_test(1, 2);
    repo.upsert_test(&shorter).await.unwrap();
    let fetched = repo
        .get_test(shorter.category(), shorter.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.question_count(), 2);
}

#[tokio::test]
async fn sqlite_attempt_roundtrip_and_partial_updates() {
    let repo = connect("memdb_attempts").await;
    let test = build_test(2, 4);
    let user = UserId::new(7);
    let mut rng = StdRng::seed_from_u64(11);
    let attempt = Attempt::generate(
        user,
        &test,
        AttemptOptions::practice(),
        &mut rng,
        fixed_now(),
    )
    .unwrap();
    repo.upsert_attempt(&attempt).await.unwrap();

    let fetched = repo
        .get_attempt(user, test.id(), AttemptStatus::Unfinished)
        .await
        .unwrap()
        .expect("attempt stored");
    assert_eq!(fetched, attempt);
    assert!(
        repo.get_attempt(user, test.id(), AttemptStatus::Finished)
            .await
            .unwrap()
            .is_none()
    );

    let question = fetched.current_question(&test).unwrap().clone();
    let record = AnswerRecord::chosen(&question, question.correct_option_index());
    repo.record_answer(user, test.id(), &record, fixed_now())
        .await
        .unwrap();
    // Same question again replaces rather than appends.
    let skipped = AnswerRecord::skipped(&question);
    repo.record_answer(user, test.id(), &skipped, fixed_now())
        .await
        .unwrap();

    repo.update_position(user, test.id(), 3, true, fixed_now())
        .await
        .unwrap();
    // A later non-finishing update must not reopen the attempt.
    repo.update_position(user, test.id(), 1, false, fixed_now())
        .await
        .unwrap();

    let stored = repo
        .get_attempt(user, test.id(), AttemptStatus::Any)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.answers(), &[skipped]);
    assert_eq!(stored.current_position(), 1);
    assert!(stored.is_finished());
    assert_eq!(stored.presentation_order(), attempt.presentation_order());
}

#[tokio::test]
async fn sqlite_partial_updates_require_existing_attempt() {
    let repo = connect("memdb_missing_attempt").await;
    let test = build_test(3, 2);
    let record = AnswerRecord::skipped(&test.questions()[0]);

    let err = repo
        .record_answer(UserId::new(1), test.id(), &record, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, storage::StorageError::NotFound));

    let err = repo
        .update_position(UserId::new(1), test.id(), 0, false, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, storage::StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_awards_each_question_once() {
    let repo = connect("memdb_awards").await;
    let user = UserId::new(3);
    let rate = RewardRate::new(10, 1);

    let first = repo
        .award_correct_answer(user, TestId::new(1), QuestionId::new(1), rate)
        .await
        .unwrap();
    assert!(first.applied);
    assert_eq!(first.balance, AccountLedger::from_persisted(10, 1));

    let again = repo
        .award_correct_answer(user, TestId::new(1), QuestionId::new(1), rate)
        .await
        .unwrap();
    assert!(!again.applied);
    assert_eq!(again.balance, first.balance);
    assert!(
        repo.has_award(user, TestId::new(1), QuestionId::new(1))
            .await
            .unwrap()
    );

    let completion = AwardEvent::new(
        AwardReason::Completion {
            test_id: TestId::new(1),
        },
        RewardRate::new(20, 10),
    );
    let balance = repo.credit(user, &completion).await.unwrap();
    assert_eq!(balance, AccountLedger::from_persisted(30, 11));
    assert_eq!(repo.get_account(user).await.unwrap(), balance);
    assert_eq!(
        repo.get_account(UserId::new(99)).await.unwrap(),
        AccountLedger::default()
    );
}

#[tokio::test]
async fn sqlite_entitlements_floor_at_zero_and_skip_subscribers() {
    let repo = connect("memdb_entitlements").await;
    let free_user = UserId::new(1);
    let subscriber = UserId::new(2);

    assert!(repo.get_entitlement(free_user).await.unwrap().is_none());
    assert!(matches!(
        repo.consume_free_question(free_user).await,
        Err(storage::StorageError::NotFound)
    ));

    repo.save_entitlement(free_user, &Entitlement::free(1))
        .await
        .unwrap();
    repo.save_entitlement(subscriber, &Entitlement::subscribed())
        .await
        .unwrap();

    let after = repo.consume_free_question(free_user).await.unwrap();
    assert_eq!(after.remaining_free_questions(), 0);
    let floored = repo.consume_free_question(free_user).await.unwrap();
    assert_eq!(floored.remaining_free_questions(), 0);
    assert!(floored.is_exhausted());

    let sub = repo.consume_free_question(subscriber).await.unwrap();
    assert!(sub.is_subscribed());
    assert!(!sub.is_exhausted());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let test = build_test(4, 1);
    repo.upsert_test(&test).await.unwrap();
}
