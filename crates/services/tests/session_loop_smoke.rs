use std::sync::Arc;

use practice_core::adaptive::AnswerSignals;
use practice_core::model::{
    BlockId, Difficulty, LessonTemplateId, PracticeSettings, QuestionId, SessionStatus,
};
use practice_core::time::fixed_now;
use services::{Clock, InMemoryQuestionBank, QuestionSource, SessionError, SessionLoopService};

fn seeded_bank(lesson: &LessonTemplateId, blocks: &[&str], per_difficulty: usize) -> InMemoryQuestionBank {
    let bank = InMemoryQuestionBank::new();
    for block in blocks {
        let block_id = BlockId::new(*block).unwrap();
        bank.add_block(lesson, &block_id, format!("Block {block}"))
            .unwrap();
        for difficulty in Difficulty::ALL {
            for i in 0..per_difficulty {
                let id = QuestionId::new(format!("{block}-{difficulty}-{i}")).unwrap();
                bank.add_question(lesson, &block_id, difficulty, id).unwrap();
            }
        }
    }
    bank
}

#[tokio::test]
async fn session_loop_runs_lesson_to_completion() {
    let lesson = LessonTemplateId::new("smoke-lesson").unwrap();
    let bank = seeded_bank(&lesson, &["intro", "practice"], 4);
    let loop_svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        PracticeSettings::default(),
        Arc::new(bank),
    )
    .with_seed(7);

    let signals = AnswerSignals::new(30.0, 0);
    let mut session = loop_svc.start_session(&lesson, None, None).await.unwrap();
    let mut answered = 0;
    while !session.is_complete() {
        let served = loop_svc.next_question(&mut session).await.unwrap();
        assert_eq!(served.source, QuestionSource::Fresh);
        loop_svc
            .answer_current(&mut session, true, &signals)
            .unwrap();
        answered += 1;
        assert!(answered <= 16, "session should finish within two mastered blocks");
    }

    assert_eq!(answered, 16);
    let progress = session.progress();
    assert_eq!(progress.completed_blocks, 2);
    assert!((progress.mean_mastery_percent - 100.0).abs() < 1e-9);
    assert_eq!(session.snapshot().status, SessionStatus::Completed);

    let err = loop_svc.next_question(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::Completed));
}

#[tokio::test]
async fn snapshot_resumes_where_the_learner_left_off() {
    let lesson = LessonTemplateId::new("resume-lesson").unwrap();
    let bank = seeded_bank(&lesson, &["a", "b", "c"], 3);
    let loop_svc = SessionLoopService::new(
        Clock::fixed(fixed_now()),
        PracticeSettings::default(),
        Arc::new(bank),
    )
    .with_seed(11);

    let mut session = loop_svc.start_session(&lesson, None, None).await.unwrap();
    loop_svc.advance_block(&mut session).unwrap();
    loop_svc.next_question(&mut session).await.unwrap();
    loop_svc
        .answer_current(&mut session, false, &AnswerSignals::new(50.0, 1))
        .unwrap();
    let stored = session.snapshot();

    let resumed = loop_svc
        .start_session(&lesson, Some(&stored), None)
        .await
        .unwrap();
    assert_eq!(resumed.current_block_id().as_str(), "b");
    assert_eq!(resumed.state().completed_blocks(), 1);
    assert_eq!(
        resumed.state().current_block().questions_attempted().easy,
        1
    );
    assert!(resumed.state().blocks_progress()[0].student_requested_advance());
}
