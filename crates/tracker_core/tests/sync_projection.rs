use tracker_core::{
    fallback_sheet, InMemorySheetRepository, MutationOutcome, MutationState, ProjectionError,
    QuestionDraft, QuestionPatch, SheetMutation, SheetProjection, SheetService, SubTopic,
};

fn service() -> SheetService<InMemorySheetRepository> {
    SheetService::open(
        InMemorySheetRepository::new(),
        "striver-sde-sheet",
        fallback_sheet,
    )
    .unwrap()
}

/// Issues `mutation` remotely and settles the ticket like a client would.
fn round_trip(
    service: &mut SheetService<InMemorySheetRepository>,
    projection: &mut SheetProjection,
    mutation: SheetMutation,
) -> Result<MutationOutcome, String> {
    let ticket = projection.begin(mutation.clone());
    match service.apply(mutation) {
        Ok(outcome) => {
            projection
                .confirm(ticket, outcome.clone())
                .map_err(|err| err.to_string())?;
            Ok(outcome)
        }
        Err(err) => {
            projection.fail(ticket, err.to_string()).unwrap();
            Err(err.to_string())
        }
    }
}

#[test]
fn confirmed_outcomes_keep_projection_in_step_with_service() {
    let mut service = service();
    let mut projection = SheetProjection::new();
    projection.load(service.sheet().clone());

    let topic = match round_trip(
        &mut service,
        &mut projection,
        SheetMutation::AddTopic {
            title: "Graphs".to_string(),
        },
    )
    .unwrap()
    {
        MutationOutcome::TopicAdded(topic) => topic,
        other => panic!("unexpected outcome: {other:?}"),
    };
    let sub_topic = match round_trip(
        &mut service,
        &mut projection,
        SheetMutation::AddSubTopic {
            topic_id: topic.id.clone(),
            title: "BFS".to_string(),
        },
    )
    .unwrap()
    {
        MutationOutcome::SubTopicAdded { sub_topic, .. } => sub_topic,
        other => panic!("unexpected outcome: {other:?}"),
    };

    let steps = vec![
        SheetMutation::AddQuestion {
            topic_id: topic.id.clone(),
            subtopic_id: sub_topic.id.clone(),
            draft: QuestionDraft::titled("Rotting Oranges"),
        },
        SheetMutation::UpdateQuestion {
            topic_id: "topic-1".to_string(),
            subtopic_id: "subtopic-1".to_string(),
            question_id: "q-1".to_string(),
            patch: QuestionPatch {
                link: Some(String::new()),
                ..QuestionPatch::default()
            },
        },
        SheetMutation::CycleQuestionStatus {
            topic_id: "topic-2".to_string(),
            subtopic_id: "subtopic-3".to_string(),
            question_id: "q-4".to_string(),
        },
        SheetMutation::RenameSubTopic {
            topic_id: "topic-1".to_string(),
            subtopic_id: "subtopic-2".to_string(),
            title: "Harder".to_string(),
        },
        SheetMutation::DeleteQuestion {
            topic_id: "topic-1".to_string(),
            subtopic_id: "subtopic-1".to_string(),
            question_id: "q-1".to_string(),
        },
        SheetMutation::MoveTopic {
            topic_id: topic.id.clone(),
            to: 0,
        },
        SheetMutation::DeleteSubTopic {
            topic_id: "topic-1".to_string(),
            subtopic_id: "subtopic-1".to_string(),
        },
        SheetMutation::DeleteTopic {
            topic_id: "topic-2".to_string(),
        },
    ];

    for mutation in steps {
        let name = mutation.name();
        round_trip(&mut service, &mut projection, mutation).unwrap();
        assert_eq!(projection.sheet(), Some(service.sheet()), "after {name}");
    }
    assert!(!projection.needs_refetch());
    assert_eq!(projection.pending().count(), 0);
}

#[test]
fn failed_remote_mutation_leaves_projection_unchanged() {
    let mut service = service();
    let mut projection = SheetProjection::new();
    projection.load(service.sheet().clone());
    let before = projection.sheet().cloned();

    let mutation = SheetMutation::DeleteQuestion {
        topic_id: "topic-1".to_string(),
        subtopic_id: "subtopic-1".to_string(),
        question_id: "q-missing".to_string(),
    };
    let ticket = projection.begin(mutation.clone());
    let err = service.apply(mutation).unwrap_err();
    projection.fail(ticket, err.to_string()).unwrap();

    assert_eq!(projection.sheet().cloned(), before);
    assert!(matches!(
        projection.state(ticket),
        Some(MutationState::Failed(message)) if message.starts_with("Question not found")
    ));
}

#[test]
fn stale_path_flags_refetch_and_full_sheet_outcome_reconciles() {
    let mut service = service();
    let mut projection = SheetProjection::new();
    let stale = service.sheet().clone();
    projection.load(stale.clone());

    // Another client adds a topic the projection never saw.
    let unseen = service.add_topic("Heaps").unwrap();

    let mutation = SheetMutation::AddSubTopic {
        topic_id: unseen.id.clone(),
        title: "Basics".to_string(),
    };
    let ticket = projection.begin(mutation.clone());
    let outcome = service.apply(mutation).unwrap();
    let err = projection.confirm(ticket, outcome).unwrap_err();

    assert!(matches!(err, ProjectionError::StalePath { path } if path == unseen.id));
    assert!(projection.needs_refetch());
    assert_eq!(projection.sheet(), Some(&stale));
    assert_eq!(projection.state(ticket), Some(&MutationState::Confirmed));

    let topics = service.sheet().topics.clone();
    let mutation = SheetMutation::Reorder {
        topics,
        mode: Default::default(),
    };
    let ticket = projection.begin(mutation.clone());
    let outcome = service.apply(mutation).unwrap();
    projection.confirm(ticket, outcome).unwrap();

    assert!(!projection.needs_refetch());
    assert_eq!(projection.sheet(), Some(service.sheet()));
}

#[test]
fn mismatched_outcome_keeps_ticket_pending() {
    let mut projection = SheetProjection::new();
    projection.load(fallback_sheet());
    let ticket = projection.begin(SheetMutation::DeleteTopic {
        topic_id: "topic-1".to_string(),
    });

    let err = projection
        .confirm(
            ticket,
            MutationOutcome::SubTopicAdded {
                topic_id: "topic-1".to_string(),
                sub_topic: SubTopic::with_id("subtopic-9", "Extra").unwrap(),
            },
        )
        .unwrap_err();

    assert_eq!(
        err,
        ProjectionError::OutcomeMismatch {
            ticket,
            op: "delete_topic"
        }
    );
    assert_eq!(projection.state(ticket), Some(&MutationState::Pending));
    assert_eq!(projection.sheet(), Some(&fallback_sheet()));
}

#[test]
fn node_outcome_before_load_is_not_loaded() {
    let mut projection = SheetProjection::new();
    let ticket = projection.begin(SheetMutation::DeleteTopic {
        topic_id: "topic-1".to_string(),
    });

    let err = projection
        .confirm(
            ticket,
            MutationOutcome::TopicDeleted {
                topic_id: "topic-1".to_string(),
            },
        )
        .unwrap_err();

    assert_eq!(err, ProjectionError::NotLoaded);
    assert!(projection.needs_refetch());
    assert!(projection.sheet().is_none());
}
