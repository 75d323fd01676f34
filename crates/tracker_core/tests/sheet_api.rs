use serde_json::json;
use tracker_core::{
    fallback_sheet, ApiResponse, ErrorKind, InMemorySheetRepository, QuestionPatch, ReorderBody,
    SheetApi, SheetMutation, SheetService, TitleBody,
};

fn api() -> SheetApi<InMemorySheetRepository> {
    let service = SheetService::open(
        InMemorySheetRepository::new(),
        "striver-sde-sheet",
        fallback_sheet,
    )
    .unwrap();
    SheetApi::new(service)
}

#[test]
fn fetch_sheet_wraps_tree_in_success_envelope() {
    let api = api();

    let value = serde_json::to_value(api.fetch_sheet("striver-sde-sheet")).unwrap();

    assert_eq!(value["success"], json!(true));
    assert_eq!(value["data"]["slug"], json!("striver-sde-sheet"));
    assert_eq!(
        value["data"]["topics"][0]["subTopics"][0]["questions"][1]["title"],
        json!("Pascal's Triangle")
    );
    assert!(value.get("message").is_none());
}

#[test]
fn unknown_slug_is_sheet_not_found() {
    let response = api().fetch_sheet("blind-75");

    assert!(!response.success);
    assert_eq!(response.data, None);
    assert_eq!(response.message.as_deref(), Some("Sheet not found"));
    assert_eq!(response.error, Some(ErrorKind::NotFound));
}

#[test]
fn delete_confirms_then_reports_not_found() {
    let api = api();

    let first = api.delete_topic("topic-1");
    assert!(first.success);
    assert_eq!(first.message.as_deref(), Some("Topic deleted"));

    let second = api.delete_topic("topic-1");
    let value = serde_json::to_value(&second).unwrap();
    assert_eq!(
        value,
        json!({"success": false, "message": "Topic not found", "error": "not_found"})
    );
}

#[test]
fn not_found_message_names_the_failing_level() {
    let api = api();

    let missing_subtopic = api.update_question(
        "topic-1",
        "subtopic-9",
        "q-1",
        QuestionPatch::default(),
    );
    assert_eq!(
        missing_subtopic.message.as_deref(),
        Some("Sub-topic not found")
    );

    let missing_question = api.delete_question("topic-1", "subtopic-1", "q-9");
    assert_eq!(missing_question.message.as_deref(), Some("Question not found"));

    let bad_move = api.move_subtopic("topic-1", "subtopic-1", 5);
    assert_eq!(bad_move.error, Some(ErrorKind::OutOfRange));
}

#[test]
fn blank_title_is_invalid_input() {
    let response = api().add_topic(TitleBody::new("  "));

    assert!(!response.success);
    assert_eq!(response.error, Some(ErrorKind::InvalidInput));
    assert_eq!(
        response.message.as_deref(),
        Some("topic title must not be blank")
    );
}

#[test]
fn replace_sheet_reports_update_message() {
    let api = api();
    let mut sheet = fallback_sheet();
    sheet.title = "Renamed".to_string();

    let response = api.replace_sheet(sheet.clone());

    assert_eq!(response.message.as_deref(), Some("Sheet updated successfully"));
    assert_eq!(response.data, Some(sheet));
}

#[test]
fn reorder_body_from_json_renumbers_tree() {
    let api = api();
    let mut topics = fallback_sheet().topics;
    topics.swap(0, 1);
    let body: ReorderBody =
        serde_json::from_value(json!({ "topics": serde_json::to_value(&topics).unwrap() }))
            .unwrap();

    let response = api.reorder(body);

    let sheet = response.data.unwrap();
    assert_eq!(sheet.topics[0].title, "Linked List");
    assert_eq!(sheet.topics[0].order, 0);
    assert_eq!(sheet.topics[1].order, 1);
}

#[test]
fn dispatch_accepts_tagged_json_mutations() {
    let api = api();
    let mutation: SheetMutation = serde_json::from_value(json!({
        "op": "add_question",
        "topic_id": "topic-2",
        "subtopic_id": "subtopic-3",
        "draft": {"title": "Middle of the Linked List", "difficulty": "easy"}
    }))
    .unwrap();

    let value = serde_json::to_value(api.dispatch(mutation)).unwrap();

    assert_eq!(value["success"], json!(true));
    assert_eq!(value["data"]["kind"], json!("question_added"));
    assert_eq!(value["data"]["data"]["question"]["difficulty"], json!("Easy"));
    assert_eq!(value["data"]["data"]["question"]["status"], json!("Not Started"));
    assert_eq!(value["data"]["data"]["question"]["order"], json!(1));
}

#[test]
fn stats_count_fallback_questions() {
    let response: ApiResponse<_> = api().stats("striver-sde-sheet");
    let stats = response.data.unwrap();

    assert_eq!(stats.total, 4);
    assert_eq!(stats.difficulty_count(tracker_core::Difficulty::Easy), 2);
    assert_eq!(stats.difficulty_count(tracker_core::Difficulty::Medium), 2);
    assert_eq!(stats.per_topic[0].total, 3);
    assert_eq!(stats.solved, 0);
}

#[test]
fn cycle_status_through_api() {
    let api = api();
    let response = api.cycle_question_status("topic-2", "subtopic-3", "q-4");
    assert_eq!(
        response.data.map(|question| question.status.label()),
        Some("In Progress")
    );
}

#[test]
fn in_memory_api_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    let api = std::sync::Arc::new(api());
    assert_send_sync(&api);

    let worker = {
        let api = std::sync::Arc::clone(&api);
        std::thread::spawn(move || api.add_topic(TitleBody::new("Graphs")).success)
    };
    assert!(worker.join().unwrap());
    assert_eq!(api.fetch_sheet("striver-sde-sheet").data.unwrap().topics.len(), 3);
}
