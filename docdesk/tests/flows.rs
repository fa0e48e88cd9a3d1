use docdesk::entity::{EntityDraft, FileMetadataBuilder, ProjectDraft};
use docdesk::notify::{MemorySink, Notice};
use docdesk::{
    CollectionController, Followup, Messages, ProjectFiles, SnapshotOutcome, UserProjects, save_edit,
};
use docdesk_core::{DocdeskClient, FileUpload};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> DocdeskClient {
    DocdeskClient::with_base_url(&format!("{}/api", server.uri()), Some("csrf-1".into())).unwrap()
}

fn file_json(id: &str, name: &str) -> serde_json::Value {
    json!({ "id": id, "file_name": name, "file_size": 5, "file_status": "uploaded" })
}

fn ids<T: docdesk::Keyed>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.key().to_string()).collect()
}

#[tokio::test]
async fn upload_then_refetch_settles_pending_insert() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/p1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_json("f1", "a.pdf")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/p1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            file_json("f1", "a.pdf"),
            file_json("f2", "b.txt")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json("f2", "b.txt")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/projects/p1/attach-file/"))
        .and(body_json(json!({ "file_id": "f2" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let files = CollectionController::new(ProjectFiles::new(client_for(&server)), &sink, Messages::FILES);
    files.open("p1");
    assert_eq!(files.refresh().await.unwrap(), SnapshotOutcome::Applied);

    let outcome = files
        .create(FileUpload::new("b.txt", b"hello".to_vec()))
        .await
        .unwrap();
    assert_eq!(outcome.followup, Followup::Refetch);
    assert_eq!(ids(&files.visible()), vec!["f1", "f2"]);
    assert_eq!(files.pending_counts().inserts, 1);

    files.refresh().await.unwrap();
    assert_eq!(ids(&files.visible()), vec!["f1", "f2"]);
    assert_eq!(files.pending_counts().inserts, 0);
    assert_eq!(
        sink.notices(),
        vec![Notice::Success("File uploaded successfully".into())]
    );
}

#[tokio::test]
async fn rejected_attach_removes_uploaded_row() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/p1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json("f2", "b.txt")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/projects/p1/attach-file/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "file_id": ["File is already attached."] })),
        )
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let files = CollectionController::new(ProjectFiles::new(client_for(&server)), &sink, Messages::FILES);
    files.open("p1");
    files.refresh().await.unwrap();

    let err = files
        .create(FileUpload::new("b.txt", b"hello".to_vec()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("400"));
    assert!(files.visible().is_empty());
    assert_eq!(
        sink.notices(),
        vec![Notice::Failure(
            "Failed to upload file: file_id: File is already attached.".into()
        )]
    );
}

#[tokio::test]
async fn failed_delete_keeps_file_listed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/p1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([file_json("f1", "a.pdf")])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/f1/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let files = CollectionController::new(ProjectFiles::new(client_for(&server)), &sink, Messages::FILES);
    files.open("p1");
    files.refresh().await.unwrap();

    assert!(files.delete("f1").await.is_err());

    assert_eq!(ids(&files.visible()), vec!["f1"]);
    assert_eq!(sink.failures(), 1);
}

#[tokio::test]
async fn projects_are_scoped_to_open_user_and_created_with_user_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Mine", "user": 7, "status": "in_progress" },
            { "id": 2, "name": "Theirs", "user": 8 },
            { "id": 3, "name": "Gone", "user": 7, "is_deleted": true }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/projects/"))
        .and(body_json(json!({ "name": "Thesis", "user_id": "7" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9,
            "name": "Thesis",
            "user": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let projects = CollectionController::new(
        UserProjects::new(client_for(&server)),
        &sink,
        Messages::PROJECTS,
    );
    projects.open("7");
    projects.refresh().await.unwrap();
    assert_eq!(ids(&projects.visible()), vec!["1"]);

    let draft = ProjectDraft::builder("Thesis").build().unwrap();
    let outcome = projects.create(draft).await.unwrap();

    assert_eq!(outcome.value.id, "9");
    assert_eq!(ids(&projects.visible()), vec!["1", "9"]);
    assert_eq!(
        sink.notices(),
        vec![Notice::Success("Project created successfully".into())]
    );
}

#[tokio::test]
async fn edits_go_to_the_endpoint_of_their_kind() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/projects/5/"))
        .and(body_json(json!({ "name": "Renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 5, "name": "Renamed" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files/f1/update-file-metadata/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let project = ProjectDraft::builder("Renamed").build().unwrap();
    save_edit(&client, "5", EntityDraft::Project(project)).await.unwrap();

    let file = FileMetadataBuilder::new("a.pdf").tag("draft").build().unwrap();
    save_edit(&client, "f1", EntityDraft::File(file)).await.unwrap();
}
