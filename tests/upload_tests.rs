// tests/upload_tests.rs
//
// Question image attachments: upload, reference, download, cleanup.

mod common;

use common::{login, seed_exam, seed_user, spawn_app};

// Smallest valid-enough PNG header for a byte-for-byte comparison.
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn image_form() -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(PNG_BYTES.to_vec())
        .file_name("diagram.png")
        .mime_str("image/png")
        .unwrap();
    reqwest::multipart::Form::new().part("gambar", part)
}

#[tokio::test]
async fn upload_is_teacher_only_and_rejects_non_images() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    seed_user(&app.pool, "guru1", "Guru").await;
    seed_user(&app.pool, "siswa1", "Siswa").await;
    let guru_token = login(&client, &app.address, "guru1").await;
    let siswa_token = login(&client, &app.address, "siswa1").await;

    // Students cannot upload.
    let resp = client
        .post(format!("{}/api/uploads/questions", app.address))
        .header("Authorization", format!("Bearer {}", siswa_token))
        .multipart(image_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Wrong extension.
    let part = reqwest::multipart::Part::bytes(b"%PDF-1.4".to_vec())
        .file_name("notes.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let resp = client
        .post(format!("{}/api/uploads/questions", app.address))
        .header("Authorization", format!("Bearer {}", guru_token))
        .multipart(reqwest::multipart::Form::new().part("gambar", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Missing file field entirely.
    let resp = client
        .post(format!("{}/api/uploads/questions", app.address))
        .header("Authorization", format!("Bearer {}", guru_token))
        .multipart(reqwest::multipart::Form::new().text("other", "value"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn image_references_outside_the_upload_tree_are_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    seed_user(&app.pool, "guru1", "Guru").await;
    let guru_token = login(&client, &app.address, "guru1").await;
    let exam_id = seed_exam(&app.pool, &[1], -5, 60).await;

    // A body-supplied reference with a parent component must not be stored:
    // download and cleanup would otherwise follow it out of the questions
    // directory.
    for bad in ["../outside.txt", "sub/dir.png", "..", "a\\b.png"] {
        let resp = client
            .post(format!("{}/api/questions", app.address))
            .header("Authorization", format!("Bearer {}", guru_token))
            .json(&serde_json::json!({
                "exam_id": exam_id,
                "kind": "uraian",
                "prompt": "Describe the figure.",
                "image": bad,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "accepted image name {:?}", bad);
    }

    // Same guard on update.
    let resp = client
        .post(format!("{}/api/questions", app.address))
        .header("Authorization", format!("Bearer {}", guru_token))
        .json(&serde_json::json!({
            "exam_id": exam_id,
            "kind": "uraian",
            "prompt": "Describe the figure.",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let question: serde_json::Value = resp.json().await.unwrap();
    let question_id = question["id"].as_i64().unwrap();

    let resp = client
        .put(format!("{}/api/questions/{}", app.address, question_id))
        .header("Authorization", format!("Bearer {}", guru_token))
        .json(&serde_json::json!({"image": "../outside.txt"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn uploaded_image_flows_through_question_and_download() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    seed_user(&app.pool, "guru1", "Guru").await;
    let guru_token = login(&client, &app.address, "guru1").await;
    let exam_id = seed_exam(&app.pool, &[1], -5, 60).await;

    let resp = client
        .post(format!("{}/api/uploads/questions", app.address))
        .header("Authorization", format!("Bearer {}", guru_token))
        .multipart(image_form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    let filename = body["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".png"));

    // Attach the stored reference to a new question.
    let resp = client
        .post(format!("{}/api/questions", app.address))
        .header("Authorization", format!("Bearer {}", guru_token))
        .json(&serde_json::json!({
            "exam_id": exam_id,
            "kind": "pilihan_ganda_satu",
            "prompt": "What does the diagram show?",
            "choices": ["A", "B"],
            "answer_key": "A",
            "points": 5,
            "image": filename,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let question: serde_json::Value = resp.json().await.unwrap();
    let question_id = question["id"].as_i64().unwrap();
    assert_eq!(
        question["image_url"],
        format!("/uploads/questions/{}", filename)
    );

    // Download through the API.
    let resp = client
        .get(format!("{}/api/questions/{}/image", app.address, question_id))
        .header("Authorization", format!("Bearer {}", guru_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG_BYTES);

    // And through the static file service, no auth required.
    let resp = client
        .get(format!("{}/uploads/questions/{}", app.address, filename))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Hard-deleting the question removes the file as well.
    let resp = client
        .delete(format!("{}/api/questions/{}", app.address, question_id))
        .header("Authorization", format!("Bearer {}", guru_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .get(format!("{}/uploads/questions/{}", app.address, filename))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
